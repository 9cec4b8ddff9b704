//! # Imagen Studio
//!
//! The post-processing core of a generative image studio: color filters,
//! geometric transforms and text watermarks applied to already-generated
//! images, plus a small, quota-aware history of recent results.
//!
//! Image generation itself happens elsewhere. This crate starts from encoded
//! bytes (`image/png` or `image/jpeg`) and ends with encoded bytes.
//!
//! # Architecture: Two Subsystems and a Reducer
//!
//! ```text
//! bytes ─▶ decode ─▶ adjust + transform ─▶ watermark ─▶ encode ─▶ bytes
//!                          (imaging::operations over an ImageBackend)
//!
//! AppState ──update(Action)──▶ AppState
//!                 │
//!                 └──▶ HistoryStore ──▶ StorageMedium (size-capped slot)
//! ```
//!
//! - The **pipeline** is a set of pure planning functions plus a drawing
//!   backend trait. Planning is unit tested without pixels; the software
//!   [`imaging::RasterBackend`] does the drawing.
//! - The **history** keeps the newest artifacts, bounded by count, and
//!   degrades to a shorter persisted list when the medium runs out of room.
//! - The **reducer** in [`state`] ties both together for an interactive
//!   session: selection mode, restore, batch delete, and an edit session.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Parameters, geometry, filter chain, watermark effects, backend trait, raster backend, codec, operations |
//! | [`history`] | `StorageMedium` trait, memory and file media, bounded `HistoryStore` |
//! | [`state`] | `AppState`, `Action`, and the `update` reducer |
//! | [`types`] | `MimeType`, `GeneratedArtifact`, generation-settings enums |
//! | [`config`] | `studio.toml` loading over stock defaults |
//! | [`output`] | CLI output formatting for history and edit commands |
//!
//! # Design Decisions
//!
//! ## Fail Closed
//!
//! A missing surface or a failed draw never loses the user's image:
//! [`imaging::apply_adjustments_and_transforms`] and
//! [`imaging::apply_watermark`] log and return their input. Only decoding
//! and encoding errors reach the caller.
//!
//! ## Persist What Fits
//!
//! Encoded images are large and storage quotas are small. Rather than
//! failing a save outright, [`history::HistoryStore::add`] retries with the
//! oldest entries dropped until the list fits, and reports exactly what was
//! written as a [`history::PersistOutcome`].
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, encoding, filtering and text rendering use the `image` crate
//! and `font8x8` bitmap glyphs. No system libraries, no font files.

pub mod config;
pub mod history;
pub mod imaging;
pub mod output;
pub mod state;
pub mod types;
