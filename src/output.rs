//! CLI output formatting for history and render commands.
//!
//! # Output Format
//!
//! ## History
//!
//! ```text
//! History (2 of 5)
//! 001 a cat wearing a tiny hat
//!     Saved: 1700000000123 · image/png · 12.4 KB
//!     File: tdanimator-1700000000123.png
//! 002 neon city at night
//!     Saved: 1699999999000 · image/jpeg · 230.0 KB
//!     File: tdanimator-1699999999000.jpg
//! ```
//!
//! ## Edit
//!
//! ```text
//! 001 photo.jpg → photo-edited.png
//!     1024x768 · image/png · 83.2 KB
//! 002 broken.png
//!     Error: failed to decode image: ...
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::history::{PersistFailure, PersistOutcome};
use crate::imaging::EncodedImage;
use crate::types::GeneratedArtifact;
use std::fmt::Display;

const PROMPT_WIDTH: usize = 60;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Human-readable byte size: `512 B`, `12.4 KB`, `3.1 MB`.
fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

// ============================================================================
// History
// ============================================================================

/// One entry per artifact, newest first, in the order stored.
pub fn format_history_listing(items: &[GeneratedArtifact], max_items: usize) -> Vec<String> {
    if items.is_empty() {
        return vec!["History is empty".to_string()];
    }

    let mut lines = vec![format!("History ({} of {})", items.len(), max_items)];
    for (i, item) in items.iter().enumerate() {
        let prompt = item.prompt.trim();
        let title = if prompt.is_empty() {
            "(no prompt)".to_string()
        } else {
            truncate_chars(prompt, PROMPT_WIDTH)
        };
        lines.push(format!("{} {}", format_index(i + 1), title));
        lines.push(format!(
            "{}Saved: {} · {} · {}",
            indent(1),
            item.timestamp,
            item.mime_type,
            format_size(item.image_data.len())
        ));
        lines.push(format!("{}File: {}", indent(1), item.download_name()));
    }
    lines
}

pub fn print_history_listing(items: &[GeneratedArtifact], max_items: usize) {
    for line in format_history_listing(items, max_items) {
        println!("{}", line);
    }
}

/// One line describing what a history mutation wrote to storage.
pub fn format_persist_outcome(outcome: &PersistOutcome) -> String {
    match outcome {
        PersistOutcome::Persisted { count: 0 } => "History cleared".to_string(),
        PersistOutcome::Persisted { count } => format!("Saved {} in history", plural(*count)),
        PersistOutcome::Degraded { persisted, dropped } => format!(
            "Storage full: saved newest {}, dropped {} older",
            plural(*persisted),
            dropped
        ),
        PersistOutcome::NotPersisted {
            reason: PersistFailure::Capacity,
        } => "Not saved: image is larger than the storage quota".to_string(),
        PersistOutcome::NotPersisted {
            reason: PersistFailure::Storage(message),
        } => format!("Not saved: {}", message),
    }
}

fn plural(count: usize) -> String {
    match count {
        1 => "1 item".to_string(),
        n => format!("{n} items"),
    }
}

// ============================================================================
// Edit
// ============================================================================

/// Header plus detail line for one rendered input.
pub fn format_render_result(
    index: usize,
    input: &str,
    output: &str,
    encoded: &EncodedImage,
) -> Vec<String> {
    vec![
        format!("{} {} → {}", format_index(index), input, output),
        format!(
            "{}{}x{} · {} · {}",
            indent(1),
            encoded.width,
            encoded.height,
            encoded.mime,
            format_size(encoded.bytes.len())
        ),
    ]
}

pub fn format_render_failure(index: usize, input: &str, error: &dyn Display) -> Vec<String> {
    vec![
        format!("{} {}", format_index(index), input),
        format!("{}Error: {}", indent(1), error),
    ]
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MimeType;

    fn artifact(prompt: &str, ts: i64, len: usize) -> GeneratedArtifact {
        GeneratedArtifact::new(vec![0; len], MimeType::Png, prompt, ts)
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn truncate_chars_short() {
        assert_eq!(truncate_chars("Short text", 40), "Short text");
    }

    #[test]
    fn truncate_chars_exact() {
        let text = "a".repeat(40);
        assert_eq!(truncate_chars(&text, 40), text);
    }

    #[test]
    fn truncate_chars_long() {
        let text = "a".repeat(50);
        assert_eq!(truncate_chars(&text, 40), format!("{}...", "a".repeat(40)));
    }

    #[test]
    fn truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("ééééé", 3), "ééé...");
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    // =========================================================================
    // History tests
    // =========================================================================

    #[test]
    fn empty_history_listing() {
        assert_eq!(format_history_listing(&[], 5), vec!["History is empty"]);
    }

    #[test]
    fn history_listing_shows_each_entry() {
        let items = vec![artifact("a cat", 20, 2048), artifact("  ", 10, 10)];
        let lines = format_history_listing(&items, 5);
        assert_eq!(
            lines,
            vec![
                "History (2 of 5)",
                "001 a cat",
                "    Saved: 20 · image/png · 2.0 KB",
                "    File: tdanimator-20.png",
                "002 (no prompt)",
                "    Saved: 10 · image/png · 10 B",
                "    File: tdanimator-10.png",
            ]
        );
    }

    #[test]
    fn persist_outcome_messages() {
        assert_eq!(
            format_persist_outcome(&PersistOutcome::Persisted { count: 3 }),
            "Saved 3 items in history"
        );
        assert_eq!(
            format_persist_outcome(&PersistOutcome::Persisted { count: 0 }),
            "History cleared"
        );
        assert_eq!(
            format_persist_outcome(&PersistOutcome::Degraded {
                persisted: 1,
                dropped: 2
            }),
            "Storage full: saved newest 1 item, dropped 2 older"
        );
        assert!(
            format_persist_outcome(&PersistOutcome::NotPersisted {
                reason: PersistFailure::Capacity
            })
            .starts_with("Not saved")
        );
    }

    // =========================================================================
    // Edit tests
    // =========================================================================

    #[test]
    fn render_result_lines() {
        let encoded = EncodedImage {
            bytes: vec![0; 1536],
            mime: MimeType::Jpeg,
            width: 64,
            height: 48,
        };
        assert_eq!(
            format_render_result(2, "in.png", "in-edited.jpg", &encoded),
            vec!["002 in.png → in-edited.jpg", "    64x48 · image/jpeg · 1.5 KB"]
        );
    }

    #[test]
    fn render_failure_lines() {
        let lines = format_render_failure(1, "bad.png", &"failed to decode image");
        assert_eq!(lines[1], "    Error: failed to decode image");
    }
}
