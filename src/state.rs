//! Studio session state and the reducer that advances it.
//!
//! [`AppState`] is a plain value. Each user action is an [`Action`];
//! [`update`] consumes the current state and returns the next one. Side
//! effects (persisting history, rendering edits) go through [`Effects`],
//! which holds the history store and the drawing backend.
//!
//! ```text
//! AppState ──update(action, fx)──▶ AppState
//!                    │
//!                    ├── fx.history  (add / remove / clear)
//!                    └── fx.backend  (render_encoded for SaveEdit)
//! ```

use crate::history::{HistoryStore, PersistOutcome, StorageMedium};
use crate::imaging::{
    AdjustmentParameters, ImageBackend, RenderRequest, TransformParameters, WatermarkSpec,
    render_encoded,
};
use crate::types::{
    AspectRatio, GeneratedArtifact, Resolution, StylePreset, unique_timestamp,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// An artifact open in the editor with pending, unsaved edits.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub source: GeneratedArtifact,
    pub adjust: AdjustmentParameters,
    pub transform: TransformParameters,
}

impl EditSession {
    pub fn new(source: GeneratedArtifact) -> Self {
        Self {
            source,
            adjust: AdjustmentParameters::IDENTITY,
            transform: TransformParameters::IDENTITY,
        }
    }

    pub fn is_pristine(&self) -> bool {
        self.adjust.is_identity() && self.transform.is_identity()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Mirror of the store's in-memory list, newest first.
    pub history: Vec<GeneratedArtifact>,
    pub current: Option<GeneratedArtifact>,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub style_preset: StylePreset,
    pub watermark: WatermarkSpec,
    pub show_watermark: bool,
    pub selection_mode: bool,
    pub selected: BTreeSet<i64>,
    pub editing: Option<EditSession>,
    /// What the last history mutation managed to persist.
    pub last_outcome: Option<PersistOutcome>,
    pub error: Option<String>,
}

impl AppState {
    /// Fresh session using `watermark` as the watermark defaults.
    pub fn new(watermark: WatermarkSpec) -> Self {
        Self {
            history: Vec::new(),
            current: None,
            prompt: String::new(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            style_preset: StylePreset::default(),
            watermark,
            show_watermark: false,
            selection_mode: false,
            selected: BTreeSet::new(),
            editing: None,
            last_outcome: None,
            error: None,
        }
    }

    fn find(&self, timestamp: i64) -> Option<&GeneratedArtifact> {
        self.history
            .iter()
            .chain(self.current.iter())
            .find(|a| a.timestamp == timestamp)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(WatermarkSpec::new("TdAnimator"))
    }
}

/// User intents the reducer understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Pull the persisted history into the session.
    HistoryLoaded,
    /// A new image arrived from the generator.
    Generated(GeneratedArtifact),
    SetPrompt(String),
    /// Make a history entry current and copy its settings. Ignored in
    /// selection mode.
    ///
    /// The stored watermark opacity is copied as is, so an entry saved at 0
    /// restores at 0 rather than falling back to 70. Only a record with no
    /// opacity field at all gets 70, at deserialization.
    Restore(i64),
    SetSelectionMode(bool),
    ToggleSelection(i64),
    /// Select every entry, or clear the selection if all are selected.
    ToggleSelectAll,
    DeleteSelected,
    ClearHistory,
    OpenEditor(i64),
    SetAdjustments(AdjustmentParameters),
    SetTransform(TransformParameters),
    ResetEdits,
    /// Render the pending edits and store the result as a new artifact.
    SaveEdit { now_ms: i64 },
    CancelEdit,
    SetWatermark(WatermarkSpec),
    SetShowWatermark(bool),
}

/// Side-effect boundary for [`update`].
pub struct Effects<'a, S: StorageMedium, B: ImageBackend> {
    pub history: &'a mut HistoryStore<S>,
    pub backend: &'a B,
    pub jpeg_quality: u8,
}

/// Apply `action` to `state` and return the next state.
pub fn update<S: StorageMedium, B: ImageBackend>(
    mut state: AppState,
    action: Action,
    fx: &mut Effects<'_, S, B>,
) -> AppState {
    match action {
        Action::HistoryLoaded => {
            state.history = fx.history.items().to_vec();
        }
        Action::Generated(artifact) => {
            state.current = Some(artifact.clone());
            state.error = None;
            commit_add(&mut state, fx, artifact);
        }
        Action::SetPrompt(prompt) => state.prompt = prompt,
        Action::Restore(timestamp) => {
            if state.selection_mode {
                return state;
            }
            let Some(item) = state.find(timestamp).cloned() else {
                debug!(timestamp, "restore target not in history");
                return state;
            };
            state.prompt = item.prompt.clone();
            state.aspect_ratio = item.aspect_ratio;
            state.resolution = item.resolution.unwrap_or_default();
            state.style_preset = item.style_preset.unwrap_or_default();
            state.watermark.effect = item.watermark_text_effect;
            state.watermark.opacity_percent = item.watermark_opacity;
            state.watermark.position = item.watermark_position;
            state.watermark.size = item.watermark_size;
            state.current = Some(item);
        }
        Action::SetSelectionMode(on) => {
            state.selection_mode = on;
            if !on {
                state.selected.clear();
            }
        }
        Action::ToggleSelection(timestamp) => {
            if !state.selected.remove(&timestamp)
                && state.history.iter().any(|a| a.timestamp == timestamp)
            {
                state.selected.insert(timestamp);
            }
        }
        Action::ToggleSelectAll => {
            if state.selected.len() == state.history.len() {
                state.selected.clear();
            } else {
                state.selected = state.history.iter().map(|a| a.timestamp).collect();
            }
        }
        Action::DeleteSelected => {
            if state.selected.is_empty() {
                return state;
            }
            let committed = fx.history.remove(&state.selected);
            state.history = committed.items.to_vec();
            state.last_outcome = Some(committed.outcome);
            state.selected.clear();
            state.selection_mode = false;
        }
        Action::ClearHistory => {
            state.last_outcome = Some(fx.history.clear());
            state.history.clear();
            state.selected.clear();
            state.selection_mode = false;
        }
        Action::OpenEditor(timestamp) => match state.find(timestamp).cloned() {
            Some(item) => {
                state.editing = Some(EditSession::new(item));
                state.error = None;
            }
            None => debug!(timestamp, "edit target not in history"),
        },
        Action::SetAdjustments(adjust) => {
            if let Some(session) = state.editing.as_mut() {
                session.adjust = adjust.clamped();
            }
        }
        Action::SetTransform(transform) => {
            if let Some(session) = state.editing.as_mut() {
                session.transform = transform.clamped();
            }
        }
        Action::ResetEdits => {
            if let Some(session) = state.editing.as_mut() {
                session.adjust = AdjustmentParameters::IDENTITY;
                session.transform = TransformParameters::IDENTITY;
            }
        }
        Action::SaveEdit { now_ms } => {
            let Some(session) = state.editing.take() else {
                return state;
            };
            let request = RenderRequest {
                adjust: session.adjust,
                transform: session.transform,
                watermark: state.show_watermark.then(|| state.watermark.clone()),
                output_mime: None,
                jpeg_quality: fx.jpeg_quality,
            };
            let source = &session.source;
            match render_encoded(fx.backend, &source.image_data, source.mime_type, &request) {
                Ok(encoded) => {
                    let taken: Vec<i64> = state.history.iter().map(|a| a.timestamp).collect();
                    let edited = GeneratedArtifact {
                        image_data: encoded.bytes,
                        mime_type: encoded.mime,
                        timestamp: unique_timestamp(now_ms, &taken),
                        ..source.clone()
                    };
                    state.current = Some(edited.clone());
                    state.error = None;
                    commit_add(&mut state, fx, edited);
                }
                Err(e) => {
                    warn!(timestamp = source.timestamp, error = %e, "edit could not be rendered");
                    state.error = Some(format!("Edited image could not be saved: {e}"));
                    state.editing = Some(session);
                }
            }
        }
        Action::CancelEdit => {
            state.editing = None;
            state.error = None;
        }
        Action::SetWatermark(spec) => state.watermark = spec,
        Action::SetShowWatermark(on) => state.show_watermark = on,
    }
    state
}

fn commit_add<S: StorageMedium, B: ImageBackend>(
    state: &mut AppState,
    fx: &mut Effects<'_, S, B>,
    artifact: GeneratedArtifact,
) {
    let committed = fx.history.add(artifact);
    state.history = committed.items.to_vec();
    state.last_outcome = Some(committed.outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryStorage;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::{RasterImage, Rotation, WatermarkEffect, WatermarkPosition};
    use crate::types::MimeType;
    use image::{Rgba, RgbaImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        RasterImage::new(RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 255])), MimeType::Png)
            .encode(MimeType::Png, 90)
            .unwrap()
    }

    fn artifact(ts: i64) -> GeneratedArtifact {
        GeneratedArtifact::new(png(4, 2), MimeType::Png, format!("prompt {ts}"), ts)
    }

    struct Harness {
        store: HistoryStore<MemoryStorage>,
        backend: MockBackend,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: HistoryStore::with_defaults(MemoryStorage::unbounded()),
                backend: MockBackend::new(),
            }
        }

        fn run(&mut self, state: AppState, actions: Vec<Action>) -> AppState {
            let mut fx = Effects {
                history: &mut self.store,
                backend: &self.backend,
                jpeg_quality: 90,
            };
            actions
                .into_iter()
                .fold(state, |s, action| update(s, action, &mut fx))
        }
    }

    fn seeded(h: &mut Harness, timestamps: &[i64]) -> AppState {
        let actions = timestamps
            .iter()
            .map(|&ts| Action::Generated(artifact(ts)))
            .collect();
        h.run(AppState::default(), actions)
    }

    #[test]
    fn generated_becomes_current_and_newest() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1, 2]);
        assert_eq!(state.current.as_ref().map(|a| a.timestamp), Some(2));
        let order: Vec<i64> = state.history.iter().map(|a| a.timestamp).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(state.last_outcome, Some(PersistOutcome::Persisted { count: 2 }));
    }

    #[test]
    fn history_loaded_reads_store() {
        let mut h = Harness::new();
        h.store.add(artifact(7));
        let state = h.run(AppState::default(), vec![Action::HistoryLoaded]);
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn restore_copies_settings_with_defaults() {
        let mut h = Harness::new();
        let mut item = artifact(5);
        item.aspect_ratio = AspectRatio::Wide;
        item.watermark_text_effect = WatermarkEffect::Neon;
        item.watermark_position = WatermarkPosition::Tile;
        h.store.add(item);

        let mut state = h.run(AppState::default(), vec![Action::HistoryLoaded]);
        state.resolution = Resolution::Uhd8k;
        state.style_preset = StylePreset::Anime;
        let state = h.run(state, vec![Action::Restore(5)]);

        assert_eq!(state.prompt, "prompt 5");
        assert_eq!(state.aspect_ratio, AspectRatio::Wide);
        assert_eq!(state.resolution, Resolution::Hd);
        assert_eq!(state.style_preset, StylePreset::None);
        assert_eq!(state.watermark.effect, WatermarkEffect::Neon);
        assert_eq!(state.watermark.position, WatermarkPosition::Tile);
        assert_eq!(state.watermark.opacity_percent, 70);
        assert_eq!(state.watermark.text, "TdAnimator");
        assert_eq!(state.current.map(|a| a.timestamp), Some(5));
    }

    #[test]
    fn restore_keeps_zero_opacity() {
        let mut h = Harness::new();
        let mut item = artifact(9);
        item.watermark_opacity = 0;
        h.store.add(item);

        let state = h.run(
            AppState::default(),
            vec![Action::HistoryLoaded, Action::Restore(9)],
        );
        assert_eq!(state.watermark.opacity_percent, 0);
    }

    #[test]
    fn restore_ignored_in_selection_mode() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1, 2]);
        let state = h.run(
            state,
            vec![Action::SetSelectionMode(true), Action::Restore(1)],
        );
        assert_eq!(state.current.map(|a| a.timestamp), Some(2));
    }

    #[test]
    fn toggle_selection_flips_membership() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1, 2]);
        let state = h.run(
            state,
            vec![
                Action::SetSelectionMode(true),
                Action::ToggleSelection(1),
                Action::ToggleSelection(2),
                Action::ToggleSelection(1),
                Action::ToggleSelection(99),
            ],
        );
        assert_eq!(state.selected, BTreeSet::from([2]));
    }

    #[test]
    fn select_all_toggles_off_when_everything_selected() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1, 2, 3]);
        let state = h.run(state, vec![Action::ToggleSelection(2), Action::ToggleSelectAll]);
        assert_eq!(state.selected, BTreeSet::from([1, 2, 3]));
        let state = h.run(state, vec![Action::ToggleSelectAll]);
        assert!(state.selected.is_empty());
    }

    #[test]
    fn leaving_selection_mode_clears_selection() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1]);
        let state = h.run(
            state,
            vec![
                Action::SetSelectionMode(true),
                Action::ToggleSelectAll,
                Action::SetSelectionMode(false),
            ],
        );
        assert!(state.selected.is_empty());
    }

    #[test]
    fn delete_selected_removes_and_exits_selection_mode() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1, 2, 3]);
        let state = h.run(
            state,
            vec![
                Action::SetSelectionMode(true),
                Action::ToggleSelection(1),
                Action::ToggleSelection(3),
                Action::DeleteSelected,
            ],
        );
        let order: Vec<i64> = state.history.iter().map(|a| a.timestamp).collect();
        assert_eq!(order, vec![2]);
        assert!(!state.selection_mode);
        assert!(state.selected.is_empty());
        assert_eq!(h.store.read_persisted().unwrap().len(), 1);
    }

    #[test]
    fn delete_with_empty_selection_is_noop() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1]);
        let state = h.run(
            state,
            vec![Action::SetSelectionMode(true), Action::DeleteSelected],
        );
        assert_eq!(state.history.len(), 1);
        assert!(state.selection_mode);
    }

    #[test]
    fn clear_history_empties_and_exits_selection_mode() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1, 2]);
        let state = h.run(
            state,
            vec![Action::SetSelectionMode(true), Action::ClearHistory],
        );
        assert!(state.history.is_empty());
        assert!(!state.selection_mode);
        assert!(h.store.read_persisted().unwrap().is_empty());
    }

    #[test]
    fn editor_starts_at_identity_and_resets() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1]);
        let state = h.run(
            state,
            vec![
                Action::OpenEditor(1),
                Action::SetAdjustments(AdjustmentParameters {
                    brightness: 150.0,
                    ..AdjustmentParameters::IDENTITY
                }),
            ],
        );
        assert!(!state.editing.as_ref().unwrap().is_pristine());
        let state = h.run(state, vec![Action::ResetEdits]);
        assert!(state.editing.as_ref().unwrap().is_pristine());
    }

    #[test]
    fn save_edit_adds_new_artifact_and_keeps_source() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1]);
        let state = h.run(
            state,
            vec![
                Action::OpenEditor(1),
                Action::SetTransform(TransformParameters {
                    rotation: Rotation::Cw90,
                    ..TransformParameters::IDENTITY
                }),
                Action::SaveEdit { now_ms: 1 },
            ],
        );

        assert!(state.editing.is_none());
        let order: Vec<i64> = state.history.iter().map(|a| a.timestamp).collect();
        assert_eq!(order, vec![2, 1]);
        let edited = &state.history[0];
        assert_eq!(edited.prompt, "prompt 1");
        let decoded = RasterImage::decode(&edited.image_data, edited.mime_type).unwrap();
        assert_eq!(decoded.dimensions(), (2, 4));
        assert_eq!(state.history[1], artifact(1));
    }

    #[test]
    fn save_edit_failure_keeps_session_open() {
        let mut h = Harness::new();
        let broken = GeneratedArtifact::new(b"not an image".to_vec(), MimeType::Png, "p", 1);
        h.store.add(broken);
        let state = h.run(
            AppState::default(),
            vec![
                Action::HistoryLoaded,
                Action::OpenEditor(1),
                Action::SaveEdit { now_ms: 10 },
            ],
        );
        assert!(state.editing.is_some());
        assert!(state.error.is_some());
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn cancel_edit_discards_session() {
        let mut h = Harness::new();
        let state = seeded(&mut h, &[1]);
        let state = h.run(state, vec![Action::OpenEditor(1), Action::CancelEdit]);
        assert!(state.editing.is_none());
        assert_eq!(state.history.len(), 1);
    }
}
