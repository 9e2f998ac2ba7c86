//! Reload-vs-update classification for incoming viewer state

use crate::{ViewerField, ViewerState};

/// What to do with an incoming state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDecision {
    /// No renderer is active yet
    FirstLoad,
    /// At least one reload-triggering field changed
    Reload { changed: Vec<ViewerField> },
    /// Only cheap fields changed (possibly none); apply in place and re-render
    Update { changed: Vec<ViewerField> },
}

impl ChangeDecision {
    pub fn requires_pipeline(&self) -> bool {
        !matches!(self, ChangeDecision::Update { .. })
    }
}

/// Classify `incoming` against the active renderer's state
pub fn decide(active: Option<&ViewerState>, incoming: &ViewerState) -> ChangeDecision {
    let Some(current) = active else {
        return ChangeDecision::FirstLoad;
    };

    let changed = current.changed_fields(incoming);
    if changed.iter().any(ViewerField::triggers_reload) {
        ChangeDecision::Reload { changed }
    } else {
        ChangeDecision::Update { changed }
    }
}
