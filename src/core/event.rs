use rustc_hash::FxHashMap;

use crate::schema::scene::{Dialogue, SceneId};
use crate::schema::stats::StatDelta;

/// Discriminant for the runtime event set. The set is closed: hosts
/// switch on the kind and never see ad-hoc event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DialogueShow,
    SceneComplete,
    VariablesUpdated,
    VariablesDelta,
}

impl EventKind {
    /// Returns the wire name for this kind (e.g., "dialogue:show").
    pub fn name(&self) -> &'static str {
        match self {
            Self::DialogueShow => "dialogue:show",
            Self::SceneComplete => "scene:complete",
            Self::VariablesUpdated => "variables:updated",
            Self::VariablesDelta => "variables:delta",
        }
    }
}

/// Everything the runtime announces to its host.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A dialogue line became current. `mood` is the resolved speaker
    /// mood ("neutral" when the line does not name one).
    DialogueShow {
        scene_id: SceneId,
        dialogue: Dialogue,
        mood: String,
    },
    /// The current scene ran out of lines.
    SceneComplete { scene_id: SceneId },
    /// Full post-change snapshot of every known variable.
    VariablesUpdated { stats: FxHashMap<String, f64> },
    /// The effective per-variable changes of one mutation, after clamping.
    VariablesDelta { deltas: Vec<StatDelta> },
}

impl RuntimeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DialogueShow { .. } => EventKind::DialogueShow,
            Self::SceneComplete { .. } => EventKind::SceneComplete,
            Self::VariablesUpdated { .. } => EventKind::VariablesUpdated,
            Self::VariablesDelta { .. } => EventKind::VariablesDelta,
        }
    }
}
