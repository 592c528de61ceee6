use serde::{Deserialize, Serialize};

use super::scene::{DialogueId, SceneId};
use super::stats::StatDelta;

/// Threshold a successful roll must also reach to count as critical.
pub const DEFAULT_CRITICAL_THRESHOLD: u8 = 19;

fn default_critical_threshold() -> u8 {
    DEFAULT_CRITICAL_THRESHOLD
}

/// A d20 check gating a choice. The roll succeeds when it meets the
/// difficulty; a success at or above the critical threshold is critical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceCheck {
    pub difficulty: u8,
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: u8,
    pub success: Outcome,
    pub failure: Outcome,
}

/// What a resolved check branch delivers: a message for the host, an
/// optional stat change, and an optional follow-up destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub message: String,
    pub illustration: Option<String>,
    pub moral: Option<StatDelta>,
    pub next_scene_id: Option<SceneId>,
    pub next_dialogue_id: Option<DialogueId>,
}
