/// Scenario container — loading, indexing, and pre-flight validation.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::scene::{DialogueId, Scene, SceneId};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scenario has no scenes")]
    NoScenes,
    #[error("duplicate scene id {0:?}")]
    DuplicateSceneId(SceneId),
    #[error("scene {0:?} has no dialogues")]
    EmptyScene(SceneId),
    #[error("duplicate dialogue id {1:?} in scene {0:?}")]
    DuplicateDialogueId(SceneId, DialogueId),
    #[error("scene {0:?} references unknown scene {1:?}")]
    UnknownSceneRef(SceneId, SceneId),
    #[error("scene {0:?} references unknown dialogue {1:?}")]
    UnknownDialogueRef(SceneId, DialogueId),
    #[error("difficulty {1} in scene {0:?} is outside 1..=20")]
    DifficultyOutOfRange(SceneId, u8),
    #[error("critical threshold {1} in scene {0:?} is outside 1..=20")]
    ThresholdOutOfRange(SceneId, u8),
}

/// A complete branching scenario as exported by the editor: an ordered
/// list of scenes plus the variable values a session starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub initial_stats: FxHashMap<String, f64>,
    pub scenes: Vec<Scene>,
}

impl Scenario {
    /// Parse a scenario from a JSON string.
    pub fn parse_json(input: &str) -> Result<Scenario, ScenarioError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load and parse a scenario from a JSON file.
    pub fn load_from_json(path: &Path) -> Result<Scenario, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Scenario::parse_json(&contents)
    }

    /// The scene with the given id, if any.
    pub fn scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|s| &s.id == id)
    }

    /// Position of a scene in scenario order.
    pub fn scene_position(&self, id: &SceneId) -> Option<usize> {
        self.scenes.iter().position(|s| &s.id == id)
    }

    /// The scene a session starts from when none is named.
    pub fn first_scene(&self) -> Option<&Scene> {
        self.scenes.first()
    }

    /// Check the scenario and stop at the first problem.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        match self.lint().into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(()),
        }
    }

    /// Walk the whole scenario and collect every problem found: empty
    /// scenes, duplicate ids, dangling navigation targets, and dice
    /// parameters outside 1..=20.
    pub fn lint(&self) -> Vec<ScenarioError> {
        let mut problems = Vec::new();

        if self.scenes.is_empty() {
            problems.push(ScenarioError::NoScenes);
            return problems;
        }

        let mut scene_ids: FxHashSet<&SceneId> = FxHashSet::default();
        for scene in &self.scenes {
            if !scene_ids.insert(&scene.id) {
                problems.push(ScenarioError::DuplicateSceneId(scene.id.clone()));
            }
        }

        for scene in &self.scenes {
            if scene.is_empty() {
                problems.push(ScenarioError::EmptyScene(scene.id.clone()));
            }

            let mut dialogue_ids: FxHashSet<&DialogueId> = FxHashSet::default();
            for dialogue in &scene.dialogues {
                if !dialogue_ids.insert(&dialogue.id) {
                    problems.push(ScenarioError::DuplicateDialogueId(
                        scene.id.clone(),
                        dialogue.id.clone(),
                    ));
                }
            }

            for dialogue in &scene.dialogues {
                for choice in &dialogue.choices {
                    self.lint_targets(
                        scene,
                        &dialogue_ids,
                        choice.next_scene_id.as_ref(),
                        choice.next_dialogue_id.as_ref(),
                        &mut problems,
                    );
                    if let Some(ref check) = choice.dice_check {
                        if !(1..=20).contains(&check.difficulty) {
                            problems.push(ScenarioError::DifficultyOutOfRange(
                                scene.id.clone(),
                                check.difficulty,
                            ));
                        }
                        if !(1..=20).contains(&check.critical_threshold) {
                            problems.push(ScenarioError::ThresholdOutOfRange(
                                scene.id.clone(),
                                check.critical_threshold,
                            ));
                        }
                        for outcome in [&check.success, &check.failure] {
                            self.lint_targets(
                                scene,
                                &dialogue_ids,
                                outcome.next_scene_id.as_ref(),
                                outcome.next_dialogue_id.as_ref(),
                                &mut problems,
                            );
                        }
                    }
                }
            }
        }

        problems
    }

    fn lint_targets(
        &self,
        scene: &Scene,
        dialogue_ids: &FxHashSet<&DialogueId>,
        next_scene: Option<&SceneId>,
        next_dialogue: Option<&DialogueId>,
        problems: &mut Vec<ScenarioError>,
    ) {
        if let Some(target) = next_scene {
            if self.scene_position(target).is_none() {
                problems.push(ScenarioError::UnknownSceneRef(
                    scene.id.clone(),
                    target.clone(),
                ));
            }
        }
        // Dialogue targets resolve within their own scene only.
        if let Some(target) = next_dialogue {
            if !dialogue_ids.contains(target) {
                problems.push(ScenarioError::UnknownDialogueRef(
                    scene.id.clone(),
                    target.clone(),
                ));
            }
        }
    }
}
