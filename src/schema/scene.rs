use serde::{Deserialize, Serialize};

use super::check::DiceCheck;
use super::stats::StatDelta;

/// Newtype wrapper for scene IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub String);

/// Newtype wrapper for dialogue IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogueId(pub String);

/// Speaker mood shown when a dialogue does not name one.
pub const NEUTRAL_MOOD: &str = "neutral";

/// One spoken line, plus the choices offered once it has been read.
/// A dialogue without choices simply advances to the next line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub id: DialogueId,
    pub speaker: String,
    pub speaker_mood: Option<String>,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Dialogue {
    /// The mood hosts should render; an absent mood reads as neutral.
    pub fn resolved_mood(&self) -> &str {
        self.speaker_mood.as_deref().unwrap_or(NEUTRAL_MOOD)
    }

    /// Returns true if this line ends at a choice point.
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}

/// A selectable answer. Navigation targets are optional: a choice with
/// neither target falls through to the next dialogue in scene order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub text: String,
    pub next_scene_id: Option<SceneId>,
    pub next_dialogue_id: Option<DialogueId>,
    pub dice_check: Option<DiceCheck>,
    #[serde(default)]
    pub effects: Vec<StatDelta>,
}

/// An ordered run of dialogues under one backdrop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: SceneId,
    pub title: String,
    pub background_url: Option<String>,
    #[serde(default)]
    pub dialogues: Vec<Dialogue>,
}

impl Scene {
    /// Returns true if this scene has nothing to play.
    pub fn is_empty(&self) -> bool {
        self.dialogues.is_empty()
    }

    /// Position of a dialogue within this scene, if present.
    pub fn dialogue_index(&self, id: &DialogueId) -> Option<usize> {
        self.dialogues.iter().position(|d| &d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scene() -> Scene {
        Scene {
            id: SceneId("mairie".to_string()),
            title: "À la mairie".to_string(),
            background_url: Some("https://assets.example/mairie.png".to_string()),
            dialogues: vec![
                Dialogue {
                    id: DialogueId("d1".to_string()),
                    speaker: "Léa".to_string(),
                    speaker_mood: Some("happy".to_string()),
                    text: "Bienvenue !".to_string(),
                    choices: Vec::new(),
                },
                Dialogue {
                    id: DialogueId("d2".to_string()),
                    speaker: "Karim".to_string(),
                    speaker_mood: None,
                    text: "Par où commence-t-on ?".to_string(),
                    choices: vec![Choice {
                        text: "Par la rampe d'accès.".to_string(),
                        next_scene_id: None,
                        next_dialogue_id: Some(DialogueId("d1".to_string())),
                        dice_check: None,
                        effects: Vec::new(),
                    }],
                },
            ],
        }
    }

    #[test]
    fn resolved_mood_explicit_and_default() {
        let scene = make_scene();
        assert_eq!(scene.dialogues[0].resolved_mood(), "happy");
        assert_eq!(scene.dialogues[1].resolved_mood(), "neutral");
    }

    #[test]
    fn has_choices_reflects_choice_list() {
        let scene = make_scene();
        assert!(!scene.dialogues[0].has_choices());
        assert!(scene.dialogues[1].has_choices());
    }

    #[test]
    fn dialogue_index_lookup() {
        let scene = make_scene();
        assert_eq!(scene.dialogue_index(&DialogueId("d2".to_string())), Some(1));
        assert_eq!(scene.dialogue_index(&DialogueId("missing".to_string())), None);
    }

    #[test]
    fn scene_parses_from_editor_json() {
        let json = r#"{
            "id": "intro",
            "title": "Introduction",
            "backgroundUrl": "https://assets.example/hall.png",
            "dialogues": [
                {
                    "id": "d1",
                    "speaker": "Léa",
                    "text": "On y va ?",
                    "choices": [
                        { "text": "Oui", "nextDialogueId": "d1" },
                        { "text": "Non, attends", "effects": [{ "variable": "Autonomie", "delta": -5 }] }
                    ]
                }
            ]
        }"#;
        let scene: Scene = serde_json::from_str(json).expect("valid scene JSON");
        assert_eq!(scene.id, SceneId("intro".to_string()));
        assert_eq!(scene.dialogues.len(), 1);
        let choices = &scene.dialogues[0].choices;
        assert_eq!(choices.len(), 2);
        assert!(choices[0].effects.is_empty());
        assert_eq!(choices[1].effects[0].variable, "Autonomie");
        assert!(choices[0].dice_check.is_none());
    }

    #[test]
    fn empty_scene_detected() {
        let scene = Scene {
            id: SceneId("vide".to_string()),
            title: "Vide".to_string(),
            background_url: None,
            dialogues: Vec::new(),
        };
        assert!(scene.is_empty());
    }
}
