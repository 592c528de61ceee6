/// Scene-level stepping: one scene, one cursor, explicit states.
///
/// The stepper owns no randomness and no timers. Dice checks and scene
/// changes surface to the owner, which resolves or loads as needed.

use thiserror::Error;
use tracing::debug;

use crate::core::event::RuntimeEvent;
use crate::core::notifier::Notifier;
use crate::core::store::StateStore;
use crate::schema::check::Outcome;
use crate::schema::scene::{Choice, Dialogue, DialogueId, Scene, SceneId};

#[derive(Debug, Error)]
pub enum StepperError {
    #[error("no scene is loaded")]
    NoScene,
    #[error("advance is not allowed while a choice is pending")]
    ChoicePending,
    #[error("choose called outside of a choice point")]
    NotAtChoicePoint,
    #[error("choice index {0} out of range ({1} available)")]
    ChoiceOutOfRange(usize, usize),
    #[error("choice {0} carries a dice check and must be resolved first")]
    CheckRequired(usize),
    #[error("dialogue {0:?} does not exist in scene {1:?}")]
    UnknownDialogue(DialogueId, SceneId),
}

/// Where the stepper is in the scene lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperState {
    /// No scene loaded.
    Idle,
    /// A line without choices is current.
    ShowingDialogue,
    /// The current line carries choices; one must be taken to move on.
    AwaitingChoice,
    /// The scene has run out of lines. Terminal until the next load.
    SceneComplete,
}

/// Where a completed choice or outcome sent the playhead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Stayed inside the scene (another line, or scene completion).
    Internal,
    /// The target lives in another scene; the owner must load it.
    ToScene(SceneId),
}

pub struct DialogueStepper {
    scene: Option<Scene>,
    cursor: usize,
    state: StepperState,
    notifier: Notifier,
}

impl DialogueStepper {
    pub fn new(notifier: Notifier) -> DialogueStepper {
        DialogueStepper {
            scene: None,
            cursor: 0,
            state: StepperState::Idle,
            notifier,
        }
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    /// Index of the current dialogue within the loaded scene.
    pub fn dialogue_index(&self) -> usize {
        self.cursor
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_id(&self) -> Option<&SceneId> {
        self.scene.as_ref().map(|s| &s.id)
    }

    /// The line currently on screen, if one is.
    pub fn current_dialogue(&self) -> Option<&Dialogue> {
        match self.state {
            StepperState::ShowingDialogue | StepperState::AwaitingChoice => {
                self.scene.as_ref().and_then(|s| s.dialogues.get(self.cursor))
            }
            _ => None,
        }
    }

    /// Forget the loaded scene and return to Idle.
    pub fn reset(&mut self) {
        self.scene = None;
        self.cursor = 0;
        self.state = StepperState::Idle;
    }

    /// Load a scene and show its first line; a line with choices opens
    /// straight at its choice point. An empty scene completes
    /// immediately instead.
    pub fn load_scene(&mut self, scene: Scene) {
        debug!("loading scene {:?}", scene.id);
        self.cursor = 0;
        if scene.is_empty() {
            let scene_id = scene.id.clone();
            self.scene = Some(scene);
            self.complete_scene(scene_id);
        } else {
            self.scene = Some(scene);
            self.show_line(0);
        }
    }

    /// Move past the current line, completing the scene after the last
    /// one. A line with choices cannot be advanced past; the call is
    /// refused and one of its choices must be taken instead. Extra
    /// calls after completion are accepted and do nothing.
    pub fn advance(&mut self) -> Result<(), StepperError> {
        match self.state {
            StepperState::Idle => Err(StepperError::NoScene),
            StepperState::AwaitingChoice => Err(StepperError::ChoicePending),
            StepperState::SceneComplete => Ok(()),
            StepperState::ShowingDialogue => {
                self.step_to(self.cursor + 1);
                Ok(())
            }
        }
    }

    /// Take a plain choice: apply its effects, then follow its target.
    /// Valid whenever the current line carries choices, which is the
    /// moment it shows. Choices that carry a dice check are refused;
    /// resolve the check and use `apply_outcome`/`navigate_outcome`
    /// instead.
    pub fn choose(
        &mut self,
        index: usize,
        store: &mut StateStore,
    ) -> Result<Navigation, StepperError> {
        if self.state != StepperState::AwaitingChoice {
            return Err(StepperError::NotAtChoicePoint);
        }
        let choice = self.choice_at(index)?;
        if choice.dice_check.is_some() {
            return Err(StepperError::CheckRequired(index));
        }
        // A bad dialogue target is caught before any effect lands.
        if let Some(ref target) = choice.next_dialogue_id {
            let scene = self.scene.as_ref().ok_or(StepperError::NoScene)?;
            if scene.dialogue_index(target).is_none() {
                return Err(StepperError::UnknownDialogue(
                    target.clone(),
                    scene.id.clone(),
                ));
            }
        }

        debug!("choice taken: {}", choice.text);
        if !choice.effects.is_empty() {
            store.apply_batch(&choice.effects);
        }
        self.navigate(
            choice.next_dialogue_id.as_ref(),
            choice.next_scene_id.as_ref(),
        )
    }

    /// A copy of the choice at `index` on the current line.
    pub fn choice_at(&self, index: usize) -> Result<Choice, StepperError> {
        let dialogue = self.current_dialogue().ok_or(StepperError::NoScene)?;
        dialogue
            .choices
            .get(index)
            .cloned()
            .ok_or(StepperError::ChoiceOutOfRange(
                index,
                dialogue.choices.len(),
            ))
    }

    /// Apply an outcome's moral delta through the store.
    pub fn apply_outcome(&self, outcome: &Outcome, store: &mut StateStore) {
        if let Some(ref moral) = outcome.moral {
            store.apply(moral);
        }
    }

    /// Follow an outcome's navigation targets, with the same priority
    /// rules as a plain choice.
    pub fn navigate_outcome(&mut self, outcome: &Outcome) -> Result<Navigation, StepperError> {
        if self.scene.is_none() {
            return Err(StepperError::NoScene);
        }
        self.navigate(
            outcome.next_dialogue_id.as_ref(),
            outcome.next_scene_id.as_ref(),
        )
    }

    /// A dialogue target beats a scene target; no target falls through
    /// to the next line in scene order. Unknown dialogue targets leave
    /// the stepper exactly where it was.
    fn navigate(
        &mut self,
        next_dialogue: Option<&DialogueId>,
        next_scene: Option<&SceneId>,
    ) -> Result<Navigation, StepperError> {
        if let Some(target) = next_dialogue {
            let index = {
                let scene = self.scene.as_ref().ok_or(StepperError::NoScene)?;
                scene.dialogue_index(target).ok_or_else(|| {
                    StepperError::UnknownDialogue(target.clone(), scene.id.clone())
                })?
            };
            self.show_line(index);
            Ok(Navigation::Internal)
        } else if let Some(target) = next_scene {
            Ok(Navigation::ToScene(target.clone()))
        } else {
            self.step_to(self.cursor + 1);
            Ok(Navigation::Internal)
        }
    }

    fn step_to(&mut self, index: usize) {
        let (line_count, scene_id) = match self.scene {
            Some(ref scene) => (scene.dialogues.len(), scene.id.clone()),
            None => return,
        };
        if index >= line_count {
            self.complete_scene(scene_id);
        } else {
            self.show_line(index);
        }
    }

    /// Make the line at `index` current. A line carrying choices is
    /// actionable as soon as it shows, so it opens in AwaitingChoice.
    fn show_line(&mut self, index: usize) {
        self.cursor = index;
        let has_choices = self
            .scene
            .as_ref()
            .and_then(|scene| scene.dialogues.get(index))
            .map(Dialogue::has_choices)
            .unwrap_or(false);
        self.state = if has_choices {
            StepperState::AwaitingChoice
        } else {
            StepperState::ShowingDialogue
        };
        self.emit_current();
    }

    fn complete_scene(&mut self, scene_id: SceneId) {
        debug!("scene {:?} complete", scene_id);
        self.state = StepperState::SceneComplete;
        self.notifier
            .emit(&RuntimeEvent::SceneComplete { scene_id });
    }

    fn emit_current(&self) {
        let scene = match self.scene {
            Some(ref scene) => scene,
            None => return,
        };
        if let Some(dialogue) = scene.dialogues.get(self.cursor) {
            self.notifier.emit(&RuntimeEvent::DialogueShow {
                scene_id: scene.id.clone(),
                dialogue: dialogue.clone(),
                mood: dialogue.resolved_mood().to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::EventKind;
    use crate::schema::check::DiceCheck;
    use crate::schema::stats::StatDelta;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn line(id: &str, text: &str) -> Dialogue {
        Dialogue {
            id: DialogueId(id.to_string()),
            speaker: "Léa".to_string(),
            speaker_mood: None,
            text: text.to_string(),
            choices: Vec::new(),
        }
    }

    fn plain_choice(text: &str) -> Choice {
        Choice {
            text: text.to_string(),
            next_scene_id: None,
            next_dialogue_id: None,
            dice_check: None,
            effects: Vec::new(),
        }
    }

    fn make_scene(id: &str, dialogues: Vec<Dialogue>) -> Scene {
        Scene {
            id: SceneId(id.to_string()),
            title: id.to_string(),
            background_url: None,
            dialogues,
        }
    }

    fn harness() -> (DialogueStepper, StateStore, Rc<RefCell<Vec<RuntimeEvent>>>) {
        let notifier = Notifier::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::DialogueShow,
            EventKind::SceneComplete,
            EventKind::VariablesUpdated,
            EventKind::VariablesDelta,
        ] {
            let sink = Rc::clone(&log);
            notifier.on(kind, move |event| sink.borrow_mut().push(event.clone()));
        }
        let store = StateStore::new(notifier.clone());
        (DialogueStepper::new(notifier), store, log)
    }

    #[test]
    fn load_shows_the_first_line() {
        let (mut stepper, _, log) = harness();
        stepper.load_scene(make_scene("intro", vec![line("d1", "Bonjour")]));

        assert_eq!(stepper.state(), StepperState::ShowingDialogue);
        assert_eq!(stepper.dialogue_index(), 0);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        match &log[0] {
            RuntimeEvent::DialogueShow { dialogue, mood, .. } => {
                assert_eq!(dialogue.text, "Bonjour");
                assert_eq!(mood, "neutral");
            }
            other => panic!("expected dialogue:show, got {other:?}"),
        }
    }

    #[test]
    fn explicit_mood_travels_with_the_event() {
        let (mut stepper, _, log) = harness();
        let mut moody = line("d1", "Hmpf.");
        moody.speaker_mood = Some("annoyed".to_string());
        stepper.load_scene(make_scene("intro", vec![moody]));

        let log = log.borrow();
        match &log[0] {
            RuntimeEvent::DialogueShow { mood, .. } => assert_eq!(mood, "annoyed"),
            other => panic!("expected dialogue:show, got {other:?}"),
        }
    }

    #[test]
    fn advance_walks_lines_then_completes() {
        let (mut stepper, _, log) = harness();
        stepper.load_scene(make_scene(
            "intro",
            vec![line("d1", "un"), line("d2", "deux")],
        ));

        stepper.advance().unwrap();
        assert_eq!(stepper.dialogue_index(), 1);
        stepper.advance().unwrap();
        assert_eq!(stepper.state(), StepperState::SceneComplete);

        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2].kind(), EventKind::SceneComplete);
    }

    #[test]
    fn completion_is_idempotent_and_quiet() {
        let (mut stepper, _, log) = harness();
        stepper.load_scene(make_scene("intro", vec![line("d1", "seul")]));
        stepper.advance().unwrap();
        assert_eq!(stepper.state(), StepperState::SceneComplete);

        let emitted = log.borrow().len();
        for _ in 0..5 {
            stepper.advance().unwrap();
        }
        assert_eq!(stepper.state(), StepperState::SceneComplete);
        assert_eq!(log.borrow().len(), emitted);
    }

    #[test]
    fn empty_scene_completes_immediately() {
        let (mut stepper, _, log) = harness();
        stepper.load_scene(make_scene("vide", Vec::new()));

        assert_eq!(stepper.state(), StepperState::SceneComplete);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind(), EventKind::SceneComplete);
    }

    #[test]
    fn advance_without_scene_is_an_error() {
        let (mut stepper, _, _) = harness();
        assert!(matches!(stepper.advance(), Err(StepperError::NoScene)));
    }

    #[test]
    fn choice_line_opens_its_choices_the_moment_it_shows() {
        let (mut stepper, mut store, log) = harness();
        let mut ask = line("d1", "Alors ?");
        ask.choices = vec![plain_choice("Oui"), plain_choice("Non")];
        stepper.load_scene(make_scene("intro", vec![ask, line("d2", "suite")]));

        // No separate arming step: showing the line is the choice point.
        assert_eq!(stepper.state(), StepperState::AwaitingChoice);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].kind(), EventKind::DialogueShow);

        assert!(matches!(
            stepper.advance(),
            Err(StepperError::ChoicePending)
        ));
        assert_eq!(stepper.state(), StepperState::AwaitingChoice);
        assert_eq!(log.borrow().len(), 1);

        assert!(stepper.choose(0, &mut store).is_ok());
        assert_eq!(stepper.state(), StepperState::ShowingDialogue);
        assert_eq!(stepper.dialogue_index(), 1);
    }

    #[test]
    fn advancing_onto_a_choice_line_awaits_immediately() {
        let (mut stepper, mut store, _) = harness();
        let mut ask = line("d2", "Alors ?");
        ask.choices = vec![plain_choice("Oui")];
        stepper.load_scene(make_scene("intro", vec![line("d1", "début"), ask]));
        assert_eq!(stepper.state(), StepperState::ShowingDialogue);

        stepper.advance().unwrap();
        assert_eq!(stepper.state(), StepperState::AwaitingChoice);
        assert!(stepper.choose(0, &mut store).is_ok());
    }

    #[test]
    fn plain_choice_falls_through_to_the_next_line() {
        let (mut stepper, mut store, _) = harness();
        let mut ask = line("d1", "Alors ?");
        ask.choices = vec![plain_choice("Continuer")];
        stepper.load_scene(make_scene("intro", vec![ask, line("d2", "suite")]));

        let nav = stepper.choose(0, &mut store).unwrap();
        assert_eq!(nav, Navigation::Internal);
        assert_eq!(stepper.state(), StepperState::ShowingDialogue);
        assert_eq!(stepper.dialogue_index(), 1);
    }

    #[test]
    fn choice_with_dialogue_target_jumps_within_the_scene() {
        let (mut stepper, mut store, _) = harness();
        let mut ask = line("d2", "Encore ?");
        let mut back = plain_choice("Revenir");
        back.next_dialogue_id = Some(DialogueId("d1".to_string()));
        // A dialogue target wins even when a scene target is also set.
        back.next_scene_id = Some(SceneId("ailleurs".to_string()));
        ask.choices = vec![back];
        stepper.load_scene(make_scene("intro", vec![line("d1", "début"), ask]));
        stepper.advance().unwrap();

        let nav = stepper.choose(0, &mut store).unwrap();
        assert_eq!(nav, Navigation::Internal);
        assert_eq!(stepper.dialogue_index(), 0);
    }

    #[test]
    fn choice_with_scene_target_surfaces_a_scene_change() {
        let (mut stepper, mut store, _) = harness();
        let mut ask = line("d1", "Partir ?");
        let mut leave = plain_choice("Partir");
        leave.next_scene_id = Some(SceneId("bureau".to_string()));
        ask.choices = vec![leave];
        stepper.load_scene(make_scene("intro", vec![ask]));

        let nav = stepper.choose(0, &mut store).unwrap();
        assert_eq!(nav, Navigation::ToScene(SceneId("bureau".to_string())));
    }

    #[test]
    fn last_line_choice_without_target_completes_the_scene() {
        let (mut stepper, mut store, log) = harness();
        let mut ask = line("d1", "Fini ?");
        ask.choices = vec![plain_choice("Fini")];
        stepper.load_scene(make_scene("intro", vec![ask]));

        stepper.choose(0, &mut store).unwrap();
        assert_eq!(stepper.state(), StepperState::SceneComplete);
        assert_eq!(log.borrow().last().unwrap().kind(), EventKind::SceneComplete);
    }

    #[test]
    fn choice_effects_flow_through_the_store() {
        let (mut stepper, mut store, log) = harness();
        let mut ask = line("d1", "Aider ?");
        let mut help = plain_choice("Aider");
        help.effects = vec![StatDelta {
            variable: "Empathie".to_string(),
            delta: 10.0,
        }];
        ask.choices = vec![help];
        stepper.load_scene(make_scene("intro", vec![ask, line("d2", "merci")]));

        stepper.choose(0, &mut store).unwrap();
        assert_eq!(store.get("Empathie"), 10.0);
        // Effects land before the next line shows.
        let kinds: Vec<EventKind> = log.borrow().iter().map(RuntimeEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::DialogueShow,
                EventKind::VariablesDelta,
                EventKind::VariablesUpdated,
                EventKind::DialogueShow,
            ]
        );
    }

    #[test]
    fn unknown_dialogue_target_leaves_state_untouched() {
        let (mut stepper, mut store, log) = harness();
        let mut ask = line("d1", "Où ?");
        let mut broken = plain_choice("Sauter");
        broken.next_dialogue_id = Some(DialogueId("absent".to_string()));
        broken.effects = vec![StatDelta {
            variable: "Empathie".to_string(),
            delta: 10.0,
        }];
        ask.choices = vec![broken];
        stepper.load_scene(make_scene("intro", vec![ask]));
        let emitted = log.borrow().len();

        let result = stepper.choose(0, &mut store);
        assert!(matches!(
            result,
            Err(StepperError::UnknownDialogue(ref d, _)) if d.0 == "absent"
        ));
        assert_eq!(stepper.state(), StepperState::AwaitingChoice);
        assert_eq!(stepper.dialogue_index(), 0);
        // The refused choice's effects never land either.
        assert_eq!(store.get("Empathie"), 0.0);
        assert_eq!(log.borrow().len(), emitted);
    }

    #[test]
    fn out_of_range_choice_is_an_error() {
        let (mut stepper, mut store, _) = harness();
        let mut ask = line("d1", "Alors ?");
        ask.choices = vec![plain_choice("Seule option")];
        stepper.load_scene(make_scene("intro", vec![ask]));

        assert!(matches!(
            stepper.choose(3, &mut store),
            Err(StepperError::ChoiceOutOfRange(3, 1))
        ));
    }

    #[test]
    fn choose_outside_a_choice_point_is_an_error() {
        let (mut stepper, mut store, _) = harness();
        stepper.load_scene(make_scene("intro", vec![line("d1", "...")]));
        assert!(matches!(
            stepper.choose(0, &mut store),
            Err(StepperError::NotAtChoicePoint)
        ));
    }

    #[test]
    fn dice_choice_is_refused_unresolved() {
        let (mut stepper, mut store, _) = harness();
        let mut ask = line("d1", "Tenter ?");
        let mut gamble = plain_choice("Tenter le coup");
        gamble.dice_check = Some(DiceCheck {
            difficulty: 12,
            critical_threshold: 19,
            success: Outcome {
                message: "ok".to_string(),
                illustration: None,
                moral: None,
                next_scene_id: None,
                next_dialogue_id: None,
            },
            failure: Outcome {
                message: "raté".to_string(),
                illustration: None,
                moral: None,
                next_scene_id: None,
                next_dialogue_id: None,
            },
        });
        ask.choices = vec![gamble];
        stepper.load_scene(make_scene("intro", vec![ask]));

        assert!(matches!(
            stepper.choose(0, &mut store),
            Err(StepperError::CheckRequired(0))
        ));
        assert_eq!(stepper.state(), StepperState::AwaitingChoice);
    }

    #[test]
    fn outcome_application_and_navigation() {
        let (mut stepper, mut store, _) = harness();
        let mut ask = line("d1", "Tenter ?");
        ask.choices = vec![plain_choice("placeholder")];
        stepper.load_scene(make_scene("intro", vec![ask, line("d2", "après")]));

        let outcome = Outcome {
            message: "Bravo".to_string(),
            illustration: None,
            moral: Some(StatDelta {
                variable: "Confiance".to_string(),
                delta: 15.0,
            }),
            next_scene_id: None,
            next_dialogue_id: Some(DialogueId("d2".to_string())),
        };
        stepper.apply_outcome(&outcome, &mut store);
        assert_eq!(store.get("Confiance"), 15.0);

        let nav = stepper.navigate_outcome(&outcome).unwrap();
        assert_eq!(nav, Navigation::Internal);
        assert_eq!(stepper.dialogue_index(), 1);
        assert_eq!(stepper.state(), StepperState::ShowingDialogue);
    }

    #[test]
    fn reset_returns_to_idle() {
        let (mut stepper, _, _) = harness();
        stepper.load_scene(make_scene("intro", vec![line("d1", "...")]));
        stepper.reset();
        assert_eq!(stepper.state(), StepperState::Idle);
        assert!(stepper.scene().is_none());
        assert!(stepper.current_dialogue().is_none());
    }
}
