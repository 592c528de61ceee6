/// Session orchestration: scene order, dice staging, endings.
///
/// Owns the notifier, store, stepper, scheduler, and RNG, and is the
/// one surface hosts drive. Scene-to-scene navigation and the timed
/// dice-check flow live here; everything per-scene is delegated.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rustc_hash::FxHashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::notifier::Notifier;
use crate::core::resolver::{self, RollOutcome};
use crate::core::scheduler::Scheduler;
use crate::core::stepper::{DialogueStepper, Navigation, StepperError, StepperState};
use crate::core::store::StateStore;
use crate::schema::check::Outcome;
use crate::schema::scenario::{Scenario, ScenarioError};
use crate::schema::scene::{Dialogue, Scene, SceneId};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("step error: {0}")]
    Step(#[from] StepperError),
    #[error("a session is already running")]
    AlreadyStarted,
    #[error("no session has been started")]
    NotStarted,
    #[error("the session is over")]
    SessionOver,
    #[error("a staged transition is still pending")]
    TransitionPending,
    #[error("unknown scene id {0:?}")]
    UnknownScene(SceneId),
}

/// Delays between the staged beats of a dice resolution: the host shows
/// the roll, then the outcome, then play moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTiming {
    /// Roll shown → outcome applied and revealed.
    pub roll_reveal: Duration,
    /// Outcome revealed → follow-up navigation.
    pub outcome_hold: Duration,
}

impl Default for TransitionTiming {
    fn default() -> TransitionTiming {
        TransitionTiming {
            roll_reveal: Duration::from_millis(1500),
            outcome_hold: Duration::from_millis(2000),
        }
    }
}

impl TransitionTiming {
    /// Zero delays: staged beats fire on the next `tick`, which makes
    /// dice flows effectively synchronous.
    pub fn instant() -> TransitionTiming {
        TransitionTiming {
            roll_reveal: Duration::ZERO,
            outcome_hold: Duration::ZERO,
        }
    }
}

/// Position within the running scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub scene_index: usize,
    pub dialogue_index: usize,
}

/// What `make_choice` produced.
#[derive(Debug, Clone)]
pub enum ChoiceOutcome {
    /// A plain choice ran to completion synchronously.
    Taken,
    /// A dice check rolled. The outcome is returned for display; its
    /// moral lands after `roll_reveal` and its navigation after a
    /// further `outcome_hold` of virtual time.
    Rolled {
        roll: RollOutcome,
        outcome: Outcome,
    },
}

/// How a finished run is summarized, by final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndingTier {
    Exemplary,
    Engaged,
    Mixed,
    Distant,
}

impl EndingTier {
    pub fn for_score(score: u32) -> EndingTier {
        if score >= 80 {
            EndingTier::Exemplary
        } else if score >= 60 {
            EndingTier::Engaged
        } else if score >= 40 {
            EndingTier::Mixed
        } else {
            EndingTier::Distant
        }
    }

    /// One-line summary shown at the end of a run.
    pub fn message(&self) -> &'static str {
        match self {
            EndingTier::Exemplary => "An exemplary journey: attentive, patient, and fair.",
            EndingTier::Engaged => "A solid journey, with real moments of connection.",
            EndingTier::Mixed => "A mixed journey; some encounters deserved more care.",
            EndingTier::Distant => "A distant journey; most encounters slipped past.",
        }
    }
}

/// A deferred beat of the dice-check flow.
#[derive(Debug, Clone)]
enum StagedAction {
    /// Apply the resolved outcome's moral.
    RevealOutcome { outcome: Outcome },
    /// Follow the outcome's navigation targets.
    FollowOutcome { outcome: Outcome },
}

/// The session facade. Built via `SessionDirector::builder()`.
pub struct SessionDirector {
    notifier: Notifier,
    store: StateStore,
    stepper: DialogueStepper,
    scheduler: Scheduler<StagedAction>,
    rng: Box<dyn RngCore>,
    timing: TransitionTiming,
    initial_stats: FxHashMap<String, f64>,
    scenario: Option<Scenario>,
    scene_lookup: FxHashMap<SceneId, usize>,
    scene_index: usize,
    session_over: bool,
}

/// Builder for constructing a `SessionDirector`.
pub struct SessionDirectorBuilder {
    seed: u64,
    rng: Option<Box<dyn RngCore>>,
    timing: TransitionTiming,
    initial_stats: FxHashMap<String, f64>,
}

impl SessionDirector {
    pub fn builder() -> SessionDirectorBuilder {
        SessionDirectorBuilder {
            seed: 0,
            rng: None,
            timing: TransitionTiming::default(),
            initial_stats: FxHashMap::default(),
        }
    }

    /// A handle hosts subscribe on. Clones share the registry, so
    /// subscriptions made on it reach every event this session emits.
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Validate a scenario and begin playing it.
    ///
    /// Every start-time problem (no scenes, empty scenes, duplicate or
    /// dangling ids, dice parameters outside 1..=20) is rejected here so
    /// play never trips over them later. Variables are rebuilt from the
    /// builder's and the scenario's initial stats, so nothing from an
    /// earlier run leaks in. Pass a scene id to start somewhere other
    /// than the first scene.
    pub fn start(
        &mut self,
        scenario: Scenario,
        starting_scene: Option<&SceneId>,
    ) -> Result<(), SessionError> {
        if self.scenario.is_some() && !self.session_over {
            return Err(SessionError::AlreadyStarted);
        }
        scenario.validate()?;

        let start_index = match starting_scene {
            Some(id) => scenario
                .scene_position(id)
                .ok_or_else(|| SessionError::UnknownScene(id.clone()))?,
            None => 0,
        };

        self.scheduler.cancel_all();
        self.scene_lookup = scenario
            .scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| (scene.id.clone(), index))
            .collect();
        self.session_over = false;
        self.scene_index = start_index;
        // A fresh run starts from a clean slate: nothing a previous
        // session created carries over.
        let mut opening_stats = self.initial_stats.clone();
        for (name, value) in &scenario.initial_stats {
            opening_stats.insert(name.clone(), *value);
        }
        self.store.reset(&opening_stats);

        debug!("session start: {:?}", scenario.scenes[start_index].id);
        let opening = scenario.scenes[start_index].clone();
        self.scenario = Some(scenario);
        self.stepper.load_scene(opening);
        self.after_step();
        Ok(())
    }

    /// Move past the current line. Guarded while a staged transition is
    /// pending and after the session ends.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        self.guard_active()?;
        self.stepper.advance()?;
        self.after_step();
        Ok(())
    }

    /// Take the choice at `index` on the current line.
    ///
    /// Plain choices apply their effects and navigate before returning.
    /// Dice-check choices roll immediately and return the roll plus the
    /// outcome it selected; the outcome's moral and navigation are
    /// staged on the transition timing and land via `tick`.
    pub fn make_choice(&mut self, index: usize) -> Result<ChoiceOutcome, SessionError> {
        self.guard_active()?;
        if self.stepper.state() != StepperState::AwaitingChoice {
            return Err(StepperError::NotAtChoicePoint.into());
        }
        let choice = self.stepper.choice_at(index)?;

        match choice.dice_check {
            None => {
                let navigation = self.stepper.choose(index, &mut self.store)?;
                self.follow(navigation)?;
                Ok(ChoiceOutcome::Taken)
            }
            Some(check) => {
                let roll = resolver::resolve(&check, &mut self.rng);
                let outcome = roll.branch(&check).clone();
                debug!(
                    "rolled {} against difficulty {}: {}",
                    roll.roll,
                    check.difficulty,
                    if roll.critical {
                        "critical success"
                    } else if roll.success {
                        "success"
                    } else {
                        "failure"
                    }
                );
                // One staged sequence at a time. Both beats carry
                // absolute deadlines, so an oversized tick plays the
                // whole chain out in order.
                self.scheduler.cancel_all();
                self.scheduler.schedule(
                    self.timing.roll_reveal,
                    StagedAction::RevealOutcome {
                        outcome: outcome.clone(),
                    },
                );
                self.scheduler.schedule(
                    self.timing.roll_reveal + self.timing.outcome_hold,
                    StagedAction::FollowOutcome {
                        outcome: outcome.clone(),
                    },
                );
                Ok(ChoiceOutcome::Rolled { roll, outcome })
            }
        }
    }

    /// Advance virtual time. Staged beats whose deadline has passed
    /// fire here, in deadline order.
    pub fn tick(&mut self, elapsed: Duration) {
        for action in self.scheduler.tick(elapsed) {
            self.run_action(action);
        }
    }

    /// Cancel everything staged and drop every subscription. Stats stay
    /// readable for a final score screen.
    pub fn shutdown(&mut self) {
        debug!("session shutdown");
        self.scheduler.cancel_all();
        self.notifier.clear();
        self.stepper.reset();
        self.scenario = None;
        self.scene_lookup.clear();
        self.scene_index = 0;
        self.session_over = false;
    }

    /// True once a scene completed with no next scene to play.
    pub fn is_session_over(&self) -> bool {
        self.session_over
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.stepper.scene()
    }

    /// The line the session is on, while one is showing or awaiting a
    /// choice.
    pub fn current_dialogue(&self) -> Option<&Dialogue> {
        self.stepper.current_dialogue()
    }

    /// Position of the playhead within the scenario.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            scene_index: self.scene_index,
            dialogue_index: self.stepper.dialogue_index(),
        }
    }

    pub fn state(&self) -> StepperState {
        self.stepper.state()
    }

    /// Snapshot of every known variable.
    pub fn stats(&self) -> FxHashMap<String, f64> {
        self.store.snapshot()
    }

    /// Rounded average of every known variable; 0 when none exist.
    pub fn final_score(&self) -> u32 {
        let stats = self.store.snapshot();
        if stats.is_empty() {
            return 0;
        }
        let sum: f64 = stats.values().sum();
        (sum / stats.len() as f64).round() as u32
    }

    /// Tier summary for the run so far.
    pub fn ending(&self) -> EndingTier {
        EndingTier::for_score(self.final_score())
    }

    fn guard_active(&self) -> Result<(), SessionError> {
        if self.scenario.is_none() {
            return Err(SessionError::NotStarted);
        }
        if self.session_over {
            return Err(SessionError::SessionOver);
        }
        if !self.scheduler.is_idle() {
            return Err(SessionError::TransitionPending);
        }
        Ok(())
    }

    fn run_action(&mut self, action: StagedAction) {
        match action {
            StagedAction::RevealOutcome { outcome } => {
                self.stepper.apply_outcome(&outcome, &mut self.store);
            }
            StagedAction::FollowOutcome { outcome } => {
                let followed = self
                    .stepper
                    .navigate_outcome(&outcome)
                    .map_err(SessionError::from)
                    .and_then(|navigation| self.follow(navigation));
                if let Err(error) = followed {
                    warn!("staged navigation failed: {error}");
                }
            }
        }
    }

    fn follow(&mut self, navigation: Navigation) -> Result<(), SessionError> {
        match navigation {
            Navigation::Internal => {
                self.after_step();
                Ok(())
            }
            Navigation::ToScene(id) => self.load_scene_by_id(&id),
        }
    }

    fn load_scene_by_id(&mut self, id: &SceneId) -> Result<(), SessionError> {
        let index = *self
            .scene_lookup
            .get(id)
            .ok_or_else(|| SessionError::UnknownScene(id.clone()))?;
        let scene = match self.scenario {
            Some(ref scenario) => scenario.scenes[index].clone(),
            None => return Err(SessionError::NotStarted),
        };
        self.scene_index = index;
        self.stepper.load_scene(scene);
        self.after_step();
        Ok(())
    }

    /// Completed scenes fall through to the next scene in scenario
    /// order; when none remains, the session is over.
    fn after_step(&mut self) {
        if self.stepper.state() != StepperState::SceneComplete || self.session_over {
            return;
        }
        let next_index = self.scene_index + 1;
        let next = self
            .scenario
            .as_ref()
            .and_then(|s| s.scenes.get(next_index))
            .cloned();
        match next {
            Some(scene) => {
                debug!("falling through to scene {:?}", scene.id);
                self.scene_index = next_index;
                self.stepper.load_scene(scene);
                self.after_step();
            }
            None => {
                debug!("no scene left to play; session over");
                self.session_over = true;
            }
        }
    }
}

impl SessionDirectorBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Provide a generator directly (for testing without seeding).
    pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    pub fn timing(mut self, timing: TransitionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Variable values every session starts from, before any scenario
    /// seeds its own.
    pub fn initial_stats(mut self, stats: FxHashMap<String, f64>) -> Self {
        self.initial_stats = stats;
        self
    }

    pub fn build(self) -> SessionDirector {
        let notifier = Notifier::new();
        let mut store = StateStore::new(notifier.clone());
        // Nothing has subscribed yet, so seeding here stays silent.
        store.seed(&self.initial_stats);
        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(StdRng::seed_from_u64(self.seed)));
        SessionDirector {
            stepper: DialogueStepper::new(notifier.clone()),
            notifier,
            store,
            scheduler: Scheduler::new(),
            rng,
            timing: self.timing,
            initial_stats: self.initial_stats,
            scenario: None,
            scene_lookup: FxHashMap::default(),
            scene_index: 0,
            session_over: false,
        }
    }
}
