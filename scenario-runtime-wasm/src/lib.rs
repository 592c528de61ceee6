//! WASM bindings for scenario-runtime — powers the in-browser player.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;

use scenario_runtime::core::director::{ChoiceOutcome, SessionDirector};
use scenario_runtime::core::event::{EventKind, RuntimeEvent};
use scenario_runtime::core::notifier::Notifier;
use scenario_runtime::core::stepper::StepperState;
use scenario_runtime::schema::scenario::Scenario;
use scenario_runtime::schema::scene::Dialogue;
use scenario_runtime::schema::stats::StatDelta;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
#[serde(tag = "type")]
enum EventRecord {
    #[serde(rename = "dialogue:show", rename_all = "camelCase")]
    DialogueShow {
        scene_id: String,
        dialogue: Dialogue,
        mood: String,
    },
    #[serde(rename = "scene:complete", rename_all = "camelCase")]
    SceneComplete { scene_id: String },
    #[serde(rename = "variables:updated")]
    VariablesUpdated { stats: HashMap<String, f64> },
    #[serde(rename = "variables:delta")]
    VariablesDelta { deltas: Vec<StatDelta> },
}

#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ChoiceResult {
    Taken,
    Rolled {
        roll: u8,
        success: bool,
        critical: bool,
        message: String,
    },
}

fn record(event: &RuntimeEvent) -> EventRecord {
    match event {
        RuntimeEvent::DialogueShow {
            scene_id,
            dialogue,
            mood,
        } => EventRecord::DialogueShow {
            scene_id: scene_id.0.clone(),
            dialogue: dialogue.clone(),
            mood: mood.clone(),
        },
        RuntimeEvent::SceneComplete { scene_id } => EventRecord::SceneComplete {
            scene_id: scene_id.0.clone(),
        },
        RuntimeEvent::VariablesUpdated { stats } => EventRecord::VariablesUpdated {
            stats: stats.clone().into_iter().collect(),
        },
        RuntimeEvent::VariablesDelta { deltas } => EventRecord::VariablesDelta {
            deltas: deltas.clone(),
        },
    }
}

fn subscribe_queue(notifier: &Notifier, queue: &Rc<RefCell<Vec<EventRecord>>>) {
    for kind in [
        EventKind::DialogueShow,
        EventKind::SceneComplete,
        EventKind::VariablesUpdated,
        EventKind::VariablesDelta,
    ] {
        let sink = Rc::clone(queue);
        notifier.on(kind, move |event| sink.borrow_mut().push(record(event)));
    }
}

fn state_label(state: StepperState) -> &'static str {
    match state {
        StepperState::Idle => "idle",
        StepperState::ShowingDialogue => "showingDialogue",
        StepperState::AwaitingChoice => "awaitingChoice",
        StepperState::SceneComplete => "sceneComplete",
    }
}

// ---------------------------------------------------------------------------
// SessionHandle — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct SessionHandle {
    director: SessionDirector,
    queue: Rc<RefCell<Vec<EventRecord>>>,
}

#[wasm_bindgen]
impl SessionHandle {
    /// Parse a scenario export and start playing it. Everything the
    /// session announces queues up for `drain_events`.
    #[wasm_bindgen(constructor)]
    pub fn new(scenario_json: &str, seed: u64) -> Result<SessionHandle, JsError> {
        let scenario = Scenario::parse_json(scenario_json)
            .map_err(|e| JsError::new(&format!("Invalid scenario JSON: {e}")))?;

        let mut director = SessionDirector::builder().seed(seed).build();
        let queue: Rc<RefCell<Vec<EventRecord>>> = Rc::new(RefCell::new(Vec::new()));
        subscribe_queue(&director.notifier(), &queue);

        director
            .start(scenario, None)
            .map_err(|e| JsError::new(&format!("Cannot start session: {e}")))?;

        Ok(SessionHandle { director, queue })
    }

    /// Return the queued events as a JSON array and clear the queue.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        let drained = std::mem::take(&mut *self.queue.borrow_mut());
        serde_json::to_string(&drained)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Move past the current line.
    pub fn advance(&mut self) -> Result<(), JsError> {
        self.director
            .advance()
            .map_err(|e| JsError::new(&format!("Cannot advance: {e}")))
    }

    /// Take the choice at `index` (0-based). Returns a JSON object:
    /// `{"type":"taken"}` for plain choices, or the roll details for
    /// dice checks whose outcome lands through `tick`.
    pub fn make_choice(&mut self, index: usize) -> Result<String, JsError> {
        let result = self
            .director
            .make_choice(index)
            .map_err(|e| JsError::new(&format!("Cannot choose: {e}")))?;
        let result = match result {
            ChoiceOutcome::Taken => ChoiceResult::Taken,
            ChoiceOutcome::Rolled { roll, outcome } => ChoiceResult::Rolled {
                roll: roll.roll,
                success: roll.success,
                critical: roll.critical,
                message: outcome.message,
            },
        };
        serde_json::to_string(&result)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Advance virtual time by `millis`. Call this from the host's
    /// frame loop so staged dice outcomes land on schedule.
    pub fn tick(&mut self, millis: u32) {
        self.director.tick(Duration::from_millis(u64::from(millis)));
    }

    /// Current stepper state: "idle", "showingDialogue",
    /// "awaitingChoice", or "sceneComplete".
    pub fn state(&self) -> String {
        state_label(self.director.state()).to_string()
    }

    pub fn is_session_over(&self) -> bool {
        self.director.is_session_over()
    }

    /// JSON object of every known variable and its current value.
    pub fn stats(&self) -> Result<String, JsError> {
        let stats: HashMap<String, f64> = self.director.stats().into_iter().collect();
        serde_json::to_string(&stats)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    pub fn final_score(&self) -> u32 {
        self.director.final_score()
    }

    /// One-line summary for the final screen.
    pub fn ending_message(&self) -> String {
        self.director.ending().message().to_string()
    }

    /// Stop the session: staged outcomes are dropped and the event
    /// queue stops filling. Stats stay readable.
    pub fn shutdown(&mut self) {
        self.director.shutdown();
    }

    /// Start over with a new scenario and seed (same handle).
    pub fn reset(&mut self, scenario_json: &str, seed: u64) -> Result<(), JsError> {
        let fresh = SessionHandle::new(scenario_json, seed)?;
        self.director = fresh.director;
        self.queue = fresh.queue;
        Ok(())
    }
}
