/// Interview example — plays the bundled scenario beat by beat.
///
/// A mini session: a broken lift → finding another way in → a d20
/// check on a heavy gate → the interview itself.
///
/// Run with: cargo run --example interview

use scenario_runtime::core::director::{ChoiceOutcome, SessionDirector};
use scenario_runtime::core::event::{EventKind, RuntimeEvent};
use scenario_runtime::schema::scenario::Scenario;
use std::time::Duration;

fn main() {
    // --- Load the bundled scenario ---
    let scenario = Scenario::load_from_json(std::path::Path::new("demos/data/interview.json"))
        .expect("Failed to load interview scenario");

    println!("========================================");
    println!("   {}", scenario.title.to_uppercase());
    println!("   Une visite en {} scènes", scenario.scenes.len());
    println!("========================================");
    println!();

    // --- Build a session and subscribe to what it announces ---
    let mut director = SessionDirector::builder().seed(2026).build();
    let notifier = director.notifier();

    notifier.on(EventKind::DialogueShow, |event| {
        if let RuntimeEvent::DialogueShow { dialogue, mood, .. } = event {
            println!("{} ({}): {}", dialogue.speaker, mood, dialogue.text);
        }
    });
    notifier.on(EventKind::VariablesDelta, |event| {
        if let RuntimeEvent::VariablesDelta { deltas } = event {
            for delta in deltas {
                println!("    [{} {:+}]", delta.variable, delta.delta);
            }
        }
    });
    notifier.on(EventKind::SceneComplete, |event| {
        if let RuntimeEvent::SceneComplete { scene_id } = event {
            println!("--- fin de scène : {} ---", scene_id.0);
            println!();
        }
    });

    director
        .start(scenario, None)
        .expect("Failed to start session");

    // --- Scene 1: the hall. Help Inès find another way in. ---
    director.advance().expect("advance to the question");
    take(&mut director, 0, "On cherche un autre accès ensemble.");

    // --- Scene 2: the service ramp, and a d20 check on the gate ---
    // The gate line opens at its choice point, so the check is next.
    take(&mut director, 0, "J'essaie de l'ouvrir.");

    // --- Scene 3: the interview proper ---
    director.advance().expect("advance to the question");
    take(&mut director, 0, "Parce que la ville appartient à tout le monde.");
    director.advance().expect("finish the interview");
    assert!(director.is_session_over());

    // --- Epilogue ---
    println!("========================================");
    let mut stats: Vec<(String, f64)> = director.stats().into_iter().collect();
    stats.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in &stats {
        println!("   {}: {}", name, value);
    }
    println!("   Score final : {}", director.final_score());
    println!("   {}", director.ending().message());
    println!("========================================");
}

/// Take one choice, playing out the staged dice flow when one rolls.
fn take(director: &mut SessionDirector, index: usize, label: &str) {
    println!("  > {}", label);
    match director.make_choice(index).expect("choice accepted") {
        ChoiceOutcome::Taken => {}
        ChoiceOutcome::Rolled { roll, outcome } => {
            let verdict = if roll.critical {
                "réussite critique"
            } else if roll.success {
                "réussite"
            } else {
                "échec"
            };
            println!("  (d20 : {} — {})", roll.roll, verdict);
            println!("  {}", outcome.message);
            // The reveal lands after 1.5s, the follow-up 2s later.
            director.tick(Duration::from_millis(1500));
            director.tick(Duration::from_millis(2000));
        }
    }
}
