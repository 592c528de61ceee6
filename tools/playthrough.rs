/// Playthrough — drive a scenario from the terminal.
///
/// Usage: playthrough <scenario.json> [--seed <n>] [--choices <i,j,...>] [--start <scene-id>]
///
/// Without --choices the tool is interactive: press Enter to advance,
/// type a choice number at choice points, 'q' to stop. With --choices
/// the listed picks (1-based, in order) play the session unattended.
/// Dice outcomes resolve immediately; reveal delays are not simulated.

use scenario_runtime::core::director::{ChoiceOutcome, SessionDirector, TransitionTiming};
use scenario_runtime::core::event::{EventKind, RuntimeEvent};
use scenario_runtime::core::stepper::StepperState;
use scenario_runtime::schema::scenario::Scenario;
use scenario_runtime::schema::scene::SceneId;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use std::time::Duration;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        process::exit(if args.len() < 2 { 2 } else { 0 });
    }

    let scenario_file = &args[1];
    let mut seed: u64 = 42;
    let mut script: Option<Vec<usize>> = None;
    let mut start_scene: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--choices" if i + 1 < args.len() => {
                i += 1;
                match parse_script(&args[i]) {
                    Some(picks) => script = Some(picks),
                    None => {
                        eprintln!("ERROR: invalid --choices list: {}", args[i]);
                        process::exit(2);
                    }
                }
            }
            "--start" if i + 1 < args.len() => {
                i += 1;
                start_scene = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(2);
            }
        }
        i += 1;
    }

    let scenario = match Scenario::load_from_json(Path::new(scenario_file)) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("ERROR: failed to load {}: {}", scenario_file, e);
            process::exit(2);
        }
    };

    println!("Playing: {}", scenario.title);
    println!("Seed: {}\n", seed);

    let mut director = SessionDirector::builder()
        .seed(seed)
        .timing(TransitionTiming::instant())
        .build();
    subscribe_printers(&director);

    let start_id = start_scene.map(SceneId);
    if let Err(e) = director.start(scenario, start_id.as_ref()) {
        eprintln!("ERROR: cannot start session: {}", e);
        process::exit(1);
    }

    let interactive = script.is_none();
    let mut script = script.unwrap_or_default().into_iter();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if director.is_session_over() {
            break;
        }
        match director.state() {
            StepperState::ShowingDialogue => {
                if interactive {
                    print!("> ");
                    stdout.flush().ok();
                    let mut line = String::new();
                    if stdin.lock().read_line(&mut line).is_err() || line.trim() == "q" {
                        println!("Stopped.");
                        return;
                    }
                }
                if let Err(e) = director.advance() {
                    eprintln!("ERROR: {}", e);
                    process::exit(1);
                }
            }
            StepperState::AwaitingChoice => {
                let options = current_choice_texts(&director);
                for (n, text) in options.iter().enumerate() {
                    println!("  {}) {}", n + 1, text);
                }

                let picked = if interactive {
                    print!("choice> ");
                    stdout.flush().ok();
                    let mut line = String::new();
                    if stdin.lock().read_line(&mut line).is_err() || line.trim() == "q" {
                        println!("Stopped.");
                        return;
                    }
                    match line.trim().parse::<usize>() {
                        Ok(n) if (1..=options.len()).contains(&n) => n - 1,
                        _ => {
                            println!("Pick a number between 1 and {}.", options.len());
                            continue;
                        }
                    }
                } else {
                    match script.next() {
                        Some(n) if (1..=options.len()).contains(&n) => n - 1,
                        Some(n) => {
                            eprintln!(
                                "ERROR: scripted choice {} is out of range (1..={})",
                                n,
                                options.len()
                            );
                            process::exit(1);
                        }
                        None => {
                            println!("(script exhausted; taking choice 1)");
                            0
                        }
                    }
                };

                match director.make_choice(picked) {
                    Ok(ChoiceOutcome::Taken) => {}
                    Ok(ChoiceOutcome::Rolled { roll, outcome }) => {
                        let verdict = if roll.critical {
                            "critical success"
                        } else if roll.success {
                            "success"
                        } else {
                            "failure"
                        };
                        println!("  (d20 rolled {}: {})", roll.roll, verdict);
                        println!("  {}", outcome.message);
                        director.tick(Duration::ZERO);
                    }
                    Err(e) => {
                        eprintln!("ERROR: {}", e);
                        process::exit(1);
                    }
                }
            }
            _ => break,
        }
    }

    println!("\n=== Session over ===");
    println!("Final score: {}", director.final_score());
    println!("{}", director.ending().message());
}

fn print_usage() {
    println!("Playthrough — drive a scenario from the terminal.");
    println!();
    println!("Usage: playthrough <scenario.json> [--seed <n>] [--choices <i,j,...>] [--start <scene-id>]");
    println!();
    println!("  --seed <n>          RNG seed for dice checks (default: 42)");
    println!("  --choices <i,j,..>  Play unattended with these picks (1-based)");
    println!("  --start <scene-id>  Begin at the named scene");
}

fn parse_script(list: &str) -> Option<Vec<usize>> {
    list.split(',')
        .map(|part| part.trim().parse::<usize>().ok())
        .collect()
}

fn current_choice_texts(director: &SessionDirector) -> Vec<String> {
    match director.current_dialogue() {
        Some(dialogue) => dialogue.choices.iter().map(|c| c.text.clone()).collect(),
        None => Vec::new(),
    }
}

fn subscribe_printers(director: &SessionDirector) {
    let notifier = director.notifier();
    notifier.on(EventKind::DialogueShow, |event| {
        if let RuntimeEvent::DialogueShow { dialogue, mood, .. } = event {
            println!("{} ({}): {}", dialogue.speaker, mood, dialogue.text);
        }
    });
    notifier.on(EventKind::SceneComplete, |event| {
        if let RuntimeEvent::SceneComplete { scene_id } = event {
            println!("-- scene complete: {}", scene_id.0);
        }
    });
    notifier.on(EventKind::VariablesDelta, |event| {
        if let RuntimeEvent::VariablesDelta { deltas } = event {
            for delta in deltas {
                println!("  [{} {:+}]", delta.variable, delta.delta);
            }
        }
    });
}
