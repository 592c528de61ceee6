/// Scenario Linter — validates authored scenarios before they ship.
///
/// Usage: scenario_linter <scenario.json> [<scenario.json>...]

use scenario_runtime::schema::scenario::Scenario;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        print_usage();
        process::exit(0);
    }
    if args.len() < 2 {
        print_usage();
        process::exit(2);
    }

    let mut total_problems = 0usize;
    let mut unreadable = 0usize;

    for file in &args[1..] {
        let scenario = match Scenario::load_from_json(Path::new(file)) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("ERROR: failed to load {}: {}", file, e);
                unreadable += 1;
                continue;
            }
        };

        let problems = scenario.lint();
        let dialogue_count: usize = scenario.scenes.iter().map(|s| s.dialogues.len()).sum();
        println!(
            "{}: {} scene(s), {} dialogue(s)",
            file,
            scenario.scenes.len(),
            dialogue_count
        );
        for problem in &problems {
            println!("  ERROR: {}", problem);
        }
        total_problems += problems.len();
    }

    println!("\n=== Scenario Lint Report ===\n");
    if total_problems == 0 && unreadable == 0 {
        println!("All checks passed!");
    }
    println!(
        "Summary: {} problem(s), {} file(s) unreadable",
        total_problems, unreadable
    );

    if unreadable > 0 {
        process::exit(2);
    }
    if total_problems > 0 {
        process::exit(1);
    }
}

fn print_usage() {
    println!("Scenario Linter — validates authored scenarios before they ship.");
    println!();
    println!("Usage: scenario_linter <scenario.json> [<scenario.json>...]");
    println!();
    println!("Checks every scenario for empty scenes, duplicate ids, dangling");
    println!("navigation targets, and dice parameters outside 1..=20.");
    println!();
    println!("Exit codes: 0 clean, 1 problems found, 2 usage or unreadable file.");
}
