use std::env;
use std::fs;
use std::process;
use std::time::Duration;

use brp_solver::{solve, Instance};

const DEFAULT_BUDGET_SECS: u64 = 60;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("usage: {} <instance-file> [time-budget-seconds]", args[0]);
        process::exit(2);
    }

    let text = match fs::read_to_string(&args[1]) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("{}: {err}", args[1]);
            process::exit(2);
        }
    };
    let inst: Instance = match text.parse() {
        Ok(inst) => inst,
        Err(err) => {
            eprintln!("{}: {err}", args[1]);
            process::exit(2);
        }
    };

    let budget = match args.get(2) {
        Some(arg) => match arg.parse::<f64>() {
            Ok(secs) if secs > 0.0 => Duration::from_secs_f64(secs),
            _ => {
                eprintln!("bad time budget '{arg}'");
                process::exit(2);
            }
        },
        None => Duration::from_secs(DEFAULT_BUDGET_SECS),
    };

    match solve(&inst, budget) {
        Some(report) => print!("{report}"),
        None => {
            println!("no solution: the bay cannot be emptied within its layout");
            process::exit(1);
        }
    }
}
