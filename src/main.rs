#![allow(dead_code)]

mod accelerator;
mod deterministic_map;
mod error;
mod obligations;
mod parser;
mod petri;
mod polyhedron;
mod presburger;
#[cfg(test)]
mod scenarios;
mod sequence;
mod smt;
mod smtlib;
mod trace;
mod utils;

use std::process;
use std::sync::Mutex;
use std::time::Instant;

use colored::*;
use lazy_static::lazy_static;

use accelerator::ToolNames;
use deterministic_map::hashset_new;
use error::{Error, Result};
use obligations::{Composer, Side};
use parser::ParsedNet;
use petri::PetriNet;
use presburger::Presburger;
use smt::SmtDriver;
use trace::Trace;

lazy_static! {
    static ref VERBOSE: Mutex<bool> = Mutex::new(false);
}

fn set_verbose(v: bool) {
    *VERBOSE.lock().unwrap() = v;
}

fn verbose() -> bool {
    *VERBOSE.lock().unwrap()
}

macro_rules! log_info {
    ($($arg:tt)*) => {
        if verbose() { println!($($arg)*); }
    };
}

fn print_usage() {
    println!("{}", "Usage: polyabs -i <initial.net> -r <reduced.net> [options]".bold());
    println!("{}", "Options:".bold());
    println!("  {}   path to the initial Petri net (required)", "-i <file>".green());
    println!("  {}   path to the reduced Petri net (required)", "-r <file>".green());
    println!("  {}          print the SMT-LIB input/output", "--debug".green());
    println!("  {}        increase output verbosity", "--verbose".green());
    println!("  {}        show the execution time", "--show-time".green());
    println!("  {}        print the version number and exit", "--version".green());
}

struct Args {
    initial: String,
    reduced: String,
    debug: bool,
    verbose: bool,
    show_time: bool,
}

fn parse_args() -> std::result::Result<Args, String> {
    let raw: Vec<String> = std::env::args().collect();

    let mut initial = None;
    let mut reduced = None;
    let mut debug = false;
    let mut verbose = false;
    let mut show_time = false;

    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--version" => {
                println!("polyabs {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "-i" => {
                i += 1;
                initial = Some(raw.get(i).ok_or("-i requires a file path")?.clone());
            }
            "-r" => {
                i += 1;
                reduced = Some(raw.get(i).ok_or("-r requires a file path")?.clone());
            }
            "--debug" => debug = true,
            "--verbose" => verbose = true,
            "--show-time" => show_time = true,
            other => return Err(format!("unrecognized argument {other:?}")),
        }
        i += 1;
    }

    Ok(Args {
        initial: initial.ok_or("-i <initial net> is required")?,
        reduced: reduced.ok_or("-r <reduced net> is required")?,
        debug,
        verbose,
        show_time,
    })
}

fn load_net(path: &str) -> Result<ParsedNet> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::InputParse(format!("cannot read {path}: {e}")))?;
    parser::parse_net_file(&text)
}

fn run(args: &Args, trace: &mut Trace) -> Result<()> {
    let n1_parsed = load_net(&args.initial)?;
    let n2_parsed = load_net(&args.reduced)?;

    log_info!("N1:\n---\n{}", n1_parsed.net.to_net_text());
    log_info!("N2:\n---\n{}", n2_parsed.net.to_net_text());

    let n1_places = place_set(&n1_parsed.net);
    let n2_places = place_set(&n2_parsed.net);

    let c1 = Presburger::parse(n1_parsed.constraint_or_tautology(), &n1_places)?;
    let c2 = Presburger::parse(n2_parsed.constraint_or_tautology(), &n2_places)?;
    log_info!("C1:\n---\n{}\n", c1.render(None));
    log_info!("C2:\n---\n{}\n", c2.render(None));

    let e_text = n2_parsed
        .e_relation_text
        .as_deref()
        .ok_or_else(|| Error::InputParse("reduced net file has no E-relation marker".to_string()))?;
    let e = polyhedron::Polyhedron::parse(e_text, &n1_places, &n2_places)?;
    log_info!("E:\n--\n{}\n", e.render(None, None, None));

    let tools = ToolNames::default();
    let seq1 = accelerator::accelerate(&n1_parsed.net, &c1, &tools, args.debug, trace)?;
    let seq2 = accelerator::accelerate(&n2_parsed.net, &c2, &tools, args.debug, trace)?;
    log_info!("tau1*: {} saturated sequence(s)", seq1.len());
    log_info!("tau2*: {} saturated sequence(s)", seq2.len());

    let mut solver = SmtDriver::spawn("z3", None, args.debug)?;

    let composer = Composer {
        n1: Side { net: &n1_parsed.net, coherency: &c1, sequences: &seq1 },
        n2: Side { net: &n2_parsed.net, coherency: &c2, sequences: &seq2 },
        e: &e,
    };

    println!("> Check that (N2, C2) is a strong E-abstraction of (N1, C1):");
    run_direction(&composer, false, &mut solver, trace)?;

    println!();

    println!("> Check that (N1, C1) is a strong E-abstraction of (N2, C2):");
    run_direction(&composer, true, &mut solver, trace)?;

    solver.shutdown();
    Ok(())
}

fn run_direction(composer: &Composer, on_reduced: bool, solver: &mut SmtDriver, trace: &mut Trace) -> Result<()> {
    for obligation in composer.direction_obligations(on_reduced) {
        trace.smt_in(&obligation.formula);
        let verdict = solver.check_sat(&obligation.formula)?;
        trace.smt_out(verdict.to_string());
        trace.obligation(&obligation.label, verdict);
        let colored_verdict = match verdict {
            smt::Verdict::Sat => verdict.to_string().green(),
            smt::Verdict::Unsat => verdict.to_string().yellow(),
        };
        println!("{}: {}", obligation.label.bold(), colored_verdict);
    }
    Ok(())
}

fn place_set(net: &PetriNet) -> deterministic_map::HashSet<String> {
    let mut set = hashset_new();
    for p in &net.places {
        set.insert(p.clone());
    }
    set
}

fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}: {msg}", "Error".red().bold());
            print_usage();
            process::exit(1);
        }
    };

    set_verbose(args.verbose);
    let start = Instant::now();
    let mut trace = Trace::new();

    let outcome = run(&args, &mut trace);

    if args.debug {
        dump_trace(&trace);
    }

    if let Err(e) = outcome {
        eprintln!("{}: {e}", "Error".red().bold());
        process::exit(1);
    }

    if args.show_time {
        println!("Elapsed: {:.3}s", start.elapsed().as_secs_f64());
    }
}

/// Structured post-mortem dump of the `--debug` transcript (§10.1, §10.4). Written
/// to a fixed file name next to the working directory; failure to write it is not
/// fatal, since the live `eprintln!` echoing already surfaced everything.
fn dump_trace(trace: &Trace) {
    match trace.to_json() {
        Ok(json) => {
            if let Err(e) = std::fs::write("polyabs_debug_trace.json", json) {
                eprintln!("{}: could not write debug trace: {e}", "Warning".yellow().bold());
            }
        }
        Err(e) => eprintln!("{}: could not serialize debug trace: {e}", "Warning".yellow().bold()),
    }
}
