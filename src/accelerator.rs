//! The accelerator driver (§4.5): a three-stage external pipeline that turns a
//! net's silent restriction into a list of saturated sequences.
//!
//! 1. net text → PNML, via a net-to-PNML translator reading the native format on
//!    stdin and writing PNML to a temporary file.
//! 2. PNML → acceleration-input, via an XSLT transform.
//! 3. post-process (append auxiliary variables, splice in the `fast()` rendering)
//!    and invoke the acceleration engine, parsing `OK ! <expr>` lines from stderr.
//!
//! Grounded on `original_source/reductron/interfaces/fast.py`'s pipeline shape and
//! `smpt.rs`'s subprocess-driving style (spawn, write stdin fully, wait, check exit
//! code).

use std::io::Write;
use std::process::{Command, Stdio};

use regex::Regex;
use tempfile::NamedTempFile;

use crate::deterministic_map::{HashMap, hashmap_new};
use crate::error::{Error, Result};
use crate::petri::PetriNet;
use crate::presburger::Presburger;
use crate::sequence::Sequence;
use crate::trace::Trace;

/// Executable names on `PATH`. A single override point, per SPEC_FULL.md §10.3.
pub struct ToolNames {
    pub net_to_pnml: String,
    pub xslt_processor: String,
    pub acceleration_engine: String,
    pub stylesheet: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        ToolNames {
            net_to_pnml: "ndrio".to_string(),
            xslt_processor: "xsltproc".to_string(),
            acceleration_engine: "fast".to_string(),
            stylesheet: "pnml2fast.xsl".to_string(),
        }
    }
}

/// Drive the three-stage pipeline for `net`'s silent restriction, constrained by
/// `constraint`. Returns the saturated sequences the accelerator reports.
///
/// `debug` echoes every line of the accelerator's standard error as it is parsed,
/// and `trace` records those lines for the end-of-run transcript dump (§10.1).
///
/// Idempotence shortcut (§8): a net with no silent transitions never touches the
/// pipeline and returns an empty list.
pub fn accelerate(
    net: &PetriNet,
    constraint: &Presburger,
    tools: &ToolNames,
    debug: bool,
    trace: &mut Trace,
) -> Result<Vec<Sequence>> {
    let restriction = net.silent_restriction();
    if restriction.transitions.is_empty() {
        return Ok(Vec::new());
    }

    let pnml = run_net_to_pnml(&restriction, tools)?;
    let accel_input = run_xslt(&pnml, tools)?;
    let post_processed = post_process(&accel_input, &restriction, constraint);
    let stderr = run_acceleration_engine(&post_processed, tools)?;

    for line in stderr.lines() {
        if debug {
            eprintln!("[accelerator] {line}");
        }
        trace.accelerator_stderr(line);
    }

    parse_sequences(&stderr, &restriction)
}

fn run_net_to_pnml(net: &PetriNet, tools: &ToolNames) -> Result<String> {
    let pnml_file = NamedTempFile::new().map_err(|e| Error::ExternalTool(format!("cannot create temp file: {e}")))?;
    let mut child = Command::new(&tools.net_to_pnml)
        .arg(pnml_file.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::ExternalTool(format!("cannot spawn {}: {e}", tools.net_to_pnml)))?;

    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(net.to_net_text().as_bytes())
        .map_err(|e| Error::ExternalTool(format!("write to {} failed: {e}", tools.net_to_pnml)))?;

    let status = child
        .wait()
        .map_err(|e| Error::ExternalTool(format!("{} did not exit cleanly: {e}", tools.net_to_pnml)))?;
    if !status.success() {
        return Err(Error::ExternalTool(format!("{} exited with {status}", tools.net_to_pnml)));
    }

    std::fs::read_to_string(pnml_file.path())
        .map_err(|e| Error::ExternalTool(format!("cannot read PNML output: {e}")))
}

fn run_xslt(pnml: &str, tools: &ToolNames) -> Result<String> {
    let mut pnml_file =
        NamedTempFile::new().map_err(|e| Error::ExternalTool(format!("cannot create temp file: {e}")))?;
    pnml_file
        .write_all(pnml.as_bytes())
        .map_err(|e| Error::ExternalTool(format!("cannot write PNML scratch file: {e}")))?;

    let output = Command::new(&tools.xslt_processor)
        .arg(&tools.stylesheet)
        .arg(pnml_file.path())
        .output()
        .map_err(|e| Error::ExternalTool(format!("cannot spawn {}: {e}", tools.xslt_processor)))?;
    if !output.status.success() {
        return Err(Error::ExternalTool(format!("{} exited with {}", tools.xslt_processor, output.status)));
    }

    String::from_utf8(output.stdout).map_err(|e| Error::ExternalTool(format!("non-UTF8 XSLT output: {e}")))
}

/// Append the `K_<place>` solve-for constants the `fast()` rendering references
/// to the variable declaration line, and replace `Region init` with that
/// rendering conjoined with the marking-state marker (§4.5 step 3).
fn post_process(accel_input: &str, net: &PetriNet, constraint: &Presburger) -> String {
    let mut lines: Vec<String> = accel_input.lines().map(|l| l.to_string()).collect();

    for line in lines.iter_mut() {
        if line.trim_start().starts_with("Var") {
            let insert_at = line.rfind(';').unwrap_or(line.len());
            let mut suffix = String::new();
            for place in &net.places {
                suffix.push_str(", K_");
                suffix.push_str(place);
            }
            line.insert_str(insert_at, &suffix);
        }
    }

    let init_rendering = format!("{{{} && state=marking}}", constraint.fast());
    for line in lines.iter_mut() {
        if line.trim_start().starts_with("Region init") {
            *line = format!(" Region init := {init_rendering};");
        }
    }

    lines.join("\n")
}

fn run_acceleration_engine(input: &str, tools: &ToolNames) -> Result<String> {
    let mut input_file =
        NamedTempFile::new().map_err(|e| Error::ExternalTool(format!("cannot create temp file: {e}")))?;
    input_file
        .write_all(input.as_bytes())
        .map_err(|e| Error::ExternalTool(format!("cannot write accelerator input: {e}")))?;

    let output = Command::new(&tools.acceleration_engine)
        .env("FAST_DEFAULT_ENGINE", "prestaf")
        .arg(input_file.path())
        .output()
        .map_err(|e| Error::ExternalTool(format!("cannot spawn {}: {e}", tools.acceleration_engine)))?;
    if !output.status.success() {
        return Err(Error::ExternalTool(format!(
            "{} exited with {}",
            tools.acceleration_engine, output.status
        )));
    }

    String::from_utf8(output.stderr).map_err(|e| Error::ExternalTool(format!("non-UTF8 accelerator output: {e}")))
}

/// Parse `OK ! <expr>` lines, where `<expr>` sums `.`-joined transition ids,
/// each summand optionally wrapped in `(`/`)` by the accelerator (stripped
/// before lookup, `fast.py:108`) (§4.5). Each `OK` line allocates one fresh
/// saturation variable shared by every summand on that line; each summand
/// becomes its own `Sequence`.
fn parse_sequences(stderr: &str, net: &PetriNet) -> Result<Vec<Sequence>> {
    lazy_static::lazy_static! {
        static ref OK_LINE: Regex = Regex::new(r"^OK\s*!\s*(.+)$").unwrap();
    }

    let mut sequences = Vec::new();
    let mut counter = 0usize;
    let mut seen_any = false;

    for line in stderr.lines() {
        let line = line.trim();
        let Some(caps) = OK_LINE.captures(line) else { continue };
        seen_any = true;
        let expr = caps.get(1).unwrap().as_str();
        let saturation_var = format!("s{counter}");
        counter += 1;

        for summand in expr.split('+') {
            let summand = summand.trim().replace(['(', ')'], "");
            if summand.is_empty() {
                continue;
            }
            let mut transitions = Vec::new();
            for id in summand.split('.') {
                let id = id.trim();
                let tr = net
                    .transition(id)
                    .ok_or_else(|| Error::AcceleratorOutput(format!("unknown transition id {id:?}")))?;
                transitions.push(tr.clone());
            }
            sequences.push(Sequence::new(net.id.clone(), saturation_var.clone(), transitions));
        }
    }

    if !seen_any {
        return Err(Error::AcceleratorOutput("accelerator produced no OK marker".to_string()));
    }

    Ok(sequences)
}

#[allow(dead_code)]
fn summary(sequences: &[Sequence]) -> HashMap<String, usize> {
    let mut counts = hashmap_new();
    for s in sequences {
        *counts.entry(s.net_id.clone()).or_insert(0) += 1;
    }
    counts
}
