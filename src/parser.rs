//! The `.net` file parser (§6): a line-oriented reader that dispatches on the first
//! whitespace-separated token (`net`, `pl`, `tr`), builds a [`PetriNet`], and lifts out
//! the `# Constraint:` and `# E:` marker lines verbatim for the Presburger/Polyhedron
//! parsers downstream.
//!
//! Grounded on `original_source/reductron/ptio/ptnet.py`'s `parse_net`/`parse_transition`/
//! `parse_arc`/`parse_place`/`parse_value` for the line grammar (arc `*weight` syntax,
//! K/M/G/T/P/E multiplier suffixes, `tau`/positive-integer labels) and
//! `original_source/reductron/ptio/presburger.py`'s `parse_coherency_constraint` (first
//! `# Constraint:`-bearing line wins, absence means the constant `T`). The module
//! shape (a dedicated file owning tokenizing plus a small per-construct parse
//! function) is generalized from `examples/julesjacobs-ser/src/parser.rs`'s toy
//! imperative language to this format's line grammar.
//!
//! The reduced net's E-relation line has no counterpart in the filtered reference
//! source (the original's polyhedron-file reader was not part of the retrieved
//! original_source/ pack); it is stored in the same convention as the constraint
//! marker, i.e. a `# E:` line.

use crate::error::{Error, Result};
use crate::petri::{Label, PetriNet};
use crate::utils::string::sanitize_identifier;

const CONSTRAINT_MARKER: &str = "# Constraint:";
const E_RELATION_MARKER: &str = "# E:";

/// A parsed `.net` file: the net itself, plus the raw (unparsed) constraint and
/// E-relation texts, each handed to [`crate::presburger::Presburger::parse`] /
/// [`crate::polyhedron::Polyhedron::parse`] once both nets are known.
pub struct ParsedNet {
    pub net: PetriNet,
    pub constraint_text: Option<String>,
    pub e_relation_text: Option<String>,
}

impl ParsedNet {
    /// The constraint text, defaulting to the tautology `T` when no `# Constraint:`
    /// line is present (§8 scenario 4).
    pub fn constraint_or_tautology(&self) -> &str {
        self.constraint_text.as_deref().unwrap_or("T")
    }
}

pub fn parse_net_file(text: &str) -> Result<ParsedNet> {
    let mut net = PetriNet::new("");
    let mut constraint_text = None;
    let mut e_relation_text = None;

    for raw_line in text.lines() {
        if constraint_text.is_none() {
            if let Some(pos) = raw_line.find(CONSTRAINT_MARKER) {
                constraint_text = Some(raw_line[pos + CONSTRAINT_MARKER.len()..].trim().to_string());
                continue;
            }
        }
        if e_relation_text.is_none() {
            if let Some(pos) = raw_line.find(E_RELATION_MARKER) {
                e_relation_text = Some(raw_line[pos + E_RELATION_MARKER.len()..].trim().to_string());
                continue;
            }
        }

        // '{', '}', '#', ',' are forbidden in SMT-LIB identifiers and in this tool's own
        // convention (§6); rewrite them before splitting on whitespace, the same way
        // ptnet.py's parse_net drops braces and turns '#'/',' into '.' ahead of
        // tokenizing a line.
        let sanitized = sanitize_identifier(raw_line.trim());
        let mut tokens: Vec<&str> = sanitized.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let head = tokens.remove(0);

        match head {
            "net" => {
                if let Some(&id) = tokens.first() {
                    net.id = id.to_string();
                }
            }
            "pl" => parse_place(&mut net, &tokens)?,
            "tr" => parse_transition(&mut net, &tokens)?,
            _ => {}
        }
    }

    Ok(ParsedNet { net, constraint_text, e_relation_text })
}

fn parse_place(net: &mut PetriNet, tokens: &[&str]) -> Result<()> {
    let id = tokens
        .first()
        .ok_or_else(|| Error::InputParse("place line missing an identifier".to_string()))?;
    net.add_place(id);
    Ok(())
}

fn parse_transition(net: &mut PetriNet, tokens: &[&str]) -> Result<()> {
    let mut tokens: Vec<&str> = tokens.to_vec();
    if tokens.is_empty() {
        return Err(Error::InputParse("transition line missing an identifier".to_string()));
    }
    let id = tokens.remove(0).to_string();

    if tokens.first().copied() != Some(":") {
        return Err(Error::InputParse(format!("transition {id}: missing label")));
    }
    tokens.remove(0);

    let label_tok = tokens
        .first()
        .copied()
        .ok_or_else(|| Error::InputParse(format!("transition {id}: missing label")))?;
    let label = parse_label(&id, label_tok)?;
    tokens.remove(0);

    let idx = net.get_or_create_transition(&id, label);

    let arrow = tokens
        .iter()
        .position(|&t| t == "->")
        .ok_or_else(|| Error::InputParse(format!("transition {id}: missing '->'")))?;
    let (inputs, rest) = tokens.split_at(arrow);
    let outputs = &rest[1..];

    for arc in inputs {
        let (place, weight) = parse_arc(arc)?;
        net.add_place(&place);
        net.transitions[idx].add_pre(&place, weight);
    }
    for arc in outputs {
        let (place, weight) = parse_arc(arc)?;
        net.add_place(&place);
        net.transitions[idx].add_post(&place, weight);
    }
    net.transitions[idx].normalize();

    Ok(())
}

fn parse_label(transition_id: &str, token: &str) -> Result<Label> {
    if token == "tau" {
        return Ok(Label::Silent);
    }
    match token.parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::InputParse(format!(
            "transition {transition_id}: labels must be 'tau' or a non-null natural number, found {token:?}"
        ))),
        Ok(n) => Ok(Label::Labeled(n)),
    }
}

fn parse_arc(token: &str) -> Result<(String, u32)> {
    match token.split_once('*') {
        Some((place, weight_str)) => Ok((place.to_string(), parse_value(weight_str)?)),
        None => Ok((token.to_string(), 1)),
    }
}

/// Parse an arc weight, accepting either a bare natural number or a K/M/G/T/P/E
/// multiplier suffix (§6; `original_source/reductron/ptio/ptnet.py::parse_value`).
fn parse_value(text: &str) -> Result<u32> {
    if let Ok(n) = text.parse::<u32>() {
        return Ok(n);
    }

    let multiplier: u64 = match text.chars().last() {
        Some('K') => 1_000,
        Some('M') => 1_000_000,
        Some('G') => 1_000_000_000,
        Some('T') => 1_000_000_000_000,
        Some('P') => 1_000_000_000_000_000,
        Some('E') => 1_000_000_000_000_000_000,
        _ => return Err(Error::InputParse(format!("bad arc weight {text:?}"))),
    };

    let base: u64 = text[..text.len() - 1]
        .parse()
        .map_err(|_| Error::InputParse(format!("bad arc weight {text:?}")))?;

    u32::try_from(base * multiplier).map_err(|_| Error::InputParse(format!("arc weight {text:?} overflows")))
}
