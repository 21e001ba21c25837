//! `--debug` transcript logging: one timestamped record per SMT exchange or
//! accelerator invocation, optionally dumped as JSON at the end of a run.
//!
//! Grounded on `debug_report.rs`'s `AlgorithmStep`/timestamp shape (`chrono::Local::now()`
//! formatting) and its `Vec<Step>`-accumulator pattern, trimmed to a flat transcript: this
//! crate has no HTML-report requirement, so the HTML-rendering half of `debug_report.rs`
//! is not carried over (§5's single-threaded, synchronous model needs nothing richer than
//! an ordered log of what was sent/received).

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub timestamp: String,
    pub kind: TraceKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceKind {
    SmtOut,
    SmtIn,
    AcceleratorStderr,
    Obligation,
}

/// An ordered transcript, populated only when `--debug` is set (§6).
#[derive(Debug, Default, Serialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Trace { entries: Vec::new() }
    }

    fn push(&mut self, kind: TraceKind, text: impl Into<String>) {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        self.entries.push(TraceEntry { timestamp, kind, text: text.into() });
    }

    pub fn smt_out(&mut self, text: impl Into<String>) {
        self.push(TraceKind::SmtOut, text);
    }

    pub fn smt_in(&mut self, text: impl Into<String>) {
        self.push(TraceKind::SmtIn, text);
    }

    pub fn accelerator_stderr(&mut self, text: impl Into<String>) {
        self.push(TraceKind::AcceleratorStderr, text);
    }

    pub fn obligation(&mut self, label: &str, verdict: impl std::fmt::Display) {
        self.push(TraceKind::Obligation, format!("{label}: {verdict}"));
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Structured dump for a post-mortem artifact, written only on request.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_accumulate_in_call_order() {
        let mut trace = Trace::new();
        trace.smt_in("(assert true)");
        trace.smt_out("sat");
        trace.obligation("(CORE 0)", "sat");

        let kinds: Vec<TraceKind> = trace.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![TraceKind::SmtIn, TraceKind::SmtOut, TraceKind::Obligation]);
        assert_eq!(trace.entries()[2].text, "(CORE 0): sat");
    }

    #[test]
    fn to_json_round_trips_entry_count() {
        let mut trace = Trace::new();
        trace.smt_in("(check-sat)");
        let json = trace.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["entries"].as_array().unwrap().len(), 1);
    }
}
