//! The SMT driver (§4.6): a long-lived solver subprocess speaking SMT-LIB v2 on its
//! standard input/output. One process serves every obligation; `check_sat` always
//! resets first, so solver state between calls is empty (no incremental push/pop).
//!
//! Grounded on `original_source/reductron/interfaces/z3.py`'s persistent-process
//! pattern (`reset`/`write`/`flush`/`check-sat` over long-lived pipes), rewritten
//! against `std::process::Child` in `smpt.rs`'s subprocess-driving idiom
//! (`Command::new` + status/output checking).

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::error::{Error, Result};

/// `sat` or `unsat`, the only two responses `check_sat` accepts (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Sat,
    Unsat,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Sat => write!(f, "sat"),
            Verdict::Unsat => write!(f, "unsat"),
        }
    }
}

/// A long-lived SMT solver subprocess. Dropping it kills the child, matching the
/// "no other component may write to or read from its pipes" ownership rule (§5).
pub struct SmtDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    debug: bool,
}

impl SmtDriver {
    /// Spawn `solver_path` with an optional per-process timeout (§4.6); the
    /// timeout, when present, is handed to the solver itself, never enforced by
    /// this driver (§5: "the tool does not impose its own deadlines").
    pub fn spawn(solver_path: &str, timeout_seconds: Option<u32>, debug: bool) -> Result<Self> {
        let mut cmd = Command::new(solver_path);
        cmd.arg("-in");
        if let Some(t) = timeout_seconds {
            cmd.arg(format!("-t:{}", t * 1000));
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::SolverPipe(format!("cannot spawn {solver_path}: {e}")))?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));

        Ok(SmtDriver { child, stdin, stdout, debug })
    }

    /// Enqueue a chunk verbatim: no interpretation, no newline normalisation
    /// beyond what the caller supplies (§4.6).
    pub fn write(&mut self, s: &str) -> Result<()> {
        if self.debug {
            eprintln!("> {s}");
        }
        self.stdin
            .write_all(s.as_bytes())
            .map_err(|e| Error::SolverPipe(format!("write failed: {e}")))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stdin.flush().map_err(|e| Error::SolverPipe(format!("flush failed: {e}")))
    }

    /// `(reset)`, clearing every assertion and declaration.
    pub fn reset(&mut self) -> Result<()> {
        self.write("(reset)\n")?;
        self.flush()
    }

    /// Reset, assert the single closed `formula`, check-sat, and read exactly one
    /// response line. Anything other than `sat`/`unsat` — including a broken pipe
    /// or a solver timeout response — is a fatal abort (§4.6, §7).
    pub fn check_sat(&mut self, formula: &str) -> Result<Verdict> {
        self.reset()?;
        self.write(&format!("(assert {formula})\n"))?;
        self.write("(check-sat)\n")?;
        self.flush()?;

        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| Error::SolverPipe(format!("read failed: {e}")))?;
        if n == 0 {
            return Err(Error::SolverPipe("solver closed its pipe unexpectedly".to_string()));
        }
        if self.debug {
            eprintln!("< {}", line.trim_end());
        }

        match line.trim() {
            "sat" => Ok(Verdict::Sat),
            "unsat" => Ok(Verdict::Unsat),
            other => Err(Error::SolverPipe(format!("unexpected solver response: {other:?}"))),
        }
    }

    /// Kill the subprocess. Called explicitly on abort or normal completion (§5);
    /// `Drop` also kills it, so this is safe to skip when unwinding.
    pub fn shutdown(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for SmtDriver {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_display_matches_solver_vocabulary() {
        assert_eq!(Verdict::Sat.to_string(), "sat");
        assert_eq!(Verdict::Unsat.to_string(), "unsat");
    }

    // Spawning a real solver subprocess requires an external binary on PATH,
    // which this test suite cannot assume; check_sat's parsing is exercised
    // indirectly through the obligation composer's use of stubbed verdicts.
}
