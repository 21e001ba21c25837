//! The E-polyhedron (§3, §4.3): a Presburger-shaped relation whose variables are
//! split into three disjoint groups — the initial net's places, the reduced net's
//! places, and common/auxiliary witnesses shared by both sides — each independently
//! indexable at render time.
//!
//! Grounded on the same `Expression`/parser machinery as [`crate::presburger`]; the
//! refinement here is purely in how a variable name is resolved to a time index,
//! layering a specialised renderer over a shared AST the way
//! `examples/julesjacobs-ser` layers typed views over one parsed representation.

use crate::deterministic_map::{HashSet, hashset_new};
use crate::error::Result;
use crate::presburger::{self, Expr};

/// Which of the three groups a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Initial,
    Reduced,
    Common,
}

/// The E-relation: a conjunction of Presburger atoms over initial places, reduced
/// places, and common/auxiliary variables (§3).
#[derive(Debug, Clone)]
pub struct Polyhedron {
    initial: HashSet<String>,
    reduced: HashSet<String>,
    common: Vec<String>,
    root: Expr,
}

impl Polyhedron {
    /// Parse the E-relation text against the two nets' place sets. Every name
    /// referenced by an atom that is not a place of either net becomes a common
    /// variable (§3's "every atom's free variables lie in the union of the three
    /// groups" invariant).
    pub fn parse(text: &str, initial_places: &HashSet<String>, reduced_places: &HashSet<String>) -> Result<Self> {
        let root = presburger::parse_expr(text)?;
        let mut vars = Vec::new();
        root.variables(&mut vars);

        let mut common = Vec::new();
        for v in &vars {
            if !initial_places.contains(v) && !reduced_places.contains(v) && !common.contains(v) {
                common.push(v.clone());
            }
        }

        Ok(Polyhedron { initial: initial_places.clone(), reduced: reduced_places.clone(), common, root })
    }

    fn group_of(&self, name: &str) -> Option<Group> {
        if self.initial.contains(name) {
            Some(Group::Initial)
        } else if self.reduced.contains(name) {
            Some(Group::Reduced)
        } else if self.common.iter().any(|c| c == name) {
            Some(Group::Common)
        } else {
            None
        }
    }

    /// Render with each group indexed independently; `None` leaves a group's
    /// variables free (§4.3).
    pub fn render(&self, k1: Option<u32>, k2: Option<u32>, k_common: Option<u32>) -> String {
        let resolve = |name: &str| match self.group_of(name) {
            Some(Group::Initial) => k1,
            Some(Group::Reduced) => k2,
            Some(Group::Common) => k_common,
            None => None,
        };
        self.root.render_with(&resolve)
    }

    /// Typed declarations for a subset of groups, for callers that declare the
    /// excluded group at a different scope (§4.3).
    pub fn declare(&self, k1: Option<u32>, k2: Option<u32>, exclude_initial: bool, exclude_reduced: bool) -> Vec<String> {
        let mut decls = Vec::new();
        if !exclude_initial {
            let mut names: Vec<&String> = self.initial.iter().collect();
            names.sort();
            for name in names {
                decls.push(indexed_name(name, k1));
            }
        }
        if !exclude_reduced {
            let mut names: Vec<&String> = self.reduced.iter().collect();
            names.sort();
            for name in names {
                decls.push(indexed_name(name, k2));
            }
        }
        decls
    }

    /// The common/auxiliary variable names (in first-seen order), for callers that
    /// need to quantify them directly.
    pub fn common_vars(&self) -> &[String] {
        &self.common
    }

    /// Typed declarations for the common/auxiliary group alone, at `k_common`
    /// (or bare if `None`). Kept separate from `declare` because the common
    /// group is quantified independently of which of initial/reduced is excluded.
    pub fn declare_common(&self, k_common: Option<u32>) -> Vec<String> {
        self.common.iter().map(|name| indexed_name(name, k_common)).collect()
    }

    pub fn initial_places(&self) -> &HashSet<String> {
        &self.initial
    }

    pub fn reduced_places(&self) -> &HashSet<String> {
        &self.reduced
    }
}

fn indexed_name(name: &str, k: Option<u32>) -> String {
    match k {
        Some(k) => format!("{name}@{k}"),
        None => name.to_string(),
    }
}
