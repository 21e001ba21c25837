//! Presburger-arithmetic formulas over place token counts: the `Expression` AST
//! (§3), its SMT-LIB and accelerator ("fast") renderings, and the constraint-text
//! parser that builds it from a `# Constraint: ...` line.
//!
//! Grounded on `original_source/reductron/ptio/presburger.py`'s tokenizer and
//! `_member_constructor`/`parse_formula` recursive-descent grammar, re-expressed as a
//! tagged-union AST in the style of `examples/julesjacobs-ser/src/presburger.rs`'s
//! `Constraint`/`ConstraintType`.

use crate::deterministic_map::{HashSet, hashset_new};
use crate::error::{Error, Result};
use regex::Regex;

/// One operand of an atom: either a bare integer, or a linear combination of place /
/// additional-variable token counts plus an optional constant offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleExpr {
    IntegerConstant(i64),
    TokenCount { terms: Vec<(String, i64)>, constant: i64 },
}

impl SimpleExpr {
    /// Render with a caller-supplied resolver mapping each referenced name to the
    /// time index it should carry, or `None` to leave it free. Shared by
    /// `Presburger` (a single index-or-free group) and `Polyhedron` (three groups,
    /// each with its own index).
    fn render_with(&self, resolve: &dyn Fn(&str) -> Option<u32>) -> String {
        match self {
            SimpleExpr::IntegerConstant(n) => n.to_string(),
            SimpleExpr::TokenCount { terms, constant } => {
                let mut parts: Vec<String> = terms
                    .iter()
                    .filter(|(_, c)| *c != 0)
                    .map(|(var, coeff)| {
                        let name = match resolve(var) {
                            Some(k) => format!("{var}@{k}"),
                            None => var.clone(),
                        };
                        if *coeff == 1 {
                            name
                        } else {
                            format!("(* {coeff} {name})")
                        }
                    })
                    .collect();
                if *constant != 0 || parts.is_empty() {
                    parts.push(constant.to_string());
                }
                if parts.len() == 1 {
                    parts.into_iter().next().unwrap()
                } else {
                    format!("(+ {})", parts.join(" "))
                }
            }
        }
    }

    /// Fast-engine rendering: a place reference becomes the named constant `K_p`
    /// (§4.2) the accelerator solves for; additional variables render bare.
    fn render_fast(&self, places: &HashSet<String>) -> String {
        match self {
            SimpleExpr::IntegerConstant(n) => n.to_string(),
            SimpleExpr::TokenCount { terms, constant } => {
                let mut parts: Vec<String> = terms
                    .iter()
                    .filter(|(_, c)| *c != 0)
                    .map(|(var, coeff)| {
                        let name = if places.contains(var) { format!("K_{var}") } else { var.clone() };
                        if *coeff == 1 {
                            name
                        } else {
                            format!("{coeff}*{name}")
                        }
                    })
                    .collect();
                if *constant != 0 || parts.is_empty() {
                    parts.push(constant.to_string());
                }
                parts.join(" + ")
            }
        }
    }

    fn variables(&self, out: &mut Vec<String>) {
        if let SimpleExpr::TokenCount { terms, .. } = self {
            for (var, _) in terms {
                if !out.contains(var) {
                    out.push(var.clone());
                }
            }
        }
    }
}

/// Convenience resolver for a single-group formula: indexed if in `places`, free
/// (additional variable) otherwise.
fn single_group_resolver(places: &HashSet<String>, k: Option<u32>) -> impl Fn(&str) -> Option<u32> + '_ {
    move |name| if places.contains(name) { k } else { None }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn smt_symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "distinct",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    fn fast_symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

/// A Presburger formula (§3): a boolean constant, an atom comparing two
/// `SimpleExpr`s, or a boolean combination of sub-formulas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    BooleanConstant(bool),
    Atom(SimpleExpr, CmpOp, SimpleExpr),
    StateFormula(Vec<Expr>, BoolOp),
}

impl Expr {
    pub(crate) fn render_with(&self, resolve: &dyn Fn(&str) -> Option<u32>) -> String {
        match self {
            Expr::BooleanConstant(true) => "true".to_string(),
            Expr::BooleanConstant(false) => "false".to_string(),
            Expr::Atom(l, op, r) => {
                format!(
                    "({} {} {})",
                    op.smt_symbol(),
                    l.render_with(resolve),
                    r.render_with(resolve)
                )
            }
            Expr::StateFormula(children, BoolOp::Not) => {
                format!("(not {})", children[0].render_with(resolve))
            }
            Expr::StateFormula(children, op) => {
                let keyword = if *op == BoolOp::And { "and" } else { "or" };
                let rendered: Vec<String> = children.iter().map(|c| c.render_with(resolve)).collect();
                if rendered.len() == 1 {
                    rendered.into_iter().next().unwrap()
                } else {
                    format!("({keyword} {})", rendered.join(" "))
                }
            }
        }
    }

    fn render_fast(&self, places: &HashSet<String>) -> String {
        match self {
            Expr::BooleanConstant(true) => "true".to_string(),
            Expr::BooleanConstant(false) => "false".to_string(),
            Expr::Atom(l, op, r) => {
                format!("{} {} {}", l.render_fast(places), op.fast_symbol(), r.render_fast(places))
            }
            Expr::StateFormula(children, BoolOp::Not) => format!("!({})", children[0].render_fast(places)),
            Expr::StateFormula(children, op) => {
                let joiner = if *op == BoolOp::And { " && " } else { " || " };
                children
                    .iter()
                    .map(|c| format!("({})", c.render_fast(places)))
                    .collect::<Vec<_>>()
                    .join(joiner)
            }
        }
    }

    pub(crate) fn variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::BooleanConstant(_) => {}
            Expr::Atom(l, _, r) => {
                l.variables(out);
                r.variables(out);
            }
            Expr::StateFormula(children, _) => {
                for c in children {
                    c.variables(out);
                }
            }
        }
    }
}

/// Parse a constraint-text formula into its AST without classifying variables —
/// used directly by `Polyhedron`, which partitions names into three groups rather
/// than the single place/additional-variable split `Presburger` uses.
pub(crate) fn parse_expr(text: &str) -> Result<Expr> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let root = parser.parse_connective()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::InputParse(format!(
            "trailing tokens after formula: {:?}",
            &parser.tokens[parser.pos..]
        )));
    }
    Ok(root)
}

/// A parsed constraint: the formula plus the names it introduces that are not
/// places of the owning net (§3's "additional variables").
#[derive(Debug, Clone)]
pub struct Presburger {
    places: HashSet<String>,
    additional_vars: Vec<String>,
    root: Expr,
}

impl Presburger {
    /// The formula `true`, used when a net file carries no `# Constraint:` line
    /// (§9 Open Question: a missing constraint defaults to the tautology).
    pub fn tautology(places: &HashSet<String>) -> Self {
        Presburger {
            places: places.clone(),
            additional_vars: Vec::new(),
            root: Expr::BooleanConstant(true),
        }
    }

    pub fn parse(text: &str, places: &HashSet<String>) -> Result<Self> {
        let root = parse_expr(text)?;
        let mut vars = Vec::new();
        root.variables(&mut vars);
        let additional_vars = vars.into_iter().filter(|v| !places.contains(v)).collect();
        Ok(Presburger { places: places.clone(), additional_vars, root })
    }

    pub fn render(&self, k: Option<u32>) -> String {
        self.root.render_with(&single_group_resolver(&self.places, k))
    }

    /// The acceleration engine's input dialect (§4.2): places become named
    /// constants `K_p`, and the body is conjoined with `(p = K_p)` bindings for
    /// every place this formula declares, so the accelerator solves for the
    /// constants.
    pub fn fast(&self) -> String {
        let body = self.root.render_fast(&self.places);
        let mut place_names: Vec<&String> = self.places.iter().collect();
        place_names.sort();
        let mut bindings: Vec<String> = vec![format!("({body})")];
        bindings.extend(place_names.into_iter().map(|p| format!("({p} = K_{p})")));
        bindings.join(" && ")
    }

    /// Names this formula introduces beyond the net's own places (§3); the
    /// composer quantifies these directly, since the formula's own places are
    /// declared by whatever context the formula is rendered into.
    pub fn additional_vars(&self) -> &[String] {
        &self.additional_vars
    }
}

/// Tina-style tokenizer (§4.2): `/\` and `\/` are two-character connectives, `-`
/// is a standalone token (negation at formula level, subtraction inside a sum),
/// `T`/`F` are boolean-constant keywords matching the identifier pattern.
fn tokenize(text: &str) -> Result<Vec<String>> {
    lazy_static::lazy_static! {
        static ref TOKEN_RE: Regex =
            Regex::new(r"/\\|\\/|<=|>=|=|<|>|\(|\)|\+|-|\*|[A-Za-z_][A-Za-z0-9_]*|[0-9]+").unwrap();
    }
    let mut tokens = Vec::new();
    let mut cursor = 0;
    for m in TOKEN_RE.find_iter(text) {
        if m.start() != cursor {
            let gap = &text[cursor..m.start()];
            if !gap.trim().is_empty() {
                return Err(Error::InputParse(format!("unrecognized constraint text near {gap:?}")));
            }
        }
        tokens.push(m.as_str().to_string());
        cursor = m.end();
    }
    if text[cursor..].trim().chars().any(|c| !c.is_whitespace()) {
        return Err(Error::InputParse(format!(
            "unrecognized constraint text near {:?}",
            &text[cursor..]
        )));
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn advance(&mut self) -> Option<&'a str> {
        let t = self.tokens.get(self.pos).map(|s| s.as_str());
        self.pos += 1;
        t
    }

    fn expect(&mut self, tok: &str) -> Result<()> {
        match self.advance() {
            Some(t) if t == tok => Ok(()),
            other => Err(Error::InputParse(format!("expected {tok:?}, found {other:?}"))),
        }
    }

    /// `/\` and `\/` share one precedence level (§4.2): processed strictly
    /// left-to-right, and switching connective mid-level collapses whatever has
    /// been accumulated so far into a single grouped operand before continuing
    /// under the new one.
    fn parse_connective(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_unary()?];
        let mut current_op: Option<BoolOp> = None;

        loop {
            let op = match self.peek() {
                Some("/\\") => BoolOp::And,
                Some("\\/") => BoolOp::Or,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            match current_op {
                Some(cur) if cur != op => {
                    operands = vec![Expr::StateFormula(operands, cur)];
                }
                _ => {}
            }
            current_op = Some(op);
            operands.push(rhs);
        }

        Ok(match current_op {
            Some(op) => Expr::StateFormula(operands, op),
            None => operands.into_iter().next().unwrap(),
        })
    }

    /// `-` as a prefix is formula negation (§4.2); a leading minus never reaches
    /// this point for a bare atom's left operand, since that case is handled by
    /// [`Parser::parse_sum`]'s own sign tracking.
    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some("-") {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::StateFormula(vec![inner], BoolOp::Not));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some("(") => {
                self.advance();
                let inner = self.parse_connective()?;
                self.expect(")")?;
                Ok(inner)
            }
            Some("T") => {
                self.advance();
                Ok(Expr::BooleanConstant(true))
            }
            Some("F") => {
                self.advance();
                Ok(Expr::BooleanConstant(false))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let lhs = self.parse_sum()?;
        let op = match self.advance() {
            Some("=") => CmpOp::Eq,
            Some("<=") => CmpOp::Le,
            Some(">=") => CmpOp::Ge,
            Some("<") => CmpOp::Lt,
            Some(">") => CmpOp::Gt,
            other => return Err(Error::InputParse(format!("expected a comparison operator, found {other:?}"))),
        };
        let rhs = self.parse_sum()?;
        Ok(Expr::Atom(lhs, op, rhs))
    }

    /// A linear combination: `+`/`-`-separated terms, a leading `-` here is a
    /// sign on the first term, not formula negation (that is only recognised at
    /// [`Parser::parse_unary`], before a sum has started).
    fn parse_sum(&mut self) -> Result<SimpleExpr> {
        let mut terms: Vec<(String, i64)> = Vec::new();
        let mut constant: i64 = 0;
        let mut sign = if self.peek() == Some("-") {
            self.advance();
            -1i64
        } else {
            1i64
        };
        loop {
            let (term_terms, term_const) = self.parse_term()?;
            for (var, coeff) in term_terms {
                merge_term(&mut terms, var, sign * coeff);
            }
            constant += sign * term_const;
            match self.peek() {
                Some("+") => {
                    self.advance();
                    sign = 1;
                }
                Some("-") => {
                    self.advance();
                    sign = -1;
                }
                _ => break,
            }
        }
        if terms.is_empty() {
            Ok(SimpleExpr::IntegerConstant(constant))
        } else {
            Ok(SimpleExpr::TokenCount { terms, constant })
        }
    }

    /// A single additive term: `N`, `var`, or `N*var`. Returns its variable terms
    /// (at most one) and any bare constant contribution.
    fn parse_term(&mut self) -> Result<(Vec<(String, i64)>, i64)> {
        let first = self
            .advance()
            .ok_or_else(|| Error::InputParse("unexpected end of constraint".to_string()))?;

        if let Ok(n) = first.parse::<i64>() {
            if self.peek() == Some("*") {
                self.advance();
                let var = self.parse_identifier()?;
                return Ok((vec![(var, n)], 0));
            }
            return Ok((Vec::new(), n));
        }

        let var = sanitize_and_validate(first)?;
        Ok((vec![(var, 1)], 0))
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let tok = self
            .advance()
            .ok_or_else(|| Error::InputParse("expected an identifier".to_string()))?;
        sanitize_and_validate(tok)
    }
}

fn sanitize_and_validate(tok: &str) -> Result<String> {
    if tok.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true) {
        return Err(Error::InputParse(format!("expected an identifier, found {tok:?}")));
    }
    Ok(crate::utils::string::sanitize_identifier(tok))
}

fn merge_term(terms: &mut Vec<(String, i64)>, var: String, coeff: i64) {
    if let Some(entry) = terms.iter_mut().find(|(v, _)| *v == var) {
        entry.1 += coeff;
    } else {
        terms.push((var, coeff));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(names: &[&str]) -> HashSet<String> {
        let mut s = hashset_new();
        for n in names {
            s.insert(n.to_string());
        }
        s
    }

    #[test]
    fn missing_constraint_defaults_to_tautology() {
        let p = Presburger::tautology(&places(&["a", "b"]));
        assert_eq!(p.render(Some(0)), "true");
        assert_eq!(p.render(None), "true");
    }

    #[test]
    fn simple_atom_indexes_places_but_not_additional_vars() {
        let p = Presburger::parse("a + n >= 2*b", &places(&["a", "b"])).unwrap();
        assert_eq!(p.additional_vars(), &["n".to_string()]);
        let rendered = p.render(Some(5));
        assert!(rendered.contains("a@5"));
        assert!(rendered.contains("n"));
        assert!(!rendered.contains("n@5"));
        assert!(rendered.contains("(* 2 b@5)"));
    }

    #[test]
    fn boolean_combinators_and_precedence() {
        let p = Presburger::parse("a=0 /\\ (b>=1 \\/ -a=2)", &places(&["a", "b"])).unwrap();
        let rendered = p.render(Some(0));
        assert!(rendered.starts_with("(and"));
        assert!(rendered.contains("(not"));
    }

    #[test]
    fn switching_connective_mid_level_groups_the_accumulated_chain() {
        // a /\ b \/ c groups as (a and b) or c (§4.2's "change of operator
        // constructs a grouped sub-formula", left to right).
        let p = Presburger::parse("a=0 /\\ b=0 \\/ b=1", &places(&["a", "b"])).unwrap();
        let rendered = p.render(Some(0));
        assert!(rendered.starts_with("(or (and"));
    }

    #[test]
    fn free_variable_round_trip_property() {
        // every identifier that shows up in the source text is either a place
        // (gets indexed) or surfaces in additional_vars — none are silently dropped.
        let p = Presburger::parse("x + y - a <= 3", &places(&["a"])).unwrap();
        let mut found = p.additional_vars().to_vec();
        found.sort();
        assert_eq!(found, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn fast_rendering_uses_named_constants_and_bindings() {
        let p = Presburger::parse("a>=1 /\\ b=0", &places(&["a", "b"])).unwrap();
        let fast = p.fast();
        assert!(fast.contains("&&"));
        assert!(fast.contains("K_a"));
        assert!(fast.contains("(a = K_a)"));
        assert!(fast.contains("(b = K_b)"));
    }

    #[test]
    fn malformed_text_is_an_input_parse_error() {
        assert!(Presburger::parse("a>= ", &places(&["a"])).is_err());
        assert!(Presburger::parse("a @@ b", &places(&["a", "b"])).is_err());
    }

    #[test]
    fn negative_rhs_constant_is_a_sign_not_negation() {
        let p = Presburger::parse("a>=-3", &places(&["a"])).unwrap();
        let rendered = p.render(Some(0));
        assert_eq!(rendered, "(>= a@0 -3)");
    }
}
