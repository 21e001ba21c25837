//! Generic SMT-LIB v2 formula-building helpers shared by the Presburger, polyhedron,
//! sequence and obligation layers.
//!
//! All quantifiers bind non-negative integers only (§4.7): `forall`/`exists` bake in
//! the `(>= var 0)` side condition for every bound variable.

/// `(and c1 c2 ...)`, or just `c1` when there is one conjunct, or `true` when empty.
pub fn and(conjuncts: &[String]) -> String {
    if conjuncts.is_empty() {
        return "true".to_string();
    }
    let joined = conjuncts.join(" ");
    if conjuncts.len() > 1 {
        format!("(and {joined})")
    } else {
        joined
    }
}

/// `(or d1 d2 ...)`, or just `d1` when there is one disjunct, or `false` when empty.
pub fn or(disjuncts: &[String]) -> String {
    if disjuncts.is_empty() {
        return "false".to_string();
    }
    let joined = disjuncts.join(" ");
    if disjuncts.len() > 1 {
        format!("(or {joined})")
    } else {
        joined
    }
}

pub fn imply(antecedent: &str, consequent: &str) -> String {
    format!("(=> {antecedent} {consequent})")
}

pub fn equiv(left: &str, right: &str) -> String {
    and(&[imply(left, right), imply(right, left)])
}

fn declare_block(vars: &[String]) -> String {
    vars.iter()
        .map(|v| format!("({v} Int)"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_negative(vars: &[String]) -> String {
    and(&vars.iter().map(|v| format!("(>= {v} 0)")).collect::<Vec<_>>())
}

/// `(forall ((v1 Int) ...) (=> (and (>= v1 0) ...) body))`, or just `body` if `vars`
/// is empty.
pub fn forall(vars: &[String], body: &str) -> String {
    if vars.is_empty() {
        return body.to_string();
    }
    format!(
        "(forall ({}) {})",
        declare_block(vars),
        imply(&non_negative(vars), body)
    )
}

/// `(exists ((v1 Int) ...) (and (>= v1 0) ... body))`, or just `body` if `vars` is
/// empty.
pub fn exists(vars: &[String], body: &str) -> String {
    if vars.is_empty() {
        return body.to_string();
    }
    format!(
        "(exists ({}) {})",
        declare_block(vars),
        and(&[non_negative(vars), body.to_string()])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_empty_is_true() {
        assert_eq!(and(&[]), "true");
    }

    #[test]
    fn and_single_is_unwrapped() {
        assert_eq!(and(&["(= a 0)".to_string()]), "(= a 0)");
    }

    #[test]
    fn forall_wraps_with_non_negativity() {
        let f = forall(&["x".to_string()], "(= x x)");
        assert!(f.contains("(forall ((x Int))"));
        assert!(f.contains("(>= x 0)"));
    }

    #[test]
    fn forall_empty_vars_is_identity() {
        assert_eq!(forall(&[], "body"), "body");
    }

    #[test]
    fn equiv_is_both_implications() {
        let e = equiv("a", "b");
        assert!(e.contains("(=> a b)"));
        assert!(e.contains("(=> b a)"));
    }
}
