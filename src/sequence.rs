//! Saturated sequences (§3, §4.4): a transition list reduced to a hurdle vector and
//! a displacement vector by a rightmost-first fold, rendered as an existentially
//! quantified SMT-LIB formula parametric in the firing count.
//!
//! Grounded on `original_source/reductron/ptio/ptnet.py`'s sequence-vector
//! computation, re-expressed in an owned-data style (a sequence stores its
//! transitions by value rather than holding a net reference, avoiding a
//! bidirectional owning reference).

use crate::deterministic_map::{HashMap, hashmap_new};
use crate::petri::Transition;

/// A saturated sequence: an owning net id, a fresh saturation-variable name, the
/// transitions in firing order, and the derived hurdle/displacement maps.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub net_id: String,
    pub saturation_var: String,
    pub transitions: Vec<Transition>,
    pub hurdle: HashMap<String, u32>,
    pub delta: HashMap<String, i32>,
}

impl Sequence {
    /// Build a sequence from transitions in execution order (§4.4): fold from the
    /// last transition leftwards, maintaining H and Δ per the §3 invariants.
    pub fn new(net_id: impl Into<String>, saturation_var: impl Into<String>, transitions: Vec<Transition>) -> Self {
        let mut hurdle: HashMap<String, u32> = hashmap_new();
        let mut delta: HashMap<String, i32> = hashmap_new();

        for t in transitions.iter().rev() {
            let mut places: Vec<&String> = t.pre.keys().chain(t.delta.keys()).collect();
            places.sort();
            places.dedup();
            for place in places {
                let pre = *t.pre.get(place).unwrap_or(&0) as i32;
                let transition_delta = t.delta.get(place).copied().unwrap_or(0);
                let prior_hurdle = *hurdle.get(place).unwrap_or(&0) as i32;
                let new_hurdle = (pre.max(prior_hurdle - transition_delta)).max(0);
                if new_hurdle != 0 {
                    hurdle.insert(place.clone(), new_hurdle as u32);
                } else {
                    hurdle.remove(place);
                }
            }

            let mut delta_places: Vec<&String> = t.delta.keys().collect();
            delta_places.sort();
            for place in delta_places {
                let d = t.delta.get(place).copied().unwrap_or(0) + delta.get(place).copied().unwrap_or(0);
                if d != 0 {
                    delta.insert(place.clone(), d);
                } else {
                    delta.remove(place);
                }
            }
        }

        Sequence { net_id: net_id.into(), saturation_var: saturation_var.into(), transitions, hurdle, delta }
    }

    fn delta_of(&self, place: &str) -> i32 {
        // §9 Open Question resolved: delta is 0 for any place outside the
        // sequence's support, never an error.
        *self.delta.get(place).unwrap_or(&0)
    }

    fn hurdle_of(&self, place: &str) -> u32 {
        *self.hurdle.get(place).unwrap_or(&0)
    }

    /// Connected places: the union of every transition's connected places, plus
    /// anything this sequence's own hurdle/delta maps mention.
    fn connected_places(&self) -> Vec<String> {
        let mut places = Vec::new();
        for t in &self.transitions {
            for p in &t.connected {
                if !places.contains(p) {
                    places.push(p.clone());
                }
            }
        }
        for p in self.hurdle.keys().chain(self.delta.keys()) {
            if !places.contains(p) {
                places.push(p.clone());
            }
        }
        places.sort();
        places
    }

    /// `render(k)` → the existentially quantified zero/positive-firings disjunction
    /// (§4.4). `all_places` is the owning net's full place list, used to assert
    /// unconnected places carry over unchanged between `k` and `k'`.
    pub fn render(&self, k: u32, k_prime: u32, all_places: &[String]) -> String {
        if self.transitions.is_empty() {
            // empty sequence ε renders as the identity on markings (§4.4)
            let identity: Vec<String> =
                all_places.iter().map(|p| format!("(= {p}@{k_prime} {p}@{k})")).collect();
            return crate::smtlib::and(&identity);
        }

        let s = &self.saturation_var;
        let connected = self.connected_places();

        let mut zero_conjuncts = vec![format!("(= {s} 0)")];
        for p in all_places {
            zero_conjuncts.push(format!("(= {p}@{k_prime} {p}@{k})"));
        }
        let zero_firings = crate::smtlib::and(&zero_conjuncts);

        let mut positive_conjuncts = vec![format!("(> {s} 0)")];
        for p in &connected {
            let h = self.hurdle_of(p);
            if h == 0 {
                continue;
            }
            let d = self.delta_of(p);
            if d >= 0 {
                positive_conjuncts.push(format!("(>= {p}@{k} {h})"));
            } else {
                positive_conjuncts.push(format!("(>= {p}@{k} (+ {h} (* (- {s} 1) {})))", d.unsigned_abs()));
            }
        }
        for p in &connected {
            let d = self.delta_of(p);
            if d == 0 {
                continue;
            }
            let sign = if d < 0 { "-" } else { "+" };
            positive_conjuncts.push(format!("(= {p}@{k_prime} ({sign} {p}@{k} (* {s} {})))", d.unsigned_abs()));
        }
        for p in all_places {
            if !connected.contains(p) {
                positive_conjuncts.push(format!("(= {p}@{k_prime} {p}@{k})"));
            }
        }
        let positive_firings = crate::smtlib::and(&positive_conjuncts);

        let body = crate::smtlib::or(&[zero_firings, positive_firings]);
        crate::smtlib::exists(&[s.clone()], &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::petri::Label;

    fn transition(id: &str, pre: &[(&str, u32)], post: &[(&str, u32)]) -> Transition {
        let mut t = Transition::new(id, Label::Silent);
        for (p, w) in pre {
            t.add_pre(p, *w);
        }
        for (p, w) in post {
            t.add_post(p, *w);
        }
        t.normalize();
        t
    }

    #[test]
    fn displacement_is_the_sum_of_transition_deltas() {
        let t1 = transition("t1", &[("a", 1)], &[("b", 1)]);
        let t2 = transition("t2", &[("b", 1)], &[("c", 1)]);
        let seq = Sequence::new("n", "s0", vec![t1, t2]);

        assert_eq!(seq.delta_of("a"), -1);
        assert_eq!(seq.delta_of("b"), 0, "b is produced by t1 and consumed by t2: net zero");
        assert_eq!(seq.delta_of("c"), 1);
    }

    #[test]
    fn hurdle_with_negative_delta_scenario() {
        // a single transition consuming 2 from `a` and producing 1 in `b`
        let t = transition("t", &[("a", 2)], &[("b", 1)]);
        let seq = Sequence::new("n", "s0", vec![t]);

        assert_eq!(seq.hurdle.get("a"), Some(&2));
        assert_eq!(seq.delta_of("a"), -2);

        let rendered = seq.render(0, 1, &["a".to_string(), "b".to_string()]);
        assert!(rendered.contains("(>= a@0 (+ 2 (* (- s0 1) 2)))"));
    }

    #[test]
    fn empty_sequence_is_identity() {
        let seq = Sequence::new("n", "s0", Vec::new());
        assert!(seq.hurdle.is_empty());
        assert!(seq.delta.is_empty());
        let rendered = seq.render(0, 1, &["a".to_string()]);
        assert_eq!(rendered, "(= a@1 a@0)");
    }

    #[test]
    fn zero_firings_disjunct_holds_markings_equal() {
        let t = transition("t", &[("a", 1)], &[("b", 1)]);
        let seq = Sequence::new("n", "s0", vec![t]);
        let rendered = seq.render(2, 3, &["a".to_string(), "b".to_string()]);
        assert!(rendered.contains("(= s0 0)"));
        assert!(rendered.contains("(= a@3 a@2)"));
        assert!(rendered.contains("(= b@3 b@2)"));
    }
}
