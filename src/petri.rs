//! Petri net model: places, transitions, and the labeled/silent transition relations
//! used to build SMT-LIB formulas over indexed markings.

use crate::deterministic_map::{HashMap, HashSet, hashmap_new, hashset_new};

/// A transition's label: either silent (`tau`) or a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Silent,
    Labeled(u32),
}

impl Label {
    pub fn is_silent(&self) -> bool {
        matches!(self, Label::Silent)
    }
}

/// A transition: a unique id, a label, pre/post weight maps, and the derived delta
/// and connected-places caches.
#[derive(Debug, Clone)]
pub struct Transition {
    pub id: String,
    pub label: Label,
    pub pre: HashMap<String, u32>,
    pub post: HashMap<String, u32>,
    /// post − pre, places with delta = 0 absent.
    pub delta: HashMap<String, i32>,
    /// Support of pre ∪ post, in first-seen order.
    pub connected: Vec<String>,
    connected_set: HashSet<String>,
}

impl Transition {
    pub fn new(id: impl Into<String>, label: Label) -> Self {
        Transition {
            id: id.into(),
            label,
            pre: hashmap_new(),
            post: hashmap_new(),
            delta: hashmap_new(),
            connected: Vec::new(),
            connected_set: hashset_new(),
        }
    }

    fn touch(&mut self, place: &str) {
        if self.connected_set.insert(place.to_string()) {
            self.connected.push(place.to_string());
        }
    }

    pub fn add_pre(&mut self, place: &str, weight: u32) {
        *self.pre.entry(place.to_string()).or_insert(0) += weight;
        self.touch(place);
    }

    pub fn add_post(&mut self, place: &str, weight: u32) {
        *self.post.entry(place.to_string()).or_insert(0) += weight;
        self.touch(place);
    }

    /// Recompute `delta` from `pre`/`post`. Must be called after all arcs are added.
    pub fn normalize(&mut self) {
        self.delta.clear();
        for place in &self.connected {
            let pre = *self.pre.get(place).unwrap_or(&0) as i64;
            let post = *self.post.get(place).unwrap_or(&0) as i64;
            let d = post - pre;
            if d != 0 {
                self.delta.insert(place.clone(), d as i32);
            }
        }
    }

    fn delta_of(&self, place: &str) -> i32 {
        *self.delta.get(place).unwrap_or(&0)
    }

    /// SMT-LIB conjunction for firing this transition from index `k` to `k'`.
    /// `all_places` enumerates every place of the owning net, used to assert that
    /// unconnected places carry over unchanged.
    fn render(&self, k: u32, k_prime: u32, label_var: Option<&str>, all_places: &[String]) -> String {
        let mut conjuncts = Vec::new();

        if let (Some(l), Label::Labeled(n)) = (label_var, self.label) {
            conjuncts.push(format!("(= {l} {n})"));
        }

        for (place, weight) in sorted_pairs(&self.pre) {
            conjuncts.push(format!("(>= {place}@{k} {weight})"));
        }

        for place in &self.connected {
            let d = self.delta_of(place);
            if d != 0 {
                let sign = if d < 0 { "-" } else { "+" };
                conjuncts.push(format!("(= {place}@{k_prime} ({sign} {place}@{k} {}))", d.abs()));
            }
        }

        for place in all_places {
            if !self.connected_set.contains(place) {
                conjuncts.push(format!("(= {place}@{k_prime} {place}@{k})"));
            }
        }

        format!("(and {})", conjuncts.join(" "))
    }
}

/// Sort a place-keyed map by place name for deterministic formula text.
fn sorted_pairs<'a>(map: &'a HashMap<String, u32>) -> Vec<(&'a String, u32)> {
    let mut v: Vec<_> = map.iter().map(|(k, v)| (k, *v)).collect();
    v.sort_by(|a, b| a.0.cmp(b.0));
    v
}

/// A Petri net: an identifier, a set of places, and transitions partitioned into
/// silent and labeled. Built once by the parser, immutable thereafter.
#[derive(Debug, Clone)]
pub struct PetriNet {
    pub id: String,
    pub places: Vec<String>,
    place_set: HashSet<String>,
    pub transitions: Vec<Transition>,
    transition_index: HashMap<String, usize>,
    pub silent: Vec<usize>,
    pub labeled: Vec<usize>,
}

impl PetriNet {
    pub fn new(id: impl Into<String>) -> Self {
        PetriNet {
            id: id.into(),
            places: Vec::new(),
            place_set: hashset_new(),
            transitions: Vec::new(),
            transition_index: hashmap_new(),
            silent: Vec::new(),
            labeled: Vec::new(),
        }
    }

    pub fn add_place(&mut self, place: &str) {
        if self.place_set.insert(place.to_string()) {
            self.places.push(place.to_string());
        }
    }

    /// Places referenced by any transition must exist in `places` (§3 invariant).
    /// Returns the index of the transition with this id, creating it if absent.
    pub fn get_or_create_transition(&mut self, id: &str, label: Label) -> usize {
        if let Some(&idx) = self.transition_index.get(id) {
            return idx;
        }
        let idx = self.transitions.len();
        self.transitions.push(Transition::new(id, label));
        self.transition_index.insert(id.to_string(), idx);
        match label {
            Label::Silent => self.silent.push(idx),
            Label::Labeled(_) => self.labeled.push(idx),
        }
        idx
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transition_index.get(id).map(|&i| &self.transitions[i])
    }

    pub fn silent_transitions(&self) -> impl Iterator<Item = &Transition> {
        self.silent.iter().map(move |&i| &self.transitions[i])
    }

    pub fn labeled_transitions(&self) -> impl Iterator<Item = &Transition> {
        self.labeled.iter().map(move |&i| &self.transitions[i])
    }

    /// A net with the same places, restricted to its silent transitions (§4.1).
    pub fn silent_restriction(&self) -> PetriNet {
        let mut restricted = PetriNet::new(self.id.clone());
        for place in &self.places {
            restricted.add_place(place);
        }
        for tr in self.silent_transitions() {
            let idx = restricted.get_or_create_transition(&tr.id, tr.label);
            restricted.transitions[idx] = tr.clone();
        }
        restricted
    }

    /// `.net` textual format of the silent restriction, fed to the accelerator
    /// pipeline's net-to-PNML stage.
    pub fn to_net_text(&self) -> String {
        let mut text = format!("net {}\n", self.id);
        for place in &self.places {
            text.push_str(&format!("pl {place}\n"));
        }
        for tr in &self.transitions {
            text.push_str(&transition_to_net_line(tr));
        }
        text
    }

    /// The labeled-transition relation `T(k, k', l)` (§4.1). Always includes the
    /// stuttering disjunct, matching every call site in the obligation composer.
    pub fn labeled_transition_relation(&self, k: u32, k_prime: u32, l: Option<&str>) -> String {
        if self.places.is_empty() {
            return match l {
                None => "true".to_string(),
                Some(l) => format!("(= {l} 0)"),
            };
        }

        let mut disjuncts: Vec<String> = self
            .labeled_transitions()
            .map(|tr| tr.render(k, k_prime, l, &self.places))
            .collect();

        let mut stutter = Vec::new();
        if let Some(l) = l {
            stutter.push(format!("(= {l} 0)"));
        }
        for place in &self.places {
            stutter.push(format!("(= {place}@{k_prime} {place}@{k})"));
        }
        disjuncts.push(format!("(and {})", stutter.join(" ")));

        format!("(or {})", disjuncts.join(" "))
    }

    /// The silent-transition relation `τ(k, k')` (§4.1). Always includes the
    /// stuttering disjunct.
    pub fn silent_transition_relation(&self, k: u32, k_prime: u32) -> String {
        if self.places.is_empty() {
            return "true".to_string();
        }

        let mut disjuncts: Vec<String> = self
            .silent_transitions()
            .map(|tr| tr.render(k, k_prime, None, &self.places))
            .collect();

        let stutter: Vec<String> = self
            .places
            .iter()
            .map(|place| format!("(= {place}@{k_prime} {place}@{k})"))
            .collect();
        disjuncts.push(format!("(and {})", stutter.join(" ")));

        format!("(or {})", disjuncts.join(" "))
    }
}

fn transition_to_net_line(tr: &Transition) -> String {
    let label = match tr.label {
        Label::Silent => "tau".to_string(),
        Label::Labeled(n) => n.to_string(),
    };
    let mut text = format!("tr {} : {label}", tr.id);
    for (place, weight) in sorted_pairs(&tr.pre) {
        text.push(' ');
        text.push_str(&arc_to_net_text(place, weight));
    }
    text.push_str(" ->");
    for (place, weight) in sorted_pairs(&tr.post) {
        text.push(' ');
        text.push_str(&arc_to_net_text(place, weight));
    }
    text.push('\n');
    text
}

fn arc_to_net_text(place: &str, weight: u32) -> String {
    if weight > 1 {
        format!("{place}*{weight}")
    } else {
        place.to_string()
    }
}
