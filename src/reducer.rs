//! The symmetry-reduction engine: per-level prefix state and the
//! pull-based enumeration of canonical partial assignments.

use crate::canon::Canonical;
use crate::error::InputError;
use crate::graph::ColoredGraph;
use crate::orbit::{select_next, Traversal};
use itertools::Itertools;
use tracing::debug;

/// Problem definition: the base graph, the variable and value vertex
/// sets with their legends, and the search parameters.
#[derive(Clone, Debug)]
pub struct Instance {
    pub base: ColoredGraph,
    /// Variable vertices, in declaration order. Must be a union of
    /// orbits of the base graph's automorphism group.
    pub variables: Vec<usize>,
    pub var_legends: Vec<String>,
    /// Value vertices. Each must be fixed by every base automorphism.
    pub values: Vec<usize>,
    pub val_legends: Vec<String>,
    /// Preset prefix of variable vertices; grown adaptively past its end.
    pub prefix: Vec<usize>,
    /// Values declared for leading prefix positions (`a` lines); parsed
    /// and range-checked but not consulted by the search.
    pub preset_values: Vec<usize>,
    /// Maximum assignment length K.
    pub target_length: usize,
    /// Emit an accepted assignment early once its graph's automorphism
    /// group order falls to this threshold.
    pub threshold: u64,
}

/// One canonical partial assignment: normalized variable vertices, the
/// value vertices assigned to them, and the truncated `|Aut|` of the
/// assignment-extended graph.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Assignment {
    pub vars: Vec<usize>,
    pub vals: Vec<usize>,
    pub aut: u32,
}

impl Assignment {
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Per-level candidate counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LevelCounters {
    pub generated: u64,
    pub canonical: u64,
    pub emitted: u64,
}

/// State owned per prefix position.
#[derive(Clone, Debug)]
struct Level {
    traversal: Traversal,
    /// Indicator of the traversal image set.
    trav_ind: Vec<bool>,
    /// Indicator of the orbit of the prefix vertex in the graph with
    /// this level's prefix edge added.
    orbit: Vec<bool>,
    /// Seed-orbit minimum indicator; rewritten whenever a frame for the
    /// level is pushed.
    seed_min: Vec<bool>,
    counters: LevelCounters,
}

/// Enumerates canonical partial assignments of the variable vertices,
/// one orbit representative each, in a deterministic order.
#[derive(Debug)]
pub struct Reducer {
    base: ColoredGraph,
    base_canonical: Canonical,
    variables: Vec<usize>,
    var_legends: Vec<String>,
    values: Vec<usize>,
    val_legends: Vec<String>,
    prefix: Vec<usize>,
    threshold: u64,
    target_length: usize,
    levels: Vec<Level>,
    last_prefix_graph: Option<ColoredGraph>,
    /// Packed work stack: each frame is vars, vals, then the frame size.
    work: Vec<usize>,
    started: bool,
}

impl Reducer {
    pub fn new(instance: Instance) -> Result<Self, InputError> {
        let Instance {
            base,
            variables,
            var_legends,
            values,
            val_legends,
            prefix,
            preset_values: _,
            target_length,
            threshold,
        } = instance;
        let n = base.len();

        if variables.is_empty() {
            return Err(InputError::BadVariableCount(0));
        }
        if values.is_empty() {
            return Err(InputError::BadValueCount(0));
        }
        for &u in variables.iter().chain(&values).chain(&prefix) {
            if u >= n {
                return Err(InputError::VertexOutOfRange(u + 1));
            }
        }
        if let Some(u) = repeated_element(&variables) {
            return Err(InputError::RepeatedVariable(u + 1));
        }
        if let Some(u) = repeated_element(&values) {
            return Err(InputError::RepeatedValue(u + 1));
        }
        if let Some(u) = repeated_element(&prefix) {
            return Err(InputError::RepeatedPrefixElement(u + 1));
        }
        for &p in &prefix {
            if !variables.contains(&p) {
                return Err(InputError::PrefixNotVariable(p + 1));
            }
        }
        if target_length == 0 && prefix.is_empty() {
            return Err(InputError::NothingToDo);
        }
        if prefix.len() > target_length {
            return Err(InputError::PrefixExceedsTarget);
        }

        let base_canonical = Canonical::of(&base);
        let mut is_var = vec![false; n];
        for &v in &variables {
            is_var[v] = true;
        }
        for v in 0..n {
            let rep = base_canonical.orbit[v];
            if is_var[v] != is_var[rep] {
                return Err(InputError::VariablesNotOrbitUnion(v + 1, rep + 1));
            }
        }
        for &s in &values {
            if (0..n).any(|u| u != s && base_canonical.same_orbit(u, s)) {
                return Err(InputError::ValueNotFixed(s + 1));
            }
        }

        let mut reducer = Self {
            base,
            base_canonical,
            variables,
            var_legends,
            values,
            val_legends,
            prefix,
            threshold,
            target_length,
            levels: vec![],
            last_prefix_graph: None,
            work: Vec::with_capacity((2 * target_length + 1) * (target_length + 1)),
            started: false,
        };

        // Rebuild the levels of the preset prefix, threading the prefix
        // graph from one expansion to the next.
        let mut g: Option<ColoredGraph> = None;
        for i in 0..reducer.prefix.len() {
            let graph = g.take().unwrap_or_else(|| reducer.base.clone());
            let cg = Canonical::of(&graph);
            g = Some(reducer.expand_prefix(i, reducer.prefix[i], graph, &cg));
        }
        if let Some(g) = &g {
            let cg = Canonical::of(g);
            debug!(
                level = reducer.levels.len(),
                aut = %cg.aut_order_display(),
                orbits = %variable_orbits(&cg, &reducer.variables),
                "prefix graph"
            );
        }
        reducer.last_prefix_graph = g;

        Ok(reducer)
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn variables(&self) -> &[usize] {
        &self.variables
    }

    pub fn values(&self) -> &[usize] {
        &self.values
    }

    pub fn prefix(&self) -> &[usize] {
        &self.prefix
    }

    pub fn counters(&self) -> impl ExactSizeIterator<Item = LevelCounters> + '_ {
        self.levels.iter().map(|l| l.counters)
    }

    /// Legend pairs `(variable, value)` for an emitted assignment.
    pub fn legend_pairs<'a>(&'a self, a: &Assignment) -> Vec<(&'a str, &'a str)> {
        a.vars
            .iter()
            .zip(&a.vals)
            .map(|(&v, &w)| {
                let j = self.variables.iter().position(|&x| x == v);
                let jj = self.values.iter().position(|&x| x == w);
                let (j, jj) = j.zip(jj).expect("no data for assignment");
                (self.var_legends[j].as_str(), self.val_legends[jj].as_str())
            })
            .collect()
    }

    /// Next canonical partial assignment, or `None` once the search is
    /// exhausted. Exhaustion is sticky.
    pub fn next_assignment(&mut self) -> Option<Assignment> {
        if self.target_length == 0 {
            return None;
        }
        if !self.started {
            self.start();
        }
        loop {
            let (mut vars, mut vals) = self.pop_frame()?;
            let lvl = vars.len() - 1;
            let current = self.levels[lvl]
                .traversal
                .position_of_image(vars[lvl])
                .expect("no current variable");
            let cv = vals[lvl];

            if cv >= self.values.len() {
                // Advance to the next seed-minimal variable of the
                // level's orbit, if any; otherwise the level is spent.
                let level = &self.levels[lvl];
                let next_pos = (current + 1..level.traversal.len())
                    .find(|&j| level.seed_min[level.traversal.image(j)]);
                if let Some(j) = next_pos {
                    vars[lvl] = self.levels[lvl].traversal.image(j);
                    vals[lvl] = 0;
                    self.push_frame(&vars, &vals);
                }
                continue;
            }

            // Schedule the next value before processing this one.
            self.levels[lvl].counters.generated += 1;
            vals[lvl] += 1;
            self.push_frame(&vars, &vals);
            vals[lvl] = cv;

            let nu = self.levels[lvl].traversal.perm(current).inverse();
            assert_eq!(nu.apply(vars[lvl]), self.prefix[lvl], "bad traversal inverse");

            let mut h = self.base.clone();
            for i in 0..=lvl {
                h.insert_edge((vars[i], self.values[vals[i]]));
            }
            let ch = Canonical::of(&h);

            // Orderly test: the candidate survives iff it sits in the
            // same orbit as the first canonical-labeling position that
            // meets the extending orbit.
            let q = ch
                .lab
                .iter()
                .copied()
                .find(|&q| self.levels[lvl].orbit[nu.apply(q)])
                .expect("canonical labeling does not meet the extending orbit");
            if !ch.same_orbit(q, vars[lvl]) {
                continue;
            }
            self.levels[lvl].counters.canonical += 1;

            let size = lvl + 1;
            let nvars = vars.iter().map(|&v| nu.apply(v)).collect_vec();
            let aut = ch.aut_order_truncated();
            if size == self.target_length || u64::from(aut) <= self.threshold {
                self.levels[lvl].counters.emitted += 1;
                let vals = vals.iter().map(|&i| self.values[i]).collect();
                return Some(Assignment { vars: nvars, vals, aut });
            }

            // Expand downward, adopting a new prefix position on demand.
            if size + 1 > self.levels.len() {
                let g = self.last_prefix_graph.take().expect("missing last prefix graph");
                let cg = Canonical::of(&g);
                let p = select_next(
                    &cg,
                    &self.variables,
                    &self.prefix,
                    self.levels.last().map(|l| l.trav_ind.as_slice()),
                );
                let g = self.expand_prefix(size, p, g, &cg);
                self.last_prefix_graph = Some(g);
            }
            self.levels[lvl + 1].seed_min = ch.orbit_min(Some(&nu));
            let extension = {
                let next = &self.levels[lvl + 1];
                (0..next.traversal.len())
                    .map(|j| next.traversal.image(j))
                    .find(|&v| next.seed_min[v])
                    .expect("no minimum found in extending orbit")
            };
            let mut evars = nvars;
            evars.push(extension);
            let mut evals = vals;
            evals.push(0);
            self.push_frame(&evars, &evals);
        }
    }

    /// Seed level 0 and the first work frame.
    fn start(&mut self) {
        self.started = true;
        if self.levels.is_empty() {
            let g = self.base.clone();
            let cg = self.base_canonical.clone();
            let p = select_next(&cg, &self.variables, &self.prefix, None);
            let g = self.expand_prefix(0, p, g, &cg);
            self.last_prefix_graph = Some(g);
        }
        self.levels[0].seed_min = self.base_canonical.orbit_min(None);
        let seed = {
            let level = &self.levels[0];
            (0..level.traversal.len())
                .map(|j| level.traversal.image(j))
                .find(|&v| level.seed_min[v])
                .expect("no minimum found for base orbit")
        };
        self.push_frame(&[seed], &[0]);
        for level in &mut self.levels {
            level.counters = LevelCounters::default();
        }
    }

    /// Adopt `p` as the prefix vertex at position `lvl` and build the
    /// level's traversal and orbit state. `g` is the prefix graph at
    /// `lvl` with canonical data `cg`; returns the graph for `lvl + 1`.
    fn expand_prefix(
        &mut self,
        lvl: usize,
        p: usize,
        g: ColoredGraph,
        cg: &Canonical,
    ) -> ColoredGraph {
        debug_assert_eq!(lvl, self.levels.len());
        if lvl == self.prefix.len() {
            self.prefix.push(p);
        } else {
            assert_eq!(self.prefix[lvl], p, "unsupported expansion");
        }
        debug!(
            level = lvl,
            aut = %cg.aut_order_display(),
            orbits = %variable_orbits(cg, &self.variables),
            "prefix graph"
        );

        let traversal = Traversal::build(cg, p);
        let trav_ind = traversal.indicator(self.base.len());
        debug!(
            "prefix[{}] = {}: traversal {:?} [length = {}]",
            lvl + 1,
            p + 1,
            traversal.elements().iter().map(|&v| v + 1).collect_vec(),
            traversal.len(),
        );

        let mut next = g;
        next.insert_edge((p, self.values[0]));
        let cg_next = Canonical::of(&next);
        let orbit = (0..self.base.len()).map(|u| cg_next.same_orbit(p, u)).collect();

        self.levels.push(Level {
            traversal,
            trav_ind,
            orbit,
            seed_min: vec![false; self.base.len()],
            counters: LevelCounters::default(),
        });
        next
    }

    fn push_frame(&mut self, vars: &[usize], vals: &[usize]) {
        debug_assert_eq!(vars.len(), vals.len());
        self.work.extend_from_slice(vars);
        self.work.extend_from_slice(vals);
        self.work.push(vars.len());
    }

    fn pop_frame(&mut self) -> Option<(Vec<usize>, Vec<usize>)> {
        let size = self.work.pop()?;
        let vals = self.work.split_off(self.work.len() - size);
        let vars = self.work.split_off(self.work.len() - size);
        Some((vars, vals))
    }
}

impl Iterator for Reducer {
    type Item = Assignment;

    fn next(&mut self) -> Option<Assignment> {
        self.next_assignment()
    }
}

/// Orbit cells of the variable vertices, 1-indexed, for diagnostics.
fn variable_orbits(canonical: &Canonical, variables: &[usize]) -> String {
    let mut is_var = vec![false; canonical.len()];
    for &v in variables {
        is_var[v] = true;
    }
    canonical
        .orbit_cells()
        .into_iter()
        .filter(|cell| is_var[cell[0]])
        .map(|cell| cell.into_iter().map(|v| v + 1).join(" "))
        .join(" | ")
}

fn repeated_element(xs: &[usize]) -> Option<usize> {
    let sorted = xs.iter().sorted_unstable().collect_vec();
    sorted.windows(2).find(|w| w[0] == w[1]).map(|w| *w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    /// A lone variable vertex with isolated false/true vertices; the
    /// automorphism group is trivial.
    fn lone_variable() -> Instance {
        Instance {
            base: ColoredGraph::empty([0, 1, 2]),
            variables: vec![0],
            var_legends: vec!["1".into()],
            values: vec![1, 2],
            val_legends: vec!["false".into(), "true".into()],
            prefix: vec![0],
            preset_values: vec![],
            target_length: 1,
            threshold: 0,
        }
    }

    /// Companion instance for enumerating simple graphs on `m` nodes:
    /// element vertices, one variable vertex per element pair adjacent
    /// to its two elements, and isolated false/true vertices. The base
    /// automorphisms permute the elements.
    fn pair_instance(m: usize, prefix_pairs: &[(usize, usize)]) -> Instance {
        let pairs = (0..m).tuple_combinations::<(usize, usize)>().collect_vec();
        let n = m + pairs.len() + 2;
        let colors = (0..n).map(|v| match v {
            v if v < m => 0,
            v if v < m + pairs.len() => 1,
            v if v == n - 2 => 2,
            _ => 3,
        });
        let edges = pairs.iter().enumerate().flat_map(|(i, &(a, b))| [(m + i, a), (m + i, b)]);
        let vertex_of = |pair: (usize, usize)| {
            m + pairs.iter().position(|&p| p == pair).unwrap()
        };
        Instance {
            base: ColoredGraph::new(colors, edges),
            variables: (0..pairs.len()).map(|i| m + i).collect(),
            var_legends: pairs.iter().map(|&(a, b)| format!("{a}_{b}")).collect(),
            values: vec![n - 2, n - 1],
            val_legends: vec!["false".into(), "true".into()],
            prefix: prefix_pairs.iter().map(|&p| vertex_of(p)).collect(),
            preset_values: vec![],
            target_length: pairs.len(),
            threshold: 0,
        }
    }

    /// A 4-vertex path with every vertex a variable and isolated
    /// false/true vertices.
    fn path_instance(target_length: usize, threshold: u64) -> Instance {
        Instance {
            base: ColoredGraph::new([0, 0, 0, 0, 1, 2], [(0, 1), (1, 2), (2, 3)]),
            variables: vec![0, 1, 2, 3],
            var_legends: (1..=4).map(|i| i.to_string()).collect(),
            values: vec![4, 5],
            val_legends: vec!["false".into(), "true".into()],
            prefix: vec![],
            preset_values: vec![],
            target_length,
            threshold,
        }
    }

    #[test]
    fn lone_variable_has_two_assignments() {
        let mut r = Reducer::new(lone_variable()).unwrap();
        let a = r.next_assignment().unwrap();
        assert_eq!(a.vars, vec![0]);
        assert_eq!(a.vals, vec![1]);
        assert_eq!(a.aut, 1);
        let b = r.next_assignment().unwrap();
        assert_eq!(b.vars, vec![0]);
        assert_eq!(b.vals, vec![2]);
        assert!(r.next_assignment().is_none());
        // Exhaustion is sticky.
        assert!(r.next_assignment().is_none());
    }

    #[test]
    fn legend_pairs_name_the_assignment() {
        let mut r = Reducer::new(lone_variable()).unwrap();
        let a = r.next_assignment().unwrap();
        assert_eq!(r.legend_pairs(&a), vec![("1", "false")]);
    }

    #[test]
    fn unlabeled_graphs_on_four_nodes() {
        let instance = pair_instance(4, &[(0, 1), (2, 3), (0, 2), (1, 3), (0, 3), (1, 2)]);
        let r = Reducer::new(instance).unwrap();
        assert_eq!(r.count(), 11);
    }

    #[test]
    fn unlabeled_graphs_on_five_nodes() {
        let pairs = (0..5).tuple_combinations::<(usize, usize)>().collect_vec();
        let mut order = pairs.clone();
        order.reverse();
        let r = Reducer::new(pair_instance(5, &order)).unwrap();
        assert_eq!(r.count(), 34);
    }

    #[test]
    fn emissions_are_distinct_full_assignments() {
        let instance = pair_instance(4, &[(0, 1), (2, 3), (0, 2), (1, 3), (0, 3), (1, 2)]);
        let variables = instance.variables.clone();
        let all = Reducer::new(instance).unwrap().collect_vec();
        assert_eq!(all.len(), 11);
        for a in &all {
            assert_eq!(a.len(), 6);
            assert_eq!(a.vars.iter().unique().count(), 6);
            assert!(a.vars.iter().all(|v| variables.contains(v)));
        }
        assert_eq!(all.iter().unique().count(), all.len());
    }

    #[test]
    fn threshold_emits_before_target_length() {
        let mut r = Reducer::new(path_instance(4, 1_000_000_000)).unwrap();
        // The flip-broken path has a trivial automorphism group, so the
        // very first accepted candidates fall under the threshold.
        let a = r.next_assignment().unwrap();
        assert_eq!((a.vars.as_slice(), a.vals.as_slice()), (&[0][..], &[4][..]));
        assert_eq!(a.aut, 1);
        let b = r.next_assignment().unwrap();
        assert_eq!((b.vars.as_slice(), b.vals.as_slice()), (&[0][..], &[5][..]));
        assert!(r.next_assignment().is_none());
    }

    #[test]
    fn path_assignments_at_full_length() {
        // Assignments to the 4 path vertices up to the flip: 2^4 = 16
        // total, 4 flip-symmetric, so (16 + 4) / 2 = 10 classes.
        let r = Reducer::new(path_instance(4, 0)).unwrap();
        assert_eq!(r.count(), 10);
    }

    #[test]
    fn counters_track_emissions() {
        let mut r = Reducer::new(path_instance(4, 0)).unwrap();
        let emitted = (&mut r).count() as u64;
        let totals = r.counters().last().unwrap();
        assert_eq!(totals.emitted, emitted);
        let first = r.counters().next().unwrap();
        assert!(first.generated >= first.canonical);
        assert_eq!(first.emitted, 0);
    }

    #[test]
    fn deterministic_across_runs() {
        let make = || pair_instance(4, &[(0, 1), (2, 3), (0, 2), (1, 3), (0, 3), (1, 2)]);
        let a = Reducer::new(make()).unwrap().collect_vec();
        let b = Reducer::new(make()).unwrap().collect_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_instances() {
        let mut i = lone_variable();
        i.prefix = vec![0, 0];
        i.target_length = 2;
        assert!(matches!(
            Reducer::new(i).unwrap_err(),
            InputError::RepeatedPrefixElement(1)
        ));

        let mut i = lone_variable();
        i.target_length = 0;
        i.prefix = vec![];
        assert!(matches!(Reducer::new(i).unwrap_err(), InputError::NothingToDo));

        let mut i = lone_variable();
        i.prefix = vec![0];
        i.target_length = 0;
        assert!(matches!(Reducer::new(i).unwrap_err(), InputError::PrefixExceedsTarget));

        let mut i = path_instance(4, 0);
        i.variables = vec![0, 1, 2];
        i.var_legends.pop();
        assert!(matches!(
            Reducer::new(i).unwrap_err(),
            InputError::VariablesNotOrbitUnion(_, _)
        ));

        // Two same-colored isolated value vertices share an orbit.
        let i = Instance {
            base: ColoredGraph::empty([0, 1, 1]),
            variables: vec![0],
            var_legends: vec!["1".into()],
            values: vec![1, 2],
            val_legends: vec!["false".into(), "true".into()],
            prefix: vec![0],
            preset_values: vec![],
            target_length: 1,
            threshold: 0,
        };
        assert!(matches!(Reducer::new(i).unwrap_err(), InputError::ValueNotFixed(2)));
    }
}
