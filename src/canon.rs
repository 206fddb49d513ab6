//! Glue to the canonical-labeling backend (sparse nauty).
//!
//! One fused call per graph yields everything the search consumes: the
//! canonical labeling, the orbit partition, a generating set of the
//! automorphism group in a stable order, and the stabilizer index
//! sequence whose product is the group order.

use crate::graph::ColoredGraph;
use crate::perm::Perm;
use itertools::Itertools;
use nauty_Traces_sys::{
    nauty_check, optionblk, sparsegraph, sparsenauty, statsblk, SparseGraph, FALSE,
    NAUTYVERSIONID, SETWORDSNEEDED, TRUE, WORDSIZE,
};
use std::cell::RefCell;
use std::os::raw::c_int;

/// Truncation cap for automorphism-group order accounting.
pub const AUT_ORDER_CAP: u64 = i32::MAX as u64;

/// Canonical-form data for one colored graph. Deterministic given the
/// graph and its color partition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Canonical {
    /// Canonical labeling: `lab[t]` is the vertex in canonical position `t`.
    pub lab: Vec<usize>,
    /// Orbit partition: `orbit[v]` is the least vertex in the orbit of `v`.
    pub orbit: Vec<usize>,
    /// Generators of the automorphism group, in the backend's emission order.
    pub generators: Vec<Perm>,
    /// Stabilizer indices; their product is the automorphism group order.
    pub stab_indices: Vec<u64>,
}

thread_local! {
    /// Collected via static C callbacks during a backend call:
    static GENERATORS: RefCell<Vec<Perm>> = const { RefCell::new(Vec::new()) };
    static STAB_INDICES: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
    /// Avoid canonized graph allocation for every call, nauty allows reuse:
    static CG: RefCell<sparsegraph> = RefCell::new(sparsegraph::default());
}

extern "C" fn record_generator(
    ordinal: c_int,
    perm: *mut c_int,
    _orbits: *mut c_int,
    _numorbits: c_int,
    _stabnode: c_int,
    n: c_int,
) {
    let generator = Perm::from(
        (0..n).map(|i| unsafe { *perm.offset(i as isize) } as usize).collect_vec(),
    );
    GENERATORS.with(|g| {
        let mut generators = g.borrow_mut();
        generators.push(generator);
        assert_eq!(ordinal as usize, generators.len());
    });
}

extern "C" fn record_stab_index(
    _lab: *mut c_int,
    _ptn: *mut c_int,
    _level: c_int,
    _orbits: *mut c_int,
    _stats: *mut statsblk,
    _tv: c_int,
    index: c_int,
    _tcellsize: c_int,
    _numcells: c_int,
    _childcount: c_int,
    _n: c_int,
) {
    STAB_INDICES.with(|s| s.borrow_mut().push(index as u64));
}

impl Canonical {
    pub fn of(g: &ColoredGraph) -> Self {
        let n = g.len();
        if n == 0 {
            return Self { lab: vec![], orbit: vec![], generators: vec![], stab_indices: vec![] };
        }

        let (mut lab, mut ptn) = g.color_cells();
        let mut orbit_reps = vec![0 as c_int; n];

        unsafe {
            nauty_check(
                WORDSIZE as c_int,
                SETWORDSNEEDED(n) as c_int,
                n as c_int,
                NAUTYVERSIONID as c_int,
            );
        }

        let sg = &mut to_nauty(g);
        let lab_ptr = lab.as_mut_ptr();
        let ptn_ptr = ptn.as_mut_ptr();
        let orbs_ptr = orbit_reps.as_mut_ptr();

        let options = &mut optionblk::default_sparse();
        options.getcanon = TRUE;
        options.defaultptn = FALSE;
        options.userautomproc = Some(record_generator);
        options.userlevelproc = Some(record_stab_index);
        let stats = &mut statsblk::default();

        CG.with(|cg| unsafe {
            sparsenauty(&mut sg.into(), lab_ptr, ptn_ptr, orbs_ptr, options, stats, &mut *cg.borrow_mut())
        });

        let generators = GENERATORS.with(|g| g.take());
        let stab_indices = STAB_INDICES.with(|s| s.take());
        assert!(
            stab_indices.iter().all(|&i| i >= 1),
            "canonical labeler produced a bad stabilizer index sequence"
        );

        let lab = lab.into_iter().map(|x| x as usize).collect_vec();
        let orbit = least_representatives(&orbit_reps);
        Self { lab, orbit, generators, stab_indices }
    }

    pub fn len(&self) -> usize {
        self.orbit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orbit.is_empty()
    }

    pub fn same_orbit(&self, i: usize, j: usize) -> bool {
        self.orbit[i] == self.orbit[j]
    }

    /// Group order as a saturating product of the stabilizer indices,
    /// clipped at [`AUT_ORDER_CAP`] once the running product exceeds it.
    pub fn aut_order_truncated(&self) -> u32 {
        let mut order: u64 = 1;
        for &idx in &self.stab_indices {
            order = order.saturating_mul(idx);
            if order >= AUT_ORDER_CAP {
                return AUT_ORDER_CAP as u32;
            }
        }
        order as u32
    }

    /// Group order for diagnostics; a `+` marks a clipped value.
    pub fn aut_order_display(&self) -> String {
        let order = self.aut_order_truncated();
        if u64::from(order) == AUT_ORDER_CAP { format!("{order}+") } else { order.to_string() }
    }

    /// Indicator of the least-indexed vertex per orbit, seen through an
    /// optional relabeling: bit `relabel(v)` is set iff `v` is the least
    /// element of its orbit.
    pub fn orbit_min(&self, relabel: Option<&Perm>) -> Vec<bool> {
        let mut ind = vec![false; self.len()];
        for (v, &rep) in self.orbit.iter().enumerate() {
            if v == rep {
                ind[relabel.map_or(v, |nu| nu.apply(v))] = true;
            }
        }
        ind
    }

    /// Orbits as cells of ascending vertices, ordered by least element.
    pub fn orbit_cells(&self) -> Vec<Vec<usize>> {
        let mut cells: Vec<Vec<usize>> = vec![];
        for v in (0..self.len()).sorted_unstable_by_key(|&v| (self.orbit[v], v)) {
            match cells.last_mut() {
                Some(cell) if self.orbit[cell[0]] == self.orbit[v] => cell.push(v),
                _ => cells.push(vec![v]),
            }
        }
        cells
    }
}

/// Deterministic sparse export: CSR with sorted neighbor lists, so the
/// backend sees an identical graph on every call.
fn to_nauty(g: &ColoredGraph) -> SparseGraph {
    let d = g.degrees().map(|x| x as c_int).collect_vec();
    let v = d
        .iter()
        .map(|d| *d as usize)
        .scan(0, |acc, d| {
            let out = Some(*acc);
            *acc += d;
            out
        })
        .collect();
    let e = (0..g.len())
        .flat_map(|u| g.neighbors_sorted(u))
        .map(|x| x as c_int)
        .collect();
    SparseGraph { v, d, e }
}

/// Normalize an orbit array so every entry is the least vertex of its orbit.
fn least_representatives(reps: &[c_int]) -> Vec<usize> {
    let mut least = vec![usize::MAX; reps.len()];
    for (v, &r) in reps.iter().enumerate() {
        let r = r as usize;
        if v < least[r] {
            least[r] = v;
        }
    }
    reps.iter().map(|&r| least[r as usize]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path4() -> ColoredGraph {
        ColoredGraph::new([0, 0, 0, 0], [(0, 1), (1, 2), (2, 3)])
    }

    fn cycle4() -> ColoredGraph {
        ColoredGraph::new([0, 0, 0, 0], [(0, 1), (1, 2), (2, 3), (3, 0)])
    }

    fn is_automorphism(g: &ColoredGraph, p: &Perm) -> bool {
        (0..g.len()).all(|v| g.color(v) == g.color(p.apply(v)))
            && g.edges().iter().all(|&(i, j)| g.has_edge((p.apply(i), p.apply(j))))
    }

    #[test]
    fn path_orbits_and_order() {
        let c = Canonical::of(&path4());
        assert_eq!(c.orbit, vec![0, 1, 1, 0]);
        assert_eq!(c.aut_order_truncated(), 2);
        assert!(c.generators.iter().all(|p| is_automorphism(&path4(), p)));
    }

    #[test]
    fn cycle_orbits_and_order() {
        let c = Canonical::of(&cycle4());
        assert_eq!(c.orbit, vec![0; 4]);
        assert_eq!(c.aut_order_truncated(), 8);
        assert!(c.generators.iter().all(|p| is_automorphism(&cycle4(), p)));
    }

    #[test]
    fn colors_break_symmetry() {
        let g = ColoredGraph::new([0, 1, 1, 0], [(0, 1), (1, 2), (2, 3)]);
        let c = Canonical::of(&g);
        assert_eq!(c.orbit, vec![0, 1, 1, 0]);

        let g = ColoredGraph::new([0, 1, 0, 0], [(0, 1), (1, 2), (2, 3)]);
        let c = Canonical::of(&g);
        assert_eq!(c.aut_order_truncated(), 1);
        assert_eq!(c.orbit, vec![0, 1, 2, 3]);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let g = cycle4();
        let a = Canonical::of(&g);
        let b = Canonical::of(&g);
        assert_eq!(a, b);
    }

    #[test]
    fn orbit_min_marks_one_vertex_per_orbit() {
        let c = Canonical::of(&path4());
        assert_eq!(c.orbit_min(None), vec![true, true, false, false]);

        let nu = Perm::from(vec![3, 2, 1, 0]);
        assert_eq!(c.orbit_min(Some(&nu)), vec![false, false, true, true]);
    }

    #[test]
    fn orbit_cells_ascending() {
        let c = Canonical::of(&path4());
        assert_eq!(c.orbit_cells(), vec![vec![0, 3], vec![1, 2]]);
    }

    #[test]
    fn canonical_labeling_is_an_isomorphism_invariant() {
        // The same path with relabeled vertices canonizes to the same edge set.
        let g1 = path4();
        let g2 = ColoredGraph::new([0, 0, 0, 0], [(2, 1), (1, 3), (3, 0)]);
        let canonize = |g: &ColoredGraph| {
            let pos = Perm::from(Canonical::of(g).lab).inverse();
            let mut edges = g
                .edges()
                .into_iter()
                .map(|(i, j)| {
                    let (a, b) = (pos.apply(i), pos.apply(j));
                    (a.min(b), a.max(b))
                })
                .collect::<Vec<_>>();
            edges.sort_unstable();
            edges
        };
        assert_eq!(canonize(&g1), canonize(&g2));
    }

    #[test]
    fn empty_graph() {
        let c = Canonical::of(&ColoredGraph::empty([]));
        assert!(c.is_empty());
        assert_eq!(c.aut_order_truncated(), 1);
    }
}
