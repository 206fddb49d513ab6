//! Orbit machinery for the prefix search: transversals of a root
//! vertex's orbit, and the adaptive next-vertex selector.

use crate::canon::Canonical;
use crate::perm::Perm;
use itertools::Itertools;

/// Transversal of the orbit of a root vertex: one group element per
/// orbit element, carrying the root to it. The permutation for the root
/// itself is the identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Traversal {
    root: usize,
    elements: Vec<usize>,
    perms: Vec<Perm>,
}

impl Traversal {
    /// Build the transversal by sweeping the generator list, composing
    /// outward from elements already reached. Panics if the generators
    /// cannot cover the orbit, which violates the labeler contract.
    pub fn build(canonical: &Canonical, root: usize) -> Self {
        let n = canonical.len();
        assert!(root < n, "bad root");
        let elements = (0..n).filter(|&v| canonical.same_orbit(v, root)).collect_vec();

        let mut position = vec![None; n];
        for (j, &v) in elements.iter().enumerate() {
            position[v] = Some(j);
        }

        let mut perms: Vec<Option<Perm>> = vec![None; elements.len()];
        perms[position[root].unwrap()] = Some(Perm::identity(n));
        let mut remaining = elements.len() - 1;
        while remaining > 0 {
            let mut progressed = false;
            for gen in &canonical.generators {
                for j in 0..elements.len() {
                    if perms[j].is_none() {
                        continue;
                    }
                    let v = gen.apply(elements[j]);
                    let q = position[v].expect("generator maps the orbit outside itself");
                    if perms[q].is_none() {
                        let composed = gen * perms[j].as_ref().unwrap();
                        perms[q] = Some(composed);
                        remaining -= 1;
                        progressed = true;
                    }
                }
            }
            assert!(
                progressed,
                "automorphism generators do not cover the orbit of vertex {}",
                root
            );
        }

        let perms = perms.into_iter().map(|p| p.unwrap()).collect_vec();
        for (j, tau) in perms.iter().enumerate() {
            assert_eq!(tau.apply(root), elements[j], "bad traversal");
        }
        Self { root, elements, perms }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Orbit elements in ascending order.
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    /// The `j`-th orbit element, i.e. the image of the root under [`Self::perm`].
    pub fn image(&self, j: usize) -> usize {
        self.elements[j]
    }

    pub fn perm(&self, j: usize) -> &Perm {
        &self.perms[j]
    }

    /// Position `j` with `image(j) == v`, if `v` lies in the orbit.
    pub fn position_of_image(&self, v: usize) -> Option<usize> {
        self.elements.binary_search(&v).ok()
    }

    /// Boolean indicator of the orbit over the whole vertex set.
    pub fn indicator(&self, n: usize) -> Vec<bool> {
        let mut ind = vec![false; n];
        for &v in &self.elements {
            ind[v] = true;
        }
        ind
    }
}

/// Pick the next prefix vertex among `variables` not yet in `prefix`.
///
/// Preference order: any vertex of the previous level's traversal
/// (smallest index); otherwise the longest orbit that admits a generator
/// with both a fixed and a moved point among its variable vertices
/// (first scanned wins on ties); otherwise the first eligible orbit's
/// least vertex. Panics when nothing is eligible.
pub fn select_next(
    canonical: &Canonical,
    variables: &[usize],
    prefix: &[usize],
    prev_traversal: Option<&[bool]>,
) -> usize {
    let n = canonical.len();
    let mut is_variable = vec![false; n];
    for &v in variables {
        is_variable[v] = true;
    }
    let mut eligible = is_variable.clone();
    for &p in prefix {
        eligible[p] = false;
    }

    // Keep extending within the orbit being traversed, if any.
    if let Some(t) = prev_traversal {
        if let Some(v) = (0..n).find(|&v| eligible[v] && t[v]) {
            return v;
        }
    }

    let mut first_eligible = None;
    let mut best: Option<(usize, usize)> = None;
    for cell in canonical.orbit_cells() {
        if !eligible[cell[0]] {
            continue;
        }
        first_eligible.get_or_insert(cell[0]);
        let cell_vars = cell.iter().cloned().filter(|&v| is_variable[v]).collect_vec();
        let good = canonical.generators.iter().any(|g| {
            cell_vars.iter().any(|&z| g.apply(z) == z) && cell_vars.iter().any(|&z| g.apply(z) != z)
        });
        if good && best.is_none_or(|(len, _)| cell.len() > len) {
            best = Some((cell.len(), cell[0]));
        }
    }
    if let Some((_, v)) = best {
        return v;
    }
    first_eligible.expect("no eligible orbit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ColoredGraph;

    fn is_automorphism(g: &ColoredGraph, p: &Perm) -> bool {
        (0..g.len()).all(|v| g.color(v) == g.color(p.apply(v)))
            && g.edges().iter().all(|&(i, j)| g.has_edge((p.apply(i), p.apply(j))))
    }

    fn cycle5() -> ColoredGraph {
        ColoredGraph::new([0; 5], [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)])
    }

    /// Element vertices `0..3` and one vertex per pair, each adjacent to
    /// its two elements. Its automorphisms permute the three elements.
    fn triangle_pairs() -> ColoredGraph {
        ColoredGraph::new(
            [0, 0, 0, 1, 1, 1],
            [(3, 0), (3, 1), (4, 0), (4, 2), (5, 1), (5, 2)],
        )
    }

    #[test]
    fn traversal_carries_root_to_each_element() {
        let g = cycle5();
        let c = Canonical::of(&g);
        let t = Traversal::build(&c, 0);
        assert_eq!(t.elements(), &[0, 1, 2, 3, 4]);
        assert!(t.perm(t.position_of_image(0).unwrap()).is_identity());
        for j in 0..t.len() {
            assert_eq!(t.perm(j).apply(0), t.image(j));
            assert!(is_automorphism(&g, t.perm(j)));
        }
    }

    #[test]
    fn traversal_of_fixed_vertex_is_identity_only() {
        let g = ColoredGraph::new([0, 0, 1], [(0, 2), (1, 2)]);
        let c = Canonical::of(&g);
        let t = Traversal::build(&c, 2);
        assert_eq!(t.elements(), &[2]);
        assert!(t.perm(0).is_identity());
        assert_eq!(t.indicator(3), vec![false, false, true]);
    }

    #[test]
    fn selector_prefers_previous_traversal() {
        let g = cycle5();
        let c = Canonical::of(&g);
        let prev = vec![false, false, true, true, false];
        assert_eq!(select_next(&c, &[0, 1, 2, 3, 4], &[2], Some(&prev)), 3);
    }

    #[test]
    fn selector_picks_good_orbit() {
        // A transposition of two elements fixes one pair vertex and
        // moves the other two, so the pair orbit is preferred.
        let g = triangle_pairs();
        let c = Canonical::of(&g);
        assert_eq!(select_next(&c, &[3, 4, 5], &[], None), 3);
    }

    #[test]
    fn selector_falls_back_to_first_eligible() {
        // On a path, the flip moves every vertex of every orbit, so no
        // orbit is good and the least eligible vertex wins.
        let g = ColoredGraph::new([0; 4], [(0, 1), (1, 2), (2, 3)]);
        let c = Canonical::of(&g);
        assert_eq!(select_next(&c, &[0, 1, 2, 3], &[], None), 0);
        assert_eq!(select_next(&c, &[0, 1, 2, 3], &[0], None), 1);
    }
}
