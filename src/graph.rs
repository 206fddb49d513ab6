//! Vertex-colored undirected graphs on `{0..n-1}`.

use fxhash::FxHashSet;
use itertools::Itertools;
use std::os::raw::c_int;

pub type NeighborSet = FxHashSet<usize>;

/// Undirected graph with one color per vertex. Vertices are implicit
/// indices; adjacency is mirrored on both endpoints.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColoredGraph {
    nodes: Vec<(usize, NeighborSet)>,
}

impl ColoredGraph {
    pub fn empty(colors: impl IntoIterator<Item = usize>) -> Self {
        Self { nodes: colors.into_iter().map(|c| (c, NeighborSet::default())).collect() }
    }

    pub fn new(
        colors: impl IntoIterator<Item = usize>,
        edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> Self {
        let mut g = Self::empty(colors);
        for e in edges {
            assert!(g.insert_edge(e), "duplicate edge {:?}", e);
        }
        g
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn color(&self, v: usize) -> usize {
        self.nodes[v].0
    }

    pub fn colors(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().map(|(c, _)| *c)
    }

    /// Returns true if the edge was inserted, false if it already existed.
    pub fn insert_edge(&mut self, (i, j): (usize, usize)) -> bool {
        assert!(i != j, "self-loop at vertex {}", i);
        assert!(i < self.len() && j < self.len());
        let fresh = self.nodes[i].1.insert(j);
        assert_eq!(fresh, self.nodes[j].1.insert(i));
        fresh
    }

    pub fn has_edge(&self, (i, j): (usize, usize)) -> bool {
        self.nodes[i].1.contains(&j)
    }

    pub fn degrees(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().map(|(_, ne)| ne.len())
    }

    pub fn num_edges(&self) -> usize {
        self.degrees().sum::<usize>() / 2
    }

    pub fn neighbors_sorted(&self, v: usize) -> Vec<usize> {
        self.nodes[v].1.iter().cloned().sorted_unstable().collect()
    }

    /// Edges as `(i, j)` with `i < j`, in lexicographic order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.nodes
            .iter()
            .enumerate()
            .flat_map(|(i, (_, ne))| ne.iter().filter(move |&&j| i < j).map(move |&j| (i, j)))
            .sorted_unstable()
            .collect()
    }

    /// Color partition in labeler form: vertices sorted into color cells
    /// (ties by index), with `ptn[i] = 0` closing each cell.
    pub fn color_cells(&self) -> (Vec<c_int>, Vec<c_int>) {
        let lab = (0..self.len()).sorted_unstable_by_key(|&v| (self.color(v), v)).collect_vec();
        let ptn = lab
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let closes = i + 1 == lab.len() || self.color(lab[i + 1]) != self.color(v);
                if closes { 0 } else { 1 }
            })
            .collect_vec();
        (lab.into_iter().map(|v| v as c_int).collect(), ptn)
    }
}
