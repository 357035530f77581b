//! File dependency graph.
//!
//! Edges point from a dependent to the file it requires. The graph is a
//! `petgraph` stable graph plus a path index, so forward queries follow
//! outgoing edges and reverse queries follow incoming ones over the same edge
//! set. Query results are ordered sets and recompile orders are
//! deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::Direction::{self, Incoming, Outgoing};
use petgraph::algo::condensation;
use petgraph::graph::DiGraph;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, EdgeRef, Reversed};

use crate::error::Result;
use crate::path::SourcePath;


/// Persistable form of the graph: dependent path -> dependency paths.
///
/// Only forward edges are stored; the reverse view is rebuilt on load.
pub type DependencySnapshot = BTreeMap<String, Vec<String>>;

/// A recompile order together with the nodes emitted to break cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Ordering {
    pub files: Vec<SourcePath>,
    pub cycle_breaks: Vec<SourcePath>,
}

/// Directed graph of source files.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// dependent -> dependency edges
    graph: StableDiGraph<SourcePath, ()>,
    /// path -> node in `graph`
    nodes: HashMap<SourcePath, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, file: &SourcePath) -> Option<NodeIndex> {
        self.nodes.get(file).copied()
    }

    fn ensure_node(&mut self, file: SourcePath) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&file) {
            return index;
        }
        let index = self.graph.add_node(file.clone());
        self.nodes.insert(file, index);
        index
    }

    /// Records that `dependent` requires `dependency`.
    ///
    /// Idempotent. Returns `true` if the edge was not present before.
    pub fn add_dependency(&mut self, dependent: SourcePath, dependency: SourcePath) -> bool {
        let from = self.ensure_node(dependent);
        let to = self.ensure_node(dependency);
        if self.graph.contains_edge(from, to) {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    fn neighbors(&self, file: &SourcePath, direction: Direction) -> impl Iterator<Item = &SourcePath> {
        self.node(file)
            .into_iter()
            .flat_map(move |index| self.graph.neighbors_directed(index, direction))
            .map(move |neighbor| &self.graph[neighbor])
    }

    /// Direct dependencies of `file`; empty if none are recorded.
    pub fn dependencies(&self, file: &SourcePath) -> BTreeSet<SourcePath> {
        self.neighbors(file, Outgoing).cloned().collect()
    }

    /// Files that directly require `file`.
    pub fn direct_dependents(&self, file: &SourcePath) -> BTreeSet<SourcePath> {
        self.neighbors(file, Incoming).cloned().collect()
    }

    /// Every file that transitively requires `file`, excluding `file` itself.
    ///
    /// Terminates on cyclic input.
    pub fn all_dependents(&self, file: &SourcePath) -> BTreeSet<SourcePath> {
        let Some(start) = self.node(file) else {
            return BTreeSet::new();
        };

        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        let mut found = BTreeSet::new();
        while let Some(index) = bfs.next(reversed) {
            if index != start {
                found.insert(self.graph[index].clone());
            }
        }
        found
    }

    /// Orders `seeds` and all their transitive dependents so that every
    /// dependency precedes its dependents.
    ///
    /// Each file appears exactly once. Files on a common cycle are kept
    /// together; within such a cycle the lexically smallest pending file is
    /// emitted to break it. Edges that are not part of a cycle are always
    /// respected.
    pub fn invalidation_order(&self, seeds: &[SourcePath]) -> Vec<SourcePath> {
        self.ordering(seeds).files
    }

    pub(crate) fn ordering<'a>(&'a self, seeds: &'a [SourcePath]) -> Ordering {
        let affected = self.reachable_from(seeds);

        // Affected subgraph with edges from dependency to dependent, so a
        // topological order of it is a recompile order.
        let mut subgraph: DiGraph<&SourcePath, ()> = DiGraph::with_capacity(affected.len(), 0);
        let mut index: HashMap<&SourcePath, NodeIndex> = HashMap::with_capacity(affected.len());
        for &file in &affected {
            index.insert(file, subgraph.add_node(file));
        }
        for &file in &affected {
            let Some(&to) = index.get(file) else {
                continue;
            };
            for dependency in self.neighbors(file, Outgoing) {
                if let Some(&from) = index.get(dependency) {
                    subgraph.add_edge(from, to, ());
                }
            }
        }

        // One node per strongly connected component; acyclic by construction.
        let components = condensation(subgraph, true);
        let mut waiting: Vec<usize> = components
            .node_indices()
            .map(|component| components.neighbors_directed(component, Incoming).count())
            .collect();

        let mut ready: BTreeSet<(&SourcePath, NodeIndex)> = components
            .node_indices()
            .filter(|component| waiting[component.index()] == 0)
            .filter_map(|component| {
                first_member(&components[component]).map(|key| (key, component))
            })
            .collect();

        let mut ordering = Ordering::default();
        while let Some((_, component)) = ready.pop_first() {
            self.emit_component(&components[component], &mut ordering);

            for next in components.neighbors_directed(component, Outgoing) {
                let slot = &mut waiting[next.index()];
                *slot = slot.saturating_sub(1);
                if *slot == 0
                    && let Some(key) = first_member(&components[next])
                {
                    ready.insert((key, next));
                }
            }
        }

        ordering
    }

    /// Emits one strongly connected component.
    ///
    /// A multi-file component is a cycle: its files are ordered by the edges
    /// among them, and whenever none is ready the lexically smallest pending
    /// file is emitted and recorded as a break.
    fn emit_component<'a>(&'a self, members: &[&'a SourcePath], ordering: &mut Ordering) {
        if let [file] = members {
            ordering.files.push((*file).clone());
            return;
        }

        let in_component: BTreeSet<&SourcePath> = members.iter().copied().collect();

        // Number of dependencies inside the component each file still waits on.
        let mut pending: BTreeMap<&SourcePath, usize> = in_component
            .iter()
            .map(|&file| {
                let waiting = self
                    .neighbors(file, Outgoing)
                    .filter(|dependency| in_component.contains(dependency))
                    .count();
                (file, waiting)
            })
            .collect();

        let mut ready: BTreeSet<&SourcePath> = pending
            .iter()
            .filter(|&(_, &waiting)| waiting == 0)
            .map(|(&file, _)| file)
            .collect();

        while !pending.is_empty() {
            let next = match ready.pop_first() {
                Some(file) => file,
                None => {
                    let Some((&file, _)) = pending.first_key_value() else {
                        break;
                    };
                    ordering.cycle_breaks.push(file.clone());
                    file
                }
            };

            pending.remove(next);
            ordering.files.push(next.clone());

            for dependent in self.neighbors(next, Incoming) {
                if let Some(waiting) = pending.get_mut(dependent) {
                    *waiting = waiting.saturating_sub(1);
                    if *waiting == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }
    }

    /// Seeds plus everything reachable from them over reverse edges.
    fn reachable_from<'a>(&'a self, seeds: &'a [SourcePath]) -> BTreeSet<&'a SourcePath> {
        let mut visited: BTreeSet<&SourcePath> = seeds.iter().collect();
        let reversed = Reversed(&self.graph);

        for start in seeds.iter().filter_map(|seed| self.node(seed)) {
            let mut bfs = Bfs::new(reversed, start);
            while let Some(index) = bfs.next(reversed) {
                visited.insert(&self.graph[index]);
            }
        }

        visited
    }

    /// Deletes `file` and every edge touching it, in either direction.
    ///
    /// Returns `true` if the file was a node of the graph.
    pub fn remove(&mut self, file: &SourcePath) -> bool {
        match self.nodes.remove(file) {
            Some(index) => {
                self.graph.remove_node(index);
                true
            }
            None => false,
        }
    }

    /// Forgets the recorded dependencies of `file`.
    ///
    /// Edges where `file` is a dependency of other files are kept, and `file`
    /// stays a node of the graph.
    pub fn clear_dependencies(&mut self, file: &SourcePath) {
        let Some(index) = self.node(file) else {
            return;
        };

        let outgoing: Vec<_> = self
            .graph
            .edges_directed(index, Outgoing)
            .map(|edge| edge.id())
            .collect();
        for edge in outgoing {
            self.graph.remove_edge(edge);
        }
    }

    /// `true` if `file` has at least one recorded dependency.
    pub fn has_dependencies(&self, file: &SourcePath) -> bool {
        self.neighbors(file, Outgoing).next().is_some()
    }

    /// Every file that is a node of the graph.
    pub fn all_files(&self) -> BTreeSet<SourcePath> {
        self.nodes.keys().cloned().collect()
    }

    /// Number of recorded edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` if no file has ever been recorded.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every node and edge.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
    }

    /// Forward adjacency as plain strings, ready to persist.
    ///
    /// Files only ever seen as a dependency are implied by the edges; every
    /// other node gets an entry, so files without edges survive a reload.
    pub fn to_snapshot(&self) -> DependencySnapshot {
        self.graph
            .node_indices()
            .filter_map(|index| {
                let dependencies: BTreeSet<&str> = self
                    .graph
                    .neighbors_directed(index, Outgoing)
                    .map(|neighbor| self.graph[neighbor].as_str())
                    .collect();
                let referenced = self.graph.neighbors_directed(index, Incoming).next().is_some();
                if dependencies.is_empty() && referenced {
                    return None;
                }
                Some((
                    self.graph[index].as_str().to_string(),
                    dependencies.into_iter().map(str::to_string).collect(),
                ))
            })
            .collect()
    }

    /// Rebuilds a graph, including its reverse view, from a snapshot.
    pub fn from_snapshot(snapshot: &DependencySnapshot) -> Result<Self> {
        let mut graph = Self::new();
        for (dependent, deps) in snapshot {
            let dependent = SourcePath::new(dependent)?;
            graph.ensure_node(dependent.clone());
            for dependency in deps {
                graph.add_dependency(dependent.clone(), SourcePath::new(dependency)?);
            }
        }
        Ok(graph)
    }
}

/// Lexically smallest file of a component, used to order ready components.
fn first_member<'a>(members: &[&'a SourcePath]) -> Option<&'a SourcePath> {
    members.iter().min().copied()
}
