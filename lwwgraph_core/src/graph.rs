use crate::edge::Edge;
use crate::operation::Operation;
use lwwgraph_clock::Clock;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    hash::Hash,
};

/// The public contract of an LWW-element-graph replica.
///
/// Mutators append to the replica's log, stamping a timestamp from the
/// clock when the caller doesn't supply one, and return the recorded
/// [`Operation`] so it can be shipped to peers. [`Graph::apply`] is the
/// counterpart used to ingest operations received from elsewhere; the
/// materializer is oblivious to an operation's origin, which is what makes
/// the structure a CRDT.
pub trait Graph<T> {
    fn add_vertex(&mut self, v: T, ts: Option<i64>) -> Operation<T>;
    fn remove_vertex(&mut self, v: T, ts: Option<i64>) -> Operation<T>;
    fn add_edge(&mut self, e: Edge<T>, ts: Option<i64>) -> Operation<T>;
    fn remove_edge(&mut self, e: Edge<T>, ts: Option<i64>) -> Operation<T>;

    /// Record an operation received from a peer (or re-delivered locally).
    /// Idempotent: delivering the same `(op, arg, ts)` twice has no further
    /// effect once materialized.
    fn apply(&mut self, op: Operation<T>);

    fn contains_vertex(&self, v: &T) -> bool;
    fn contains_edge(&self, e: &Edge<T>) -> bool;
    fn vertices(&self) -> HashSet<T>;
    fn edges(&self) -> HashSet<Edge<T>>;

    /// Connected components of the live graph, each a vertex-to-neighbors
    /// adjacency map. Component indices and iteration order are not part of
    /// the observable API: compare results as multisets of adjacency maps.
    fn components(&self) -> Vec<HashMap<T, HashSet<T>>>;
}

/// The materialized `(V, E, K)` state derived from a replica's log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Materialized<T> {
    pub vertices: HashSet<T>,
    pub edges: HashSet<Edge<T>>,
    pub components: Vec<HashMap<T, HashSet<T>>>,
}

/// A simplistic LWW-element-graph replica that records every operation to
/// an in-memory log. There is no garbage collection, no log compression, no
/// persistence to disk.
///
/// Queries recompute `(V, E, K)` from scratch by sorting the log, which
/// costs `O(N log N)` in the log length. Callers needing concurrent access
/// from multiple threads must wrap a replica in an external lock; this type
/// provides no internal synchronization.
#[derive(Debug)]
pub struct LogGraph<T, C> {
    clock: C,
    log: Vec<Operation<T>>,
}

impl<T, C> LogGraph<T, C>
where
    C: Clock,
{
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            log: Vec::new(),
        }
    }

    fn stamp(&self, ts: Option<i64>) -> i64 {
        ts.unwrap_or_else(|| self.clock.nanoseconds())
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }
}

impl<T, C> LogGraph<T, C>
where
    T: Clone + Eq + Hash,
{
    /// Sort the log and fold it into `(V, E, K)`. See the canonical
    /// materialization algorithm: operations are ordered by `(ts asc,
    /// kind-priority asc)` so that, within a timestamp, edge deletions
    /// precede vertex deletions, which precede vertex additions, which
    /// precede edge additions.
    pub fn materialize(&self) -> Materialized<T> {
        let mut ordered: Vec<&Operation<T>> = self.log.iter().collect();
        ordered.sort_by_key(|op| (op.ts(), op.kind().priority()));

        let mut last_add_v: HashMap<T, i64> = HashMap::new();
        let mut last_del_v: HashMap<T, i64> = HashMap::new();
        let mut last_del_e: HashMap<Edge<T>, i64> = HashMap::new();
        let mut vertices: HashSet<T> = HashSet::new();
        let mut edges: HashSet<Edge<T>> = HashSet::new();

        for op in ordered {
            match op {
                Operation::AddVertex { arg, ts } => {
                    last_add_v.insert(arg.clone(), *ts);
                    let dominating_del = last_del_v.get(arg).copied().unwrap_or(ts.saturating_sub(1));
                    if dominating_del < *ts {
                        vertices.insert(arg.clone());
                    }
                }
                Operation::RemoveVertex { arg, ts } => {
                    last_del_v.insert(arg.clone(), *ts);
                    if vertices.remove(arg) {
                        // Cascade: retract every edge incident to `arg`,
                        // and stamp a synthetic DelE so a later AddV can't
                        // resurrect it without an explicit, later AddE.
                        let incident: Vec<Edge<T>> = edges
                            .iter()
                            .filter(|e| e.contains(arg))
                            .cloned()
                            .collect();
                        for e in incident {
                            edges.remove(&e);
                            last_del_e.insert(e, *ts);
                        }
                    }
                }
                Operation::AddEdge { arg, ts } => {
                    let (a, b) = arg.vertices();
                    let endpoint_alive = |x: &T| match last_add_v.get(x) {
                        None => false,
                        Some(add_ts) => {
                            let del_ts = last_del_v.get(x).copied().unwrap_or(add_ts.saturating_sub(1));
                            *add_ts > del_ts
                        }
                    };
                    let dominating_del_e = last_del_e.get(arg).copied().unwrap_or(ts.saturating_sub(1));
                    if endpoint_alive(a) && endpoint_alive(b) && dominating_del_e < *ts {
                        edges.insert(arg.clone());
                    }
                }
                Operation::RemoveEdge { arg, ts } => {
                    last_del_e.insert(arg.clone(), *ts);
                    edges.remove(arg);
                }
            }
        }

        let components = components_of(&vertices, &edges);
        Materialized {
            vertices,
            edges,
            components,
        }
    }
}

impl<T, C> Graph<T> for LogGraph<T, C>
where
    T: Clone + Eq + Hash,
    C: Clock,
{
    fn add_vertex(&mut self, v: T, ts: Option<i64>) -> Operation<T> {
        let op = Operation::AddVertex {
            arg: v,
            ts: self.stamp(ts),
        };
        self.log.push(op.clone());
        op
    }

    fn remove_vertex(&mut self, v: T, ts: Option<i64>) -> Operation<T> {
        let op = Operation::RemoveVertex {
            arg: v,
            ts: self.stamp(ts),
        };
        self.log.push(op.clone());
        op
    }

    fn add_edge(&mut self, e: Edge<T>, ts: Option<i64>) -> Operation<T> {
        let op = Operation::AddEdge {
            arg: e,
            ts: self.stamp(ts),
        };
        self.log.push(op.clone());
        op
    }

    fn remove_edge(&mut self, e: Edge<T>, ts: Option<i64>) -> Operation<T> {
        let op = Operation::RemoveEdge {
            arg: e,
            ts: self.stamp(ts),
        };
        self.log.push(op.clone());
        op
    }

    fn apply(&mut self, op: Operation<T>) {
        self.log.push(op);
    }

    fn contains_vertex(&self, v: &T) -> bool {
        self.materialize().vertices.contains(v)
    }

    fn contains_edge(&self, e: &Edge<T>) -> bool {
        self.materialize().edges.contains(e)
    }

    fn vertices(&self) -> HashSet<T> {
        self.materialize().vertices
    }

    fn edges(&self) -> HashSet<Edge<T>> {
        self.materialize().edges
    }

    fn components(&self) -> Vec<HashMap<T, HashSet<T>>> {
        self.materialize().components
    }
}

/// Partition `vertices` into connected components using `edges`,
/// building each component's adjacency map directly. Self-loops are
/// reflected as self-adjacency (`v ∈ K[v]`) and otherwise don't affect
/// connectivity.
///
/// This computes the same observable output as the incremental
/// maintenance described for the canonical algorithm (split on edge
/// removal, merge on edge addition), since the component partition is a
/// pure function of the final `(V, E)` — only the performance
/// characteristics differ.
fn components_of<T>(vertices: &HashSet<T>, edges: &HashSet<Edge<T>>) -> Vec<HashMap<T, HashSet<T>>>
where
    T: Clone + Eq + Hash,
{
    let mut adjacency: HashMap<T, HashSet<T>> =
        vertices.iter().cloned().map(|v| (v, HashSet::new())).collect();
    for e in edges {
        let (a, b) = e.vertices();
        if e.is_self_loop() {
            adjacency.get_mut(a).expect("edge endpoint is a live vertex").insert(a.clone());
        } else {
            adjacency
                .get_mut(a)
                .expect("edge endpoint is a live vertex")
                .insert(b.clone());
            adjacency
                .get_mut(b)
                .expect("edge endpoint is a live vertex")
                .insert(a.clone());
        }
    }

    let mut visited: HashSet<T> = HashSet::new();
    let mut components = Vec::new();
    for start in vertices {
        if visited.contains(start) {
            continue;
        }
        let mut component: HashMap<T, HashSet<T>> = HashMap::new();
        let mut queue = VecDeque::from([start.clone()]);
        visited.insert(start.clone());
        while let Some(current) = queue.pop_front() {
            let neighbors = adjacency
                .get(&current)
                .expect("every visited vertex has an adjacency entry")
                .clone();
            for neighbor in &neighbors {
                if neighbor != &current && visited.insert(neighbor.clone()) {
                    queue.push_back(neighbor.clone());
                }
            }
            component.insert(current, neighbors);
        }
        components.push(component);
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use lwwgraph_clock::MockClock;
    use maplit::{hashmap, hashset};

    fn new_graph() -> LogGraph<u32, MockClock> {
        LogGraph::new(MockClock::new(0))
    }

    #[test]
    fn new_graph_is_empty() {
        let graph = new_graph();
        assert!(graph.vertices().is_empty());
        assert!(graph.edges().is_empty());
        assert!(graph.components().is_empty());
    }

    #[test]
    fn scenario_basic_add_edge() {
        let mut g = new_graph();
        g.add_vertex(1, Some(1));
        g.add_vertex(2, Some(2));
        g.add_edge(Edge::new(1, 2), Some(3));

        assert_eq!(g.vertices(), hashset! {1, 2});
        assert_eq!(g.edges(), hashset! {Edge::new(1, 2)});
        assert_eq!(
            g.components(),
            vec![hashmap! {1 => hashset!{2}, 2 => hashset!{1}}]
        );
    }

    #[test]
    fn scenario_cascade_on_vertex_delete() {
        let mut g = new_graph();
        g.add_vertex(1, Some(1));
        g.add_vertex(2, Some(2));
        g.add_edge(Edge::new(1, 2), Some(3));
        g.remove_vertex(1, Some(4));

        assert_eq!(g.vertices(), hashset! {2});
        assert!(g.edges().is_empty());
        assert_eq!(g.components(), vec![hashmap! {2 => hashset!{}}]);
    }

    #[test]
    fn scenario_non_restoration() {
        let mut g = new_graph();
        g.add_vertex(1, Some(1));
        g.add_vertex(2, Some(2));
        g.add_edge(Edge::new(1, 2), Some(3));
        g.remove_vertex(1, Some(4));
        g.add_vertex(1, Some(5));

        assert_eq!(g.vertices(), hashset! {1, 2});
        assert!(
            g.edges().is_empty(),
            "re-adding a vertex must not resurrect its cascaded edges"
        );

        g.add_edge(Edge::new(1, 2), Some(6));
        assert_eq!(g.edges(), hashset! {Edge::new(1, 2)});
        assert_eq!(
            g.components(),
            vec![hashmap! {1 => hashset!{2}, 2 => hashset!{1}}]
        );
    }

    #[test]
    fn scenario_out_of_order_delivery_edge_before_vertices() {
        let mut g = new_graph();
        g.add_vertex(1, Some(100));
        g.add_vertex(2, Some(100));
        g.add_edge(Edge::new(1, 2), Some(10));

        assert!(
            g.edges().is_empty(),
            "the edge timestamp precedes vertex creation"
        );
    }

    #[test]
    fn scenario_tie_break_remove_wins() {
        let mut g = new_graph();
        g.apply(Operation::RemoveVertex { arg: 1, ts: 50 });
        g.apply(Operation::AddVertex { arg: 1, ts: 50 });
        assert!(!g.contains_vertex(&1));
    }

    #[test]
    fn scenario_component_split_on_edge_removal() {
        let mut g = new_graph();
        for v in 1..=5 {
            g.add_vertex(v, Some(1));
        }
        g.add_edge(Edge::new(1, 2), Some(2));
        g.add_edge(Edge::new(2, 3), Some(2));
        g.add_edge(Edge::new(3, 4), Some(2));
        g.add_edge(Edge::new(3, 5), Some(2));
        g.remove_edge(Edge::new(2, 3), Some(3));

        let components = g.components();
        assert_eq!(components.len(), 2);
        let as_sets: Vec<HashSet<u32>> = components
            .iter()
            .map(|c| c.keys().copied().collect())
            .sorted_by_key(|s: &HashSet<u32>| s.len())
            .collect();
        assert_eq!(as_sets, vec![hashset! {1, 2}, hashset! {3, 4, 5}]);
    }

    #[test]
    fn self_loop_is_reflected_as_self_adjacency() {
        let mut g = new_graph();
        g.add_vertex(1, Some(1));
        g.add_edge(Edge::new(1, 1), Some(2));

        assert_eq!(g.edges(), hashset! {Edge::new(1, 1)});
        assert_eq!(g.components(), vec![hashmap! {1 => hashset!{1}}]);
    }

    #[test]
    fn convergence_is_independent_of_delivery_order() {
        let clock = MockClock::new(0);
        let mut base = LogGraph::<u32, _>::new(clock);
        let op1 = base.add_vertex(1, Some(1));
        let op2 = base.add_vertex(2, Some(2));
        let op3 = base.add_edge(Edge::new(1, 2), Some(3));
        let op4 = base.remove_vertex(1, Some(4));
        let ops = vec![op1, op2, op3, op4];

        let mut reference: Option<Materialized<u32>> = None;
        for perm in ops.iter().permutations(ops.len()) {
            let mut replica = LogGraph::<u32, _>::new(MockClock::new(0));
            for op in perm {
                replica.apply(op.clone());
            }
            let materialized = replica.materialize();
            if let Some(reference) = &reference {
                assert_eq!(reference, &materialized);
            } else {
                reference = Some(materialized);
            }
        }
    }

    #[test]
    fn idempotence_under_duplicate_delivery() {
        let mut g = new_graph();
        let op1 = g.add_vertex(1, Some(1));
        let op2 = g.add_vertex(2, Some(2));
        let op3 = g.add_edge(Edge::new(1, 2), Some(3));

        let before = g.materialize();
        g.apply(op1);
        g.apply(op2);
        g.apply(op3);
        let after = g.materialize();

        assert_eq!(before, after);
    }

    #[test]
    fn edge_integrity_every_endpoint_is_live() {
        let mut g = new_graph();
        g.add_vertex(1, Some(1));
        g.add_vertex(2, Some(2));
        g.add_edge(Edge::new(1, 2), Some(3));
        let materialized = g.materialize();
        for e in &materialized.edges {
            let (a, b) = e.vertices();
            assert!(materialized.vertices.contains(a));
            assert!(materialized.vertices.contains(b));
        }
    }

    #[test]
    fn components_partition_vertices() {
        let mut g = new_graph();
        for v in 1..=4 {
            g.add_vertex(v, Some(1));
        }
        g.add_edge(Edge::new(1, 2), Some(2));
        let materialized = g.materialize();
        let covered: HashSet<u32> = materialized
            .components
            .iter()
            .flat_map(|c| c.keys().copied())
            .collect();
        assert_eq!(covered, materialized.vertices);
        let total: usize = materialized.components.iter().map(|c| c.len()).sum();
        assert_eq!(total, materialized.vertices.len());
    }
}
