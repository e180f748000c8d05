use crate::{edge::Edge, graph::Graph};
use snafu::prelude::*;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    hash::Hash,
};

/// Raised when a target vertex is listed in a component's key set but BFS
/// over that component's adjacency can't reach it. This indicates an
/// invariant violation in the graph's component map, not a normal "no path"
/// result (which is `Ok(None)`).
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("vertex is present in the component map but unreachable by BFS"))]
pub struct MalformedComponentMap;

/// Shortest path (by edge count) between `a` and `b`, computed over a
/// snapshot of `graph`'s components taken at the start of the call.
///
/// Returns `Ok(None)` if `a` or `b` isn't live, or if they live in
/// different components. Returns `Ok(Some(vec![]))` if `a == b`. Otherwise
/// returns the edges of a shortest path, in order from `a` to `b`.
pub fn shortest_path<T, G>(
    graph: &G,
    a: &T,
    b: &T,
) -> Result<Option<Vec<Edge<T>>>, MalformedComponentMap>
where
    T: Clone + Eq + Hash,
    G: Graph<T>,
{
    let components = graph.components();
    let Some(component) = components.iter().find(|c| c.contains_key(a)) else {
        return Ok(None);
    };
    if !component.contains_key(b) {
        return Ok(None);
    }
    if a == b {
        return Ok(Some(Vec::new()));
    }

    let mut visited: HashSet<T> = HashSet::from([a.clone()]);
    let mut predecessor: HashMap<T, T> = HashMap::new();
    let mut queue = VecDeque::from([a.clone()]);
    let mut reached = false;

    'bfs: while let Some(current) = queue.pop_front() {
        let neighbors = component
            .get(&current)
            .expect("every enqueued vertex is a key in its own component");
        for neighbor in neighbors {
            if neighbor == &current {
                continue; // self-loop: doesn't advance the search
            }
            if visited.insert(neighbor.clone()) {
                predecessor.insert(neighbor.clone(), current.clone());
                if neighbor == b {
                    reached = true;
                    break 'bfs;
                }
                queue.push_back(neighbor.clone());
            }
        }
    }

    ensure!(reached, MalformedComponentMapSnafu);

    let mut vertices_reversed = vec![b.clone()];
    let mut current = b.clone();
    while let Some(pred) = predecessor.get(&current) {
        vertices_reversed.push(pred.clone());
        current = pred.clone();
    }
    vertices_reversed.reverse();

    let path = vertices_reversed
        .windows(2)
        .map(|pair| Edge::new(pair[0].clone(), pair[1].clone()))
        .collect();
    Ok(Some(path))
}
