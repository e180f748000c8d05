//! A Last-Writer-Wins Element Graph: a CRDT for an undirected graph of
//! atoms and unordered pairs of atoms, with derived connected-component
//! tracking and shortest-path query.
//!
//! Replicas accept vertex and edge add/remove operations timestamped from a
//! monotonic clock ([`lwwgraph_clock`]); exchanging operations in any order
//! (see [`graph::Graph::apply`]) converges every replica to the same
//! `(vertices, edges, components)` state without coordination.

pub mod edge;
pub mod graph;
pub mod lww_set;
pub mod operation;
pub mod path;

pub use edge::Edge;
pub use graph::{Graph, LogGraph, Materialized};
pub use lww_set::{LwwSet, LwwSetOpKind, LwwSetOperation};
pub use operation::{Arg, InvalidOperation, OpKind, Operation, OperationRecord};
pub use path::{MalformedComponentMap, shortest_path};
