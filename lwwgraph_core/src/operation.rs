use crate::edge::Edge;
use snafu::prelude::*;

/// The four kinds of mutation a replica can record.
///
/// Ordering of the discriminants follows the materialization priority from
/// [`OpKind::priority`], *not* declaration order: deletes sort before
/// additions so that, at equal timestamps, removal wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    AddV,
    DelV,
    AddE,
    DelE,
}

impl OpKind {
    /// Sort priority used when materializing the log: lower sorts first.
    /// `DelE < DelV < AddV < AddE`, so within one timestamp edge deletions
    /// are applied before vertex deletions, which precede vertex additions,
    /// which precede edge additions.
    pub const fn priority(self) -> u8 {
        match self {
            OpKind::DelE => 1,
            OpKind::DelV => 2,
            OpKind::AddV => 3,
            OpKind::AddE => 4,
        }
    }

    /// The wire-form tag, e.g. `"add_v"`.
    pub const fn tag(self) -> &'static str {
        match self {
            OpKind::AddV => "add_v",
            OpKind::DelV => "del_v",
            OpKind::AddE => "add_e",
            OpKind::DelE => "del_e",
        }
    }

    /// `true` for `AddV`/`DelV`, which take a vertex argument.
    pub const fn is_vertex_op(self) -> bool {
        matches!(self, OpKind::AddV | OpKind::DelV)
    }
}

/// A single mutation recorded in a replica's operation log.
///
/// Constructed directly as a tagged enum rather than validated after the
/// fact: the vertex/edge argument kinds are baked into the variants, so
/// there is no representable "wrong argument for this op" state once an
/// `Operation` exists. The only place argument-kind mismatches can occur is
/// at the wire boundary, see [`OperationRecord`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation<T> {
    AddVertex { arg: T, ts: i64 },
    RemoveVertex { arg: T, ts: i64 },
    AddEdge { arg: Edge<T>, ts: i64 },
    RemoveEdge { arg: Edge<T>, ts: i64 },
}

impl<T> Operation<T> {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::AddVertex { .. } => OpKind::AddV,
            Operation::RemoveVertex { .. } => OpKind::DelV,
            Operation::AddEdge { .. } => OpKind::AddE,
            Operation::RemoveEdge { .. } => OpKind::DelE,
        }
    }

    pub fn ts(&self) -> i64 {
        match self {
            Operation::AddVertex { ts, .. }
            | Operation::RemoveVertex { ts, .. }
            | Operation::AddEdge { ts, .. }
            | Operation::RemoveEdge { ts, .. } => *ts,
        }
    }
}

/// The untyped argument half of a wire-form operation: either an atom (for
/// `*_v` ops) or an edge (for `*_e` ops).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg<T> {
    Vertex(T),
    Edge(Edge<T>),
}

/// Raised when an [`OperationRecord`]'s `arg` kind doesn't match its `op`
/// suffix (`_v` expects [`Arg::Vertex`], `_e` expects [`Arg::Edge`]).
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("operation {} cannot take a {got} argument", op.tag()))]
pub struct InvalidOperation {
    pub op: OpKind,
    pub got: &'static str,
}

/// The serializable, three-field wire form of an [`Operation`]: `{ op, arg,
/// ts }`. `arg`'s kind is validated against `op`'s suffix at construction
/// time; a mismatch is an [`InvalidOperation`] error rather than a silently
/// malformed record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRecord<T> {
    op: OpKind,
    arg: Arg<T>,
    ts: i64,
}

impl<T> OperationRecord<T> {
    pub fn new(op: OpKind, arg: Arg<T>, ts: i64) -> Result<Self, InvalidOperation> {
        match (&arg, op.is_vertex_op()) {
            (Arg::Vertex(_), true) | (Arg::Edge(_), false) => Ok(Self { op, arg, ts }),
            (Arg::Vertex(_), false) => InvalidOperationSnafu { op, got: "vertex" }.fail(),
            (Arg::Edge(_), true) => InvalidOperationSnafu { op, got: "edge" }.fail(),
        }
    }

    pub fn op(&self) -> OpKind {
        self.op
    }

    pub fn arg(&self) -> &Arg<T> {
        &self.arg
    }

    pub fn ts(&self) -> i64 {
        self.ts
    }
}

impl<T> TryFrom<OperationRecord<T>> for Operation<T> {
    type Error = InvalidOperation;

    fn try_from(record: OperationRecord<T>) -> Result<Self, Self::Error> {
        let OperationRecord { op, arg, ts } = record;
        match (op, arg) {
            (OpKind::AddV, Arg::Vertex(arg)) => Ok(Operation::AddVertex { arg, ts }),
            (OpKind::DelV, Arg::Vertex(arg)) => Ok(Operation::RemoveVertex { arg, ts }),
            (OpKind::AddE, Arg::Edge(arg)) => Ok(Operation::AddEdge { arg, ts }),
            (OpKind::DelE, Arg::Edge(arg)) => Ok(Operation::RemoveEdge { arg, ts }),
            (op, Arg::Vertex(_)) => InvalidOperationSnafu { op, got: "vertex" }.fail(),
            (op, Arg::Edge(_)) => InvalidOperationSnafu { op, got: "edge" }.fail(),
        }
    }
}

impl<T> From<Operation<T>> for OperationRecord<T> {
    fn from(op: Operation<T>) -> Self {
        match op {
            Operation::AddVertex { arg, ts } => OperationRecord {
                op: OpKind::AddV,
                arg: Arg::Vertex(arg),
                ts,
            },
            Operation::RemoveVertex { arg, ts } => OperationRecord {
                op: OpKind::DelV,
                arg: Arg::Vertex(arg),
                ts,
            },
            Operation::AddEdge { arg, ts } => OperationRecord {
                op: OpKind::AddE,
                arg: Arg::Edge(arg),
                ts,
            },
            Operation::RemoveEdge { arg, ts } => OperationRecord {
                op: OpKind::DelE,
                arg: Arg::Edge(arg),
                ts,
            },
        }
    }
}
