use lwwgraph_clock::Clock;
use std::{collections::HashMap, hash::Hash};

/// The two operation kinds an [`LwwSet`] log can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LwwSetOpKind {
    Add,
    Del,
}

/// A single recorded mutation of an [`LwwSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LwwSetOperation<T> {
    pub kind: LwwSetOpKind,
    pub arg: T,
    pub ts: i64,
}

/// A log-backed Last-Writer-Wins element set.
///
/// State is an append-only log of `{Add, Del}` operations. An element is
/// present iff its most recent `Add` timestamp strictly exceeds its most
/// recent `Del` timestamp (missing ⇒ `-∞`); at equal timestamps, remove
/// wins.
#[derive(Debug)]
pub struct LwwSet<T, C> {
    clock: C,
    log: Vec<LwwSetOperation<T>>,
}

impl<T, C> LwwSet<T, C>
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

    /// Append an `Add` operation, stamping it with the clock if `ts` is
    /// absent, and return the recorded operation.
    pub fn add(&mut self, item: T, ts: Option<i64>) -> LwwSetOperation<T>
    where
        T: Clone,
    {
        let ts = self.stamp(ts);
        let op = LwwSetOperation {
            kind: LwwSetOpKind::Add,
            arg: item,
            ts,
        };
        self.log.push(op.clone());
        op
    }

    /// Append a `Del` operation, stamping it with the clock if `ts` is
    /// absent, and return the recorded operation.
    pub fn remove(&mut self, item: T, ts: Option<i64>) -> LwwSetOperation<T>
    where
        T: Clone,
    {
        let ts = self.stamp(ts);
        let op = LwwSetOperation {
            kind: LwwSetOpKind::Del,
            arg: item,
            ts,
        };
        self.log.push(op.clone());
        op
    }

    /// Apply an operation received from a peer (or produced locally).
    /// Duplicate deliveries are harmless: they collapse during
    /// materialization.
    pub fn apply(&mut self, op: LwwSetOperation<T>) {
        self.log.push(op);
    }
}

impl<T, C> LwwSet<T, C>
where
    T: Eq + Hash + Clone,
{
    /// The elements currently present, per the remove-wins LWW rule.
    pub fn elements(&self) -> std::collections::HashSet<T> {
        let mut last_add: HashMap<&T, i64> = HashMap::new();
        let mut last_del: HashMap<&T, i64> = HashMap::new();
        for op in &self.log {
            let target = match op.kind {
                LwwSetOpKind::Add => &mut last_add,
                LwwSetOpKind::Del => &mut last_del,
            };
            target
                .entry(&op.arg)
                .and_modify(|ts| *ts = (*ts).max(op.ts))
                .or_insert(op.ts);
        }
        last_add
            .into_iter()
            .filter_map(|(item, add_ts)| {
                let del_ts = last_del.get(item).copied().unwrap_or(add_ts.saturating_sub(1));
                (add_ts > del_ts).then(|| item.clone())
            })
            .collect()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.elements().contains(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwwgraph_clock::MockClock;

    fn new_set() -> LwwSet<u32, MockClock> {
        LwwSet::new(MockClock::new(0))
    }

    #[test]
    fn empty_set_has_no_elements() {
        let set = new_set();
        assert!(set.elements().is_empty());
    }

    #[test]
    fn add_then_present() {
        let mut set = new_set();
        set.add(1, Some(1));
        assert!(set.contains(&1));
    }

    #[test]
    fn remove_wins_on_tied_timestamp() {
        let mut set = new_set();
        set.apply(LwwSetOperation {
            kind: LwwSetOpKind::Del,
            arg: 1,
            ts: 50,
        });
        set.apply(LwwSetOperation {
            kind: LwwSetOpKind::Add,
            arg: 1,
            ts: 50,
        });
        assert!(!set.contains(&1));
    }

    #[test]
    fn later_add_beats_earlier_remove() {
        let mut set = new_set();
        set.add(1, Some(1));
        set.remove(1, Some(2));
        set.add(1, Some(3));
        assert!(set.contains(&1));
    }

    #[test]
    fn duplicate_delivery_is_idempotent() {
        let mut set = new_set();
        let op = set.add(1, Some(5));
        set.apply(op.clone());
        set.apply(op);
        assert_eq!(set.elements(), std::collections::HashSet::from([1]));
    }

    #[test]
    fn replay_order_does_not_affect_result() {
        let mut forward = new_set();
        forward.add(1, Some(1));
        forward.add(2, Some(2));
        forward.remove(1, Some(3));

        let mut backward = new_set();
        backward.remove(1, Some(3));
        backward.add(2, Some(2));
        backward.add(1, Some(1));

        assert_eq!(forward.elements(), backward.elements());
    }
}
