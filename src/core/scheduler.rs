/// Virtual-time staging for deferred actions.
///
/// Nothing fires on its own: `tick` is the only way time moves. Handles
/// are never reused, so a cancelled or superseded entry firing late is
/// impossible by construction.

use std::time::Duration;

/// Identifies one scheduled entry for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionHandle(u64);

struct Entry<A> {
    handle: TransitionHandle,
    deadline: Duration,
    action: A,
}

pub struct Scheduler<A> {
    now: Duration,
    entries: Vec<Entry<A>>,
    next_handle: u64,
}

impl<A> Scheduler<A> {
    pub fn new() -> Scheduler<A> {
        Scheduler {
            now: Duration::ZERO,
            entries: Vec::new(),
            next_handle: 1,
        }
    }

    /// Queue an action to fire once `delay` of virtual time has passed,
    /// counted from the time already ticked so far.
    pub fn schedule(&mut self, delay: Duration, action: A) -> TransitionHandle {
        let handle = TransitionHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry {
            handle,
            deadline: self.now + delay,
            action,
        });
        handle
    }

    /// Drop one pending entry. Returns false for unknown or already
    /// fired handles, which makes stale cancels harmless.
    pub fn cancel(&mut self, handle: TransitionHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    /// Drop everything pending.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Advance virtual time and collect every action whose deadline has
    /// passed, in deadline order (ties break by schedule order). One
    /// oversized tick releases a whole deadline chain at once.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<A> {
        self.now += elapsed;

        let mut due = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            if self.entries[index].deadline <= self.now {
                due.push(self.entries.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by_key(|entry| (entry.deadline, entry.handle.0));
        due.into_iter().map(|entry| entry.action).collect()
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Scheduler<A> {
        Scheduler::new()
    }
}
