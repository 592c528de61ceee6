/// Clamped variable store. Every accepted mutation is announced on the
/// notifier: one `variables:delta` with the effective changes, then one
/// `variables:updated` with the full snapshot.

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::core::event::RuntimeEvent;
use crate::core::notifier::Notifier;
use crate::schema::stats::StatDelta;

/// Lower bound every stored value is clamped to.
pub const STAT_MIN: f64 = 0.0;
/// Upper bound every stored value is clamped to.
pub const STAT_MAX: f64 = 100.0;

pub struct StateStore {
    values: FxHashMap<String, f64>,
    notifier: Notifier,
}

impl StateStore {
    pub fn new(notifier: Notifier) -> StateStore {
        StateStore {
            values: FxHashMap::default(),
            notifier,
        }
    }

    /// Current value of a variable; never-written variables read as 0.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Overwrite a variable, clamped to [STAT_MIN, STAT_MAX]. Announces
    /// the new snapshot; no delta event, since nothing was added.
    pub fn set(&mut self, name: &str, value: f64) {
        if !value.is_finite() {
            warn!("rejected non-finite value {value} for variable {name}");
            return;
        }
        self.values
            .insert(name.to_string(), value.clamp(STAT_MIN, STAT_MAX));
        self.notifier.emit(&RuntimeEvent::VariablesUpdated {
            stats: self.snapshot(),
        });
    }

    /// Apply one delta. Equivalent to `apply_batch` with a single entry.
    pub fn apply(&mut self, delta: &StatDelta) {
        self.apply_batch(std::slice::from_ref(delta));
    }

    /// Apply every delta, then announce once: the effective (post-clamp)
    /// deltas first, the full snapshot second. A delta that clamping
    /// reduced to nothing still appears, with an effective delta of 0.
    /// Non-finite deltas are dropped with a log line and no event entry.
    pub fn apply_batch(&mut self, deltas: &[StatDelta]) {
        let mut effective = Vec::with_capacity(deltas.len());
        for delta in deltas {
            if !delta.delta.is_finite() {
                warn!(
                    "rejected non-finite delta {} for variable {}",
                    delta.delta, delta.variable
                );
                continue;
            }
            let current = self.get(&delta.variable);
            let next = (current + delta.delta).clamp(STAT_MIN, STAT_MAX);
            self.values.insert(delta.variable.clone(), next);
            effective.push(StatDelta {
                variable: delta.variable.clone(),
                delta: next - current,
            });
        }

        if effective.is_empty() {
            return;
        }
        self.notifier
            .emit(&RuntimeEvent::VariablesDelta { deltas: effective });
        self.notifier.emit(&RuntimeEvent::VariablesUpdated {
            stats: self.snapshot(),
        });
    }

    /// Seed starting values in one motion. Announces a single snapshot
    /// and no deltas; sessions call this before the first scene loads.
    pub fn seed(&mut self, stats: &FxHashMap<String, f64>) {
        if stats.is_empty() {
            return;
        }
        for (name, value) in stats {
            if !value.is_finite() {
                warn!("rejected non-finite seed value {value} for variable {name}");
                continue;
            }
            self.values
                .insert(name.clone(), value.clamp(STAT_MIN, STAT_MAX));
        }
        self.notifier.emit(&RuntimeEvent::VariablesUpdated {
            stats: self.snapshot(),
        });
    }

    /// Discard every variable, then seed the given map. Nothing from
    /// before the call survives, named in the new seed or not.
    pub fn reset(&mut self, stats: &FxHashMap<String, f64>) {
        self.values.clear();
        self.seed(stats);
    }

    /// Copy of every known variable.
    pub fn snapshot(&self) -> FxHashMap<String, f64> {
        self.values.clone()
    }
}
