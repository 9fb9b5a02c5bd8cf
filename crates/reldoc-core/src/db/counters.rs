use crate::key::FieldPath;
use parking_lot::Mutex;
use std::collections::BTreeMap;

///
/// Counters
///
/// Live index entry count per instance path. Kept in memory only; a
/// counter that drops to zero is kept so empty prefixes stay visible.
///

#[derive(Debug, Default)]
pub struct Counters {
    inner: Mutex<BTreeMap<FieldPath, i64>>,
}

impl Counters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `sign * delta` for every path in `deltas`.
    pub fn apply(&self, deltas: &BTreeMap<FieldPath, i64>, sign: i64) {
        if deltas.is_empty() {
            return;
        }

        let mut inner = self.inner.lock();
        for (path, delta) in deltas {
            let counter = inner.entry(path.clone()).or_insert(0);
            *counter = counter.saturating_add(sign.saturating_mul(*delta));
        }
    }

    #[must_use]
    pub fn get(&self, path: &FieldPath) -> i64 {
        self.inner.lock().get(path).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<FieldPath, i64> {
        self.inner.lock().clone()
    }

    /// Sum over every path.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.inner.lock().values().sum()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_adds_and_subtracts() {
        let counters = Counters::new();
        let tags = FieldPath::new("Tags").index(1);
        let deltas: BTreeMap<_, _> = [(FieldPath::new("Name"), 1), (tags.clone(), 1)]
            .into_iter()
            .collect();

        counters.apply(&deltas, 1);
        counters.apply(&deltas, 1);
        assert_eq!(counters.get(&tags), 2);
        assert_eq!(counters.total(), 4);

        counters.apply(&deltas, -1);
        counters.apply(&deltas, -1);
        assert_eq!(counters.get(&tags), 0);
        assert_eq!(counters.snapshot().len(), 2, "zeroed counters are kept");
    }

    #[test]
    fn unknown_path_reads_zero() {
        assert_eq!(Counters::new().get(&FieldPath::new("Nope")), 0);
    }
}
