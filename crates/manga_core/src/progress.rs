use std::collections::BTreeMap;

use crate::PageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    pub source: usize,
    pub unit: usize,
}

impl From<PageId> for UnitKey {
    fn from(id: PageId) -> Self {
        Self {
            source: id.source,
            unit: id.unit,
        }
    }
}

/// Counts outstanding pages per unit so completion can be reported exactly once,
/// whatever order pages settle in.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    remaining: BTreeMap<UnitKey, usize>,
    total: usize,
    settled: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit with `pages` pages. Units without pages are never reported.
    pub fn expect(&mut self, unit: UnitKey, pages: usize) {
        if pages == 0 {
            return;
        }
        *self.remaining.entry(unit).or_insert(0) += pages;
        self.total += pages;
    }

    /// Marks one page as settled (written, skipped or failed).
    /// Returns the unit when this was its last outstanding page.
    pub fn settle(&mut self, page: PageId) -> Option<UnitKey> {
        let key = UnitKey::from(page);
        let remaining = self.remaining.get_mut(&key)?;
        *remaining -= 1;
        self.settled += 1;
        if *remaining == 0 {
            self.remaining.remove(&key);
            Some(key)
        } else {
            None
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn settled(&self) -> usize {
        self.settled
    }

    pub fn open_units(&self) -> usize {
        self.remaining.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(unit: usize, page: usize) -> PageId {
        PageId {
            source: 0,
            unit,
            page,
        }
    }

    #[test]
    fn unit_completes_once_regardless_of_order() {
        let mut tracker = ProgressTracker::new();
        tracker.expect(UnitKey { source: 0, unit: 0 }, 3);
        tracker.expect(UnitKey { source: 0, unit: 1 }, 1);
        tracker.expect(UnitKey { source: 0, unit: 2 }, 0);

        assert_eq!(tracker.settle(page(0, 2)), None);
        assert_eq!(
            tracker.settle(page(1, 0)),
            Some(UnitKey { source: 0, unit: 1 })
        );
        assert_eq!(tracker.settle(page(0, 0)), None);
        assert_eq!(
            tracker.settle(page(0, 1)),
            Some(UnitKey { source: 0, unit: 0 })
        );
        assert_eq!(tracker.settle(page(0, 1)), None);
        assert_eq!(tracker.total(), 4);
        assert_eq!(tracker.settled(), 4);
        assert_eq!(tracker.open_units(), 0);
    }
}
