use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Worker-private counts for the values `0..=maxval`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTally {
    counts: Vec<u64>,
    out_of_range: u64,
}

impl LocalTally {
    /// Zeroed counters for `0..=maxval`, or `None` when they cannot be allocated.
    pub fn try_new(maxval: u8) -> Option<Self> {
        let len = usize::from(maxval) + 1;
        let mut counts = Vec::new();
        counts.try_reserve_exact(len).ok()?;
        counts.resize(len, 0);
        Some(Self {
            counts,
            out_of_range: 0,
        })
    }

    /// Count every byte of `samples`. Bytes above maxval are kept apart.
    pub fn record(&mut self, samples: &[u8]) {
        for &b in samples {
            match self.counts.get_mut(usize::from(b)) {
                Some(c) => *c += 1,
                None => self.out_of_range += 1,
            }
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// The shared accumulator every worker folds its [`LocalTally`] into.
///
/// Zeroed on construction, mutated only through [`GlobalHistogram::merge`]
/// and frozen into a [`Histogram`] once all workers have joined.
#[derive(Debug)]
pub struct GlobalHistogram {
    inner: Mutex<Histogram>,
}

impl GlobalHistogram {
    pub fn new(maxval: u8) -> Self {
        Self {
            inner: Mutex::new(Histogram::zeroed(maxval)),
        }
    }

    /// Add `local` into the global counts. The lock covers the additions only.
    pub fn merge(&self, local: &LocalTally) {
        // additions cannot leave the counts half-updated, so a poisoned lock is still usable
        let mut global = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for (g, l) in global.counts.iter_mut().zip(&local.counts) {
            *g += l;
        }
        global.out_of_range += local.out_of_range;
    }

    pub fn into_histogram(self) -> Histogram {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A finished, read-only value histogram over `0..=maxval`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    counts: Vec<u64>,
    out_of_range: u64,
}

impl Histogram {
    pub fn zeroed(maxval: u8) -> Self {
        Self {
            counts: vec![0; usize::from(maxval) + 1],
            out_of_range: 0,
        }
    }

    /// Build from a full 256-entry byte table, folding entries above maxval
    /// into the out-of-range count.
    pub fn from_byte_table(table: &[u64; 256], maxval: u8) -> Self {
        let (inside, outside) = table.split_at(usize::from(maxval) + 1);
        Self {
            counts: inside.to_vec(),
            out_of_range: outside.iter().sum(),
        }
    }

    pub fn maxval(&self) -> u8 {
        (self.counts.len() - 1) as u8
    }

    pub fn count(&self, value: u8) -> u64 {
        self.counts.get(usize::from(value)).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Samples whose value exceeded maxval and so have no bin.
    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(value, count)` pairs in ascending value order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts.iter().enumerate().map(|(v, &c)| (v as u8, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(maxval: u8) -> LocalTally {
        LocalTally::try_new(maxval).unwrap()
    }

    #[test]
    fn local_tally_counts_bytes() {
        let mut t = tally(255);
        t.record(&[0, 0, 7, 255, 7, 0]);
        assert_eq!(t.counts()[0], 3);
        assert_eq!(t.counts()[7], 2);
        assert_eq!(t.counts()[255], 1);
        assert_eq!(t.total(), 6);
        assert_eq!(t.out_of_range(), 0);
    }

    #[test]
    fn local_tally_keeps_out_of_range_apart() {
        let mut t = tally(3);
        t.record(&[0, 1, 2, 3, 4, 200]);
        assert_eq!(t.counts(), &[1, 1, 1, 1]);
        assert_eq!(t.out_of_range(), 2);
    }

    #[test]
    fn try_new_is_zeroed_and_sized() {
        let t = tally(17);
        assert_eq!(t.counts().len(), 18);
        assert_eq!(t.total(), 0);
        assert_eq!(t.out_of_range(), 0);
    }

    #[test]
    fn merge_adds_elementwise() {
        let global = GlobalHistogram::new(3);
        let mut a = tally(3);
        a.record(&[0, 1, 1, 9]);
        let mut b = tally(3);
        b.record(&[1, 3, 3, 3]);
        global.merge(&a);
        global.merge(&b);
        let h = global.into_histogram();
        assert_eq!(h.counts(), &[1, 3, 0, 3]);
        assert_eq!(h.out_of_range(), 1);
        assert_eq!(h.total(), 7);
    }

    #[test]
    fn concurrent_merges_are_atomic() {
        let global = GlobalHistogram::new(255);
        let mut one = tally(255);
        one.record(&(0..=255u8).collect::<Vec<_>>());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        global.merge(&one);
                    }
                });
            }
        });
        let h = global.into_histogram();
        assert!(h.counts().iter().all(|&c| c == 800));
    }

    #[test]
    fn histogram_from_byte_table() {
        let mut table = [0u64; 256];
        table[0] = 5;
        table[2] = 1;
        table[3] = 4;
        table[255] = 2;
        let h = Histogram::from_byte_table(&table, 2);
        assert_eq!(h.maxval(), 2);
        assert_eq!(h.counts(), &[5, 0, 1]);
        assert_eq!(h.out_of_range(), 6);
    }

    #[test]
    fn entries_are_ascending() {
        let mut t = tally(2);
        t.record(&[2, 2, 0]);
        let g = GlobalHistogram::new(2);
        g.merge(&t);
        let h = g.into_histogram();
        let entries: Vec<_> = h.entries().collect();
        assert_eq!(entries, vec![(0, 1), (1, 0), (2, 2)]);
        assert_eq!(h.count(2), 2);
        assert_eq!(h.count(9), 0);
    }
}
