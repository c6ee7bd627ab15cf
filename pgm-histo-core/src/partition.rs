use serde::{Deserialize, Serialize};

/// A contiguous byte range of the source assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub offset: u64,
    pub length: u64,
}

impl Span {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Split `total_bytes` starting at `start` into `workers` back-to-back spans.
///
/// Every span gets `total_bytes / workers` bytes and the last one also takes
/// the remainder. When there are fewer bytes than workers the leading spans
/// are empty. Callers clamp the worker count; zero is treated as one.
pub fn partition(start: u64, total_bytes: u64, workers: usize) -> Vec<Span> {
    let workers = workers.max(1) as u64;
    let base = total_bytes / workers;
    let remainder = total_bytes % workers;
    let mut offset = start;
    (0..workers)
        .map(|i| {
            let length = if i == workers - 1 { base + remainder } else { base };
            let span = Span { offset, length };
            offset += length;
            span
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(spans: &[Span], start: u64, total: u64) {
        let mut expected_offset = start;
        for s in spans {
            assert_eq!(s.offset, expected_offset, "gap or overlap in {spans:?}");
            expected_offset = s.end();
        }
        assert_eq!(spans.iter().map(|s| s.length).sum::<u64>(), total);
        assert_eq!(expected_offset, start + total);
    }

    #[test]
    fn even_split() {
        let spans = partition(15, 16, 4);
        assert_eq!(
            spans,
            vec![
                Span { offset: 15, length: 4 },
                Span { offset: 19, length: 4 },
                Span { offset: 23, length: 4 },
                Span { offset: 27, length: 4 },
            ]
        );
    }

    #[test]
    fn remainder_goes_to_last() {
        let spans = partition(0, 10, 3);
        let lengths: Vec<u64> = spans.iter().map(|s| s.length).collect();
        assert_eq!(lengths, vec![3, 3, 4]);
        assert_tiles(&spans, 0, 10);
    }

    #[test]
    fn more_workers_than_bytes() {
        let spans = partition(7, 3, 5);
        assert_eq!(spans.len(), 5);
        let lengths: Vec<u64> = spans.iter().map(|s| s.length).collect();
        assert_eq!(lengths, vec![0, 0, 0, 0, 3]);
        assert_tiles(&spans, 7, 3);
    }

    #[test]
    fn zero_bytes() {
        let spans = partition(11, 0, 4);
        assert_eq!(spans.len(), 4);
        assert!(spans.iter().all(Span::is_empty));
        assert!(spans.iter().all(|s| s.offset == 11));
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(partition(3, 9, 0), vec![Span { offset: 3, length: 9 }]);
    }

    #[test]
    fn tiles_for_many_shapes() {
        for total in [0u64, 1, 2, 7, 64, 1000, 1023, 1025, 65_537] {
            for workers in 1..=17 {
                let spans = partition(42, total, workers);
                assert_eq!(spans.len(), workers);
                assert_tiles(&spans, 42, total);
                assert_eq!(spans, partition(42, total, workers));
            }
        }
    }
}
