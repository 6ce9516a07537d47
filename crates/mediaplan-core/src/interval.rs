use std::collections::BTreeMap;
use std::fmt;
use std::iter::Peekable;

use serde::Serialize;

/// Inclusive range of file indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FileRange {
    pub first: i32,
    pub last: i32,
}

impl FileRange {
    pub fn new(first: i32, last: i32) -> Self {
        Self {
            first: first.min(last),
            last: first.max(last),
        }
    }

    /// Number of file indexes covered; 0 for an inverted range.
    pub fn len(&self) -> u64 {
        u64::try_from(i64::from(self.last) - i64::from(self.first) + 1).unwrap_or(0)
    }

    pub fn contains(&self, findex: i32) -> bool {
        (self.first..=self.last).contains(&findex)
    }

    /// Overlap with `[first, last]`, if any. An inverted window overlaps nothing.
    pub fn clip(&self, first: i32, last: i32) -> Option<FileRange> {
        if first > last || self.last < first || self.first > last {
            return None;
        }
        Some(FileRange {
            first: self.first.max(first),
            last: self.last.min(last),
        })
    }
}

impl fmt::Display for FileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

/// Sorted file-index ranges of one job, keyed by lower bound.
///
/// Invariant: stored ranges never overlap and never touch
/// (`next.first > prev.last + 1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    ranges: BTreeMap<i32, i32>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file index. Index 0 is ignored and negative indexes count as
    /// their absolute value.
    pub fn insert(&mut self, findex: i32) {
        if findex == 0 {
            return;
        }
        let findex = findex.saturating_abs();
        self.insert_range(findex, findex);
    }

    /// Add every index in `[first, last]`, merging with touching ranges.
    pub fn insert_range(&mut self, first: i32, last: i32) {
        let range = FileRange::new(first, last);
        let (mut lo, mut hi) = (range.first.max(1), range.last);
        if hi < lo {
            return;
        }

        if let Some((&prev_lo, &prev_hi)) = self.ranges.range(..=lo).next_back() {
            if i64::from(prev_hi) + 1 >= i64::from(lo) {
                if prev_hi >= hi {
                    return;
                }
                self.ranges.remove(&prev_lo);
                lo = prev_lo;
            }
        }

        while let Some((&next_lo, &next_hi)) = self.ranges.range(lo..).next() {
            if i64::from(next_lo) > i64::from(hi) + 1 {
                break;
            }
            self.ranges.remove(&next_lo);
            hi = hi.max(next_hi);
        }

        self.ranges.insert(lo, hi);
    }

    /// Select every file of the job.
    pub fn insert_all(&mut self) {
        self.ranges.clear();
        self.ranges.insert(1, i32::MAX);
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of stored ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn contains(&self, findex: i32) -> bool {
        self.ranges
            .range(..=findex)
            .next_back()
            .is_some_and(|(_, &hi)| findex <= hi)
    }

    pub fn iter(&self) -> impl Iterator<Item = FileRange> + '_ {
        self.ranges
            .iter()
            .map(|(&first, &last)| FileRange { first, last })
    }

    /// Total number of selected file indexes.
    pub fn file_count(&self) -> u64 {
        self.iter().map(|r| r.len()).sum()
    }

    /// Contiguous blocks clipped to `[first, last]`, in ascending order.
    pub fn intersect(&self, first: i32, last: i32) -> Vec<FileRange> {
        self.blocks().filter_map(|b| b.clip(first, last)).collect()
    }

    /// Whether any selected index falls inside `[first, last]`.
    pub fn any_overlap(&self, first: i32, last: i32) -> bool {
        self.blocks().any(|b| b.clip(first, last).is_some())
    }

    /// Ranges with contiguous neighbours coalesced into one block.
    fn blocks(&self) -> Blocks<impl Iterator<Item = FileRange> + '_> {
        Blocks {
            inner: self.iter().peekable(),
        }
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut set = IntervalSet::new();
        for findex in iter {
            set.insert(findex);
        }
        set
    }
}

struct Blocks<I: Iterator<Item = FileRange>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = FileRange>> Iterator for Blocks<I> {
    type Item = FileRange;

    fn next(&mut self) -> Option<FileRange> {
        let mut block = self.inner.next()?;
        while let Some(next) = self
            .inner
            .next_if(|n| i64::from(n.first) == i64::from(block.last) + 1)
        {
            block.last = next.last;
        }
        Some(block)
    }
}
