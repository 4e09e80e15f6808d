// WHY: abstracts never carry their heading or page; both come from which
// half-open line interval a record's line falls into. One index type serves both

use serde::Serialize;

use crate::source::LineNum;

/// Anything positioned by a single source line
pub trait LineKeyed {
    fn line_num(&self) -> LineNum;
}

/// Half-open `[start, end)` line interval; `end == None` runs to end of input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval<T> {
    pub start: LineNum,
    pub end: Option<LineNum>,
    pub payload: T,
}

impl<T> Interval<T> {
    pub fn contains(&self, line: LineNum) -> bool {
        line >= self.start && self.end.map_or(true, |end| line < end)
    }
}

/// Sorted, non-overlapping intervals, read-only once built
#[derive(Debug, Clone)]
pub struct IntervalIndex<T> {
    entries: Vec<Interval<T>>,
}

impl<T> Default for IntervalIndex<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> IntervalIndex<T> {
    /// Consecutive boundaries: each interval ends where the next begins
    pub fn from_boundaries(mut starts: Vec<(LineNum, T)>) -> Self {
        starts.sort_by_key(|(start, _)| *start);
        let next_starts: Vec<Option<LineNum>> = starts
            .iter()
            .skip(1)
            .map(|(start, _)| Some(*start))
            .chain(std::iter::once(None))
            .collect();
        let entries = starts
            .into_iter()
            .zip(next_starts)
            .map(|((start, payload), end)| Interval {
                start,
                end,
                payload,
            })
            .collect();
        Self { entries }
    }

    /// Explicit intervals; callers guarantee they do not overlap
    pub fn from_intervals(mut entries: Vec<Interval<T>>) -> Self {
        entries.sort_by_key(|entry| entry.start);
        debug_assert!(entries.windows(2).all(|pair| {
            pair[0].end.map_or(false, |end| end <= pair[1].start)
        }));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval<T>> {
        self.entries.iter()
    }

    /// Index of the interval containing a line, by binary search on starts
    pub fn position(&self, line: LineNum) -> Option<usize> {
        let after = self.entries.partition_point(|entry| entry.start <= line);
        let candidate = after.checked_sub(1)?;
        self.entries[candidate].contains(line).then_some(candidate)
    }

    pub fn find(&self, line: LineNum) -> Option<&Interval<T>> {
        self.position(line).map(|index| &self.entries[index])
    }

    /// Merge each interval's payload into the records it contains
    ///
    /// Records must arrive in ascending line order; the walk is a single
    /// merge over both sequences. `merge` returns the key recorded in the
    /// membership list of the interval, which is returned per interval.
    pub fn assign<'r, R, K>(
        &self,
        records: impl IntoIterator<Item = &'r mut R>,
        mut merge: impl FnMut(&mut R, &T) -> K,
    ) -> Vec<Vec<K>>
    where
        R: LineKeyed + 'r,
    {
        let mut members: Vec<Vec<K>> = self.entries.iter().map(|_| Vec::new()).collect();
        let mut cursor = 0;
        let mut previous_line = 0;

        for record in records {
            let line = record.line_num();
            debug_assert!(line >= previous_line, "records must be sorted by line");
            previous_line = line;

            while cursor < self.entries.len()
                && self.entries[cursor].end.map_or(false, |end| end <= line)
            {
                cursor += 1;
            }
            let Some(entry) = self.entries.get(cursor) else {
                break;
            };
            if entry.contains(line) {
                members[cursor].push(merge(record, &entry.payload));
            }
        }
        members
    }
}
