//! Ordered line records of a chunk, with lookups by line number.
//!
//! A [`ChangeSet`] is immutable. Every slicing operation returns a new set
//! that remembers which indices of its source it was cut from
//! ([`ChangeSet::span`]), which is what lets context be gathered around an
//! extracted run.

use std::collections::HashMap;

use tracing::trace;

use crate::diff::line::{LineBasis, LineChange};
use crate::line_range::LineRange;

/// Inclusive index range into the sequence a subset was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpan {
    pub start: usize,
    pub end: usize,
}

/// Walk direction for [`ChangeSet::slice_by_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineEntry {
    position: usize,
    counterpart: Option<u32>,
}

/// First, last and count of the line numbers seen on one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SideSummary {
    first: Option<u32>,
    last: Option<u32>,
    count: usize,
}

impl SideSummary {
    fn record(&mut self, line: u32) {
        self.first.get_or_insert(line);
        self.last = Some(line);
        self.count += 1;
    }
}

/// An ordered sequence of [`LineChange`] records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<LineChange>,
    span: Option<IndexSpan>,
    before: SideSummary,
    after: SideSummary,
    before_index: HashMap<u32, LineEntry>,
    after_index: HashMap<u32, LineEntry>,
}

impl ChangeSet {
    /// Build a set covering `changes` in full.
    #[must_use]
    pub fn new(changes: Vec<LineChange>) -> Self {
        let span = changes
            .len()
            .checked_sub(1)
            .map(|end| IndexSpan { start: 0, end });
        Self::with_span(changes, span)
    }

    fn with_span(changes: Vec<LineChange>, span: Option<IndexSpan>) -> Self {
        let mut before = SideSummary::default();
        let mut after = SideSummary::default();
        let mut before_index = HashMap::new();
        let mut after_index = HashMap::new();

        for (position, change) in changes.iter().enumerate() {
            if let Some(line) = change.line_before() {
                before.record(line);
                before_index.insert(
                    line,
                    LineEntry {
                        position,
                        counterpart: change.line_after(),
                    },
                );
            }
            if let Some(line) = change.line_after() {
                after.record(line);
                after_index.insert(
                    line,
                    LineEntry {
                        position,
                        counterpart: change.line_before(),
                    },
                );
            }
        }

        Self {
            changes,
            span,
            before,
            after,
            before_index,
            after_index,
        }
    }

    #[must_use]
    pub fn changes(&self) -> &[LineChange] {
        &self.changes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LineChange> {
        self.changes.get(index)
    }

    /// Indices of the source sequence this set was cut from.
    #[must_use]
    pub fn span(&self) -> Option<IndexSpan> {
        self.span
    }

    #[must_use]
    pub fn first_line_before(&self) -> Option<u32> {
        self.before.first
    }

    #[must_use]
    pub fn last_line_before(&self) -> Option<u32> {
        self.before.last
    }

    /// Number of records carrying a before-line number.
    #[must_use]
    pub fn before_line_count(&self) -> usize {
        self.before.count
    }

    #[must_use]
    pub fn first_line_after(&self) -> Option<u32> {
        self.after.first
    }

    #[must_use]
    pub fn last_line_after(&self) -> Option<u32> {
        self.after.last
    }

    /// Number of records carrying an after-line number.
    #[must_use]
    pub fn after_line_count(&self) -> usize {
        self.after.count
    }

    fn index(&self, basis: LineBasis) -> &HashMap<u32, LineEntry> {
        match basis {
            LineBasis::Before => &self.before_index,
            LineBasis::After => &self.after_index,
        }
    }

    fn lookup(&self, basis: LineBasis, line: i64) -> Option<&LineEntry> {
        u32::try_from(line)
            .ok()
            .and_then(|line| self.index(basis).get(&line))
    }

    /// Position of the record numbered `line` on the given side.
    #[must_use]
    pub fn position_of(&self, basis: LineBasis, line: u32) -> Option<usize> {
        self.index(basis).get(&line).map(|entry| entry.position)
    }

    /// Before-line paired with `line_after`, if that record is context.
    #[must_use]
    pub fn before_line_for_after_line(&self, line_after: u32) -> Option<u32> {
        self.after_index.get(&line_after)?.counterpart
    }

    /// After-line paired with `line_before`, if that record is context.
    #[must_use]
    pub fn after_line_for_before_line(&self, line_before: u32) -> Option<u32> {
        self.before_index.get(&line_before)?.counterpart
    }

    /// Before-line at or nearest above the record numbered `line_after`.
    ///
    /// Added records have no before-line; for those the walk goes backward
    /// to the closest record that has one.
    #[must_use]
    pub fn find_before_line_for_after_line(&self, line_after: u32) -> Option<u32> {
        let entry = self.after_index.get(&line_after)?;
        if entry.counterpart.is_some() {
            return entry.counterpart;
        }
        self.changes[..entry.position]
            .iter()
            .rev()
            .find_map(LineChange::line_before)
    }

    /// Records from the one numbered `start` to the one numbered `end`.
    ///
    /// A bound with no matching record is widened to the sequence edge; when
    /// neither bound matches the result is empty.
    #[must_use]
    pub fn slice_by_line_range(&self, start: i64, end: i64, basis: LineBasis) -> ChangeSet {
        let (start, end) = if start > end {
            (end, start)
        } else {
            (start, end)
        };
        let first = self.lookup(basis, start).map(|entry| entry.position);
        let last = self.lookup(basis, end).map(|entry| entry.position);

        let bounds = match (first, last) {
            (Some(first), Some(last)) => Some((first, last)),
            (Some(first), None) => self.len().checked_sub(1).map(|last| (first, last)),
            (None, Some(last)) => Some((0, last)),
            (None, None) => None,
        };

        match bounds {
            Some((first, last)) if first <= last => Self::with_span(
                self.changes[first..=last].to_vec(),
                Some(IndexSpan {
                    start: first,
                    end: last,
                }),
            ),
            _ => Self::default(),
        }
    }

    /// The contiguous run of added/deleted records touched by the after-file
    /// lines `start..=end`.
    ///
    /// The scan tracks the most recent after-line number seen. The run begins
    /// at the first modified record reached once that number is `>= start`
    /// and stops once it is `>= end`. Deletions in front of the first
    /// after-numbered record only belong to a selection starting at line 1.
    /// With `include_preceding_deletions`, a run that opens with an addition
    /// also takes the deletions directly above it, looking past at most one
    /// other addition. Trailing context is trimmed, so the run never starts
    /// or ends with an unchanged record.
    #[must_use]
    pub fn extract_modified_run(
        &self,
        start: i64,
        end: i64,
        include_preceding_deletions: bool,
    ) -> ChangeSet {
        let (start, end) = if start > end {
            (end, start)
        } else {
            (start, end)
        };

        let mut run: Vec<LineChange> = Vec::new();
        let mut pending: Vec<LineChange> = Vec::new();
        let mut first: Option<usize> = None;
        let mut last: Option<usize> = None;
        let mut current_after: Option<i64> = None;
        let mut entered = false;

        for (i, change) in self.changes.iter().enumerate() {
            if let Some(line) = change.line_after() {
                current_after = Some(line.into());
            }
            let Some(after) = current_after else {
                let marks_pending = change.is_end_of_file_marker() && !pending.is_empty();
                if start == 1 && (matches!(change, LineChange::Deleted { .. }) || marks_pending) {
                    pending.push(change.clone());
                }
                continue;
            };

            entered |= after >= start;
            let at_end = after >= end;

            if entered && first.is_none() && change.is_modified() {
                first = Some(i);
            }

            if first.is_some() {
                if !pending.is_empty() {
                    run.append(&mut pending);
                    first = Some(0);
                }
                run.push(change.clone());
                last = Some(i);
            } else {
                if !pending.is_empty() {
                    pending.push(change.clone());
                }
                if at_end && start == 1 && !pending.is_empty() {
                    last = Some(pending.len() - 1);
                    run.append(&mut pending);
                    first = Some(0);
                }
            }

            if at_end {
                break;
            }
        }

        // Deletions at the top of a chunk with nothing after them.
        if run.is_empty() && start == 1 && !pending.is_empty() {
            last = Some(pending.len() - 1);
            run.append(&mut pending);
            first = Some(0);
        }

        if include_preceding_deletions
            && matches!(run.first(), Some(LineChange::Added { .. }))
            && let Some(run_start) = first
        {
            let mut skipped_addition = false;
            let mut deletions = Vec::new();
            let mut new_start = run_start;
            for i in (0..run_start).rev() {
                match &self.changes[i] {
                    change @ LineChange::Deleted { .. } => {
                        deletions.push(change.clone());
                        new_start = i;
                    }
                    // Old last line without a newline, right above the run
                    change @ LineChange::EndOfFileMarker { .. }
                        if !skipped_addition && deletions.is_empty() =>
                    {
                        deletions.push(change.clone());
                        new_start = i;
                    }
                    LineChange::Added { .. } if !skipped_addition => skipped_addition = true,
                    _ => break,
                }
            }
            if deletions.iter().any(LineChange::is_modified) {
                deletions.reverse();
                deletions.append(&mut run);
                run = deletions;
                first = Some(new_start);
            }
        }

        let trailing_context = run
            .iter()
            .rev()
            .take_while(|change| matches!(change, LineChange::Unchanged { .. }))
            .count();
        run.truncate(run.len() - trailing_context);

        let mut span = match (first, last) {
            (Some(start), Some(end)) if !run.is_empty() => Some(IndexSpan {
                start,
                end: end - trailing_context,
            }),
            _ => None,
        };
        // A deleted line that had no newline keeps its marker.
        if let Some(span) = span.as_mut()
            && matches!(run.last(), Some(LineChange::Deleted { .. }))
            && let Some(marker) = self
                .changes
                .get(span.end + 1)
                .filter(|change| change.is_end_of_file_marker())
        {
            run.push(marker.clone());
            span.end += 1;
        }
        trace!(start, end, records = run.len(), ?span, "extracted modified run");
        Self::with_span(run, span)
    }

    /// [`extract_modified_run`](Self::extract_modified_run) for a chunk
    /// whose modified side starts at after-line `origin`.
    ///
    /// A set without any after-numbered record (deletions only, as git
    /// writes them with zero context) gives the scan nothing to test the
    /// selection against. Its deletions are laid over the after-lines
    /// `origin`, `origin + 1`, ... and those inside `start..=end` form the
    /// run. Any other set, or a selection starting at line 1, is handed to
    /// `extract_modified_run` unchanged.
    #[must_use]
    pub fn extract_modified_run_at(
        &self,
        origin: i64,
        start: i64,
        end: i64,
        include_preceding_deletions: bool,
    ) -> ChangeSet {
        let (start, end) = if start > end {
            (end, start)
        } else {
            (start, end)
        };
        if self.after.count > 0 || self.before.count == 0 || start <= 1 {
            return self.extract_modified_run(start, end, include_preceding_deletions);
        }

        let origin = origin.max(1);
        let picked: Vec<usize> = self
            .changes
            .iter()
            .enumerate()
            .filter(|(_, change)| change.line_before().is_some())
            .zip(origin..)
            .filter(|(_, line)| (start..=end).contains(line))
            .map(|((i, _), _)| i)
            .collect();

        let (Some(&first), Some(&last)) = (picked.first(), picked.last()) else {
            return Self::default();
        };
        let last = match self.changes.get(last + 1) {
            Some(change) if change.is_end_of_file_marker() => last + 1,
            _ => last,
        };
        trace!(origin, start, end, first, last, "extracted deletions");
        Self::with_span(
            self.changes[first..=last].to_vec(),
            Some(IndexSpan {
                start: first,
                end: last,
            }),
        )
    }

    /// Up to `size` records matching `predicate`, walking from `start`.
    ///
    /// The end-of-file marker closing the whole sequence is taken regardless
    /// of `predicate` and `size` whenever the record it annotates was taken,
    /// or the walk begins on it. Backward results keep source order.
    #[must_use]
    pub fn slice_by_index<P>(
        &self,
        start: usize,
        direction: Direction,
        size: usize,
        predicate: P,
    ) -> ChangeSet
    where
        P: Fn(&LineChange) -> bool,
    {
        let mut picked: Vec<usize> = Vec::new();
        let mut cursor = Some(start);

        while let Some(i) = cursor {
            let Some(change) = self.changes.get(i) else {
                break;
            };
            let closes_taken_line = i + 1 == self.len()
                && change.is_end_of_file_marker()
                && (i == start || picked.last().is_some_and(|&taken| taken + 1 == i));

            if picked.len() >= size && !closes_taken_line {
                break;
            }
            if closes_taken_line || predicate(change) {
                picked.push(i);
            }

            cursor = match direction {
                Direction::Forward => i.checked_add(1),
                Direction::Backward => i.checked_sub(1),
            };
        }

        if direction == Direction::Backward {
            picked.reverse();
        }

        let span = match (picked.first(), picked.last()) {
            (Some(&start), Some(&end)) => Some(IndexSpan { start, end }),
            _ => None,
        };
        let changes = picked.iter().map(|&i| self.changes[i].clone()).collect();
        Self::with_span(changes, span)
    }

    /// A copy where every deletion is context at its original position.
    #[must_use]
    pub fn convert_deleted_to_unchanged(&self) -> ChangeSet {
        let changes = self
            .changes
            .iter()
            .cloned()
            .map(LineChange::into_unchanged)
            .collect();
        Self::with_span(changes, self.span)
    }

    /// This set followed by each of `others`, in order.
    #[must_use]
    pub fn concat<'a, I>(&self, others: I) -> ChangeSet
    where
        I: IntoIterator<Item = &'a ChangeSet>,
    {
        let mut changes = self.changes.clone();
        for other in others {
            changes.extend_from_slice(&other.changes);
        }
        Self::new(changes)
    }

    /// Copy without the unchanged records at the end.
    #[must_use]
    pub fn trim_trailing_unchanged(&self) -> ChangeSet {
        let keep = self.len()
            - self
                .changes
                .iter()
                .rev()
                .take_while(|change| matches!(change, LineChange::Unchanged { .. }))
                .count();
        let span = self.span.and_then(|span| {
            let dropped = self.len() - keep;
            (keep > 0).then(|| IndexSpan {
                start: span.start,
                end: span.end - dropped,
            })
        });
        Self::with_span(self.changes[..keep].to_vec(), span)
    }

    /// Before-file extent: first before-line, before-line count.
    #[must_use]
    pub fn before_line_range(&self) -> Option<LineRange> {
        let first = self.before.first?;
        Some(LineRange::from_start_with_lines(
            first.into(),
            to_lines(self.before.count),
        ))
    }

    /// After-file extent: first after-line, after-line count.
    #[must_use]
    pub fn after_line_range(&self) -> Option<LineRange> {
        let first = self.after.first?;
        Some(LineRange::from_start_with_lines(
            first.into(),
            to_lines(self.after.count),
        ))
    }

    /// After-side anchor for a patch applied on top of the before-file.
    ///
    /// Starts at the first before-line and spans the after-line count. The
    /// target of the patch is the index, where none of the other unstaged
    /// changes have happened, so the hunk lands where its context is. With
    /// no after-lines the start is the line above, as git numbers it.
    #[must_use]
    pub fn after_line_range_for_patch(&self) -> Option<LineRange> {
        let first = i64::from(self.before.first?);
        let lines = to_lines(self.after.count);
        let start = if lines == 0 { first - 1 } else { first };
        Some(LineRange::from_start_with_lines(start, lines))
    }

    /// The records as patch body lines.
    ///
    /// An end-of-file marker is rendered as the final record, or right after
    /// the deleted line it annotates; anywhere else it is dropped.
    #[must_use]
    pub fn to_patch_lines(&self) -> Vec<String> {
        let last = self.len().saturating_sub(1);
        self.changes
            .iter()
            .enumerate()
            .filter(|&(i, change)| {
                !change.is_end_of_file_marker()
                    || i == last
                    || i.checked_sub(1)
                        .and_then(|previous| self.changes.get(previous))
                        .is_some_and(|previous| matches!(previous, LineChange::Deleted { .. }))
            })
            .map(|(_, change)| change.to_patch_line())
            .collect()
    }

    /// Before-line of a deleted record that carries a no-newline marker and
    /// lies inside `span`, when the marker is not the last record.
    ///
    /// Such a line cannot be turned into context: the old file ends with it,
    /// so anything added after it has to replace it.
    #[must_use]
    pub fn unterminated_line_in(&self, span: IndexSpan) -> Option<u32> {
        let last = self.len().checked_sub(1)?;
        (span.start..=span.end.min(last)).find_map(|i| match (&self.changes[i], self.changes.get(i + 1)) {
            (LineChange::Deleted { line_before, .. }, Some(next))
                if next.is_end_of_file_marker() && i + 1 < last =>
            {
                Some(*line_before)
            }
            _ => None,
        })
    }
}

impl From<Vec<LineChange>> for ChangeSet {
    fn from(changes: Vec<LineChange>) -> Self {
        Self::new(changes)
    }
}

impl FromIterator<LineChange> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = LineChange>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn to_lines(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use similar_asserts::assert_eq;

    fn ctx(content: &str, before: u32, after: u32) -> LineChange {
        LineChange::unchanged(content, before, after)
    }

    fn del(content: &str, before: u32) -> LineChange {
        LineChange::deleted(content, before)
    }

    fn add(content: &str, after: u32) -> LineChange {
        LineChange::added(content, after)
    }

    fn contents(set: &ChangeSet) -> Vec<String> {
        set.changes().iter().map(LineChange::to_patch_line).collect()
    }

    /// @@ -1,6 +1,6 @@ replacing line 3 and inserting after line 5
    fn sample() -> ChangeSet {
        ChangeSet::new(vec![
            ctx("one", 1, 1),
            ctx("two", 2, 2),
            del("three", 3),
            add("THREE", 3),
            ctx("four", 4, 4),
            ctx("five", 5, 5),
            add("five and a half", 6),
            ctx("six", 6, 7),
        ])
    }

    #[test]
    fn aggregates_per_side() {
        let set = sample();
        assert_eq!(set.first_line_before(), Some(1));
        assert_eq!(set.last_line_before(), Some(6));
        assert_eq!(set.before_line_count(), 6);
        assert_eq!(set.first_line_after(), Some(1));
        assert_eq!(set.last_line_after(), Some(7));
        assert_eq!(set.after_line_count(), 7);
        assert_eq!(set.span(), Some(IndexSpan { start: 0, end: 7 }));
    }

    #[test]
    fn empty_set_has_no_anchors() {
        let set = ChangeSet::default();
        assert!(set.is_empty());
        assert_eq!(set.span(), None);
        assert_eq!(set.before_line_range(), None);
        assert_eq!(set.after_line_range(), None);
    }

    #[test]
    fn reverse_lookups() {
        let set = sample();
        assert_eq!(set.position_of(LineBasis::After, 6), Some(6));
        assert_eq!(set.position_of(LineBasis::Before, 3), Some(2));
        assert_eq!(set.before_line_for_after_line(7), Some(6));
        assert_eq!(set.before_line_for_after_line(6), None);
        assert_eq!(set.after_line_for_before_line(3), None);
        assert_eq!(set.after_line_for_before_line(4), Some(4));
        assert_eq!(set.find_before_line_for_after_line(6), Some(5));
        assert_eq!(set.find_before_line_for_after_line(3), Some(3));
        assert_eq!(set.find_before_line_for_after_line(99), None);
    }

    #[test]
    fn slice_by_after_lines() {
        let set = sample().slice_by_line_range(3, 5, LineBasis::After);
        assert_eq!(contents(&set), vec!["+THREE", " four", " five"]);
        assert_eq!(set.span(), Some(IndexSpan { start: 3, end: 5 }));
    }

    #[test]
    fn slice_with_missing_end_runs_to_sequence_end() {
        let set = sample().slice_by_line_range(6, 40, LineBasis::Before);
        assert_eq!(contents(&set), vec![" six"]);

        let set = sample().slice_by_line_range(0, 2, LineBasis::Before);
        assert_eq!(contents(&set), vec![" one", " two"]);

        assert!(sample().slice_by_line_range(50, 60, LineBasis::After).is_empty());
    }

    #[test]
    fn extract_replacement_keeps_its_deletion() {
        let run = sample().extract_modified_run(3, 3, true);
        assert_eq!(contents(&run), vec!["-three", "+THREE"]);
        assert_eq!(run.span(), Some(IndexSpan { start: 2, end: 3 }));

        let run = sample().extract_modified_run(3, 3, false);
        assert_eq!(contents(&run), vec!["+THREE"]);
        assert_eq!(run.span(), Some(IndexSpan { start: 3, end: 3 }));
    }

    #[test]
    fn extract_trims_trailing_context() {
        let run = sample().extract_modified_run(2, 6, true);
        assert_eq!(
            contents(&run),
            vec!["-three", "+THREE", " four", " five", "+five and a half"]
        );
        assert_eq!(run.span(), Some(IndexSpan { start: 2, end: 6 }));

        let run = sample().extract_modified_run(3, 5, true);
        assert_eq!(contents(&run), vec!["-three", "+THREE"]);
        assert_eq!(run.span(), Some(IndexSpan { start: 2, end: 3 }));
    }

    #[test]
    fn extract_on_context_only_is_empty() {
        let run = sample().extract_modified_run(4, 5, true);
        assert!(run.is_empty());
        assert_eq!(run.span(), None);
    }

    #[test]
    fn leading_deletions_belong_to_line_one() {
        let set = ChangeSet::new(vec![
            del("gone", 1),
            ctx("two", 2, 1),
            ctx("three", 3, 2),
        ]);
        let run = set.extract_modified_run(1, 1, true);
        assert_eq!(contents(&run), vec!["-gone"]);
        assert_eq!(run.span(), Some(IndexSpan { start: 0, end: 0 }));

        assert!(set.extract_modified_run(2, 2, true).is_empty());
    }

    #[test]
    fn leading_deletions_join_a_later_modification() {
        let set = ChangeSet::new(vec![
            del("gone", 1),
            ctx("two", 2, 1),
            add("new", 2),
            ctx("three", 3, 3),
        ]);
        let run = set.extract_modified_run(1, 2, true);
        assert_eq!(contents(&run), vec!["-gone", " two", "+new"]);
        assert_eq!(run.span(), Some(IndexSpan { start: 0, end: 2 }));
    }

    #[test]
    fn chunk_of_only_deletions() {
        let set = ChangeSet::new(vec![del("a", 1), del("b", 2)]);
        let run = set.extract_modified_run(1, 1, true);
        assert_eq!(contents(&run), vec!["-a", "-b"]);
    }

    #[test]
    fn preceding_deletions_skip_one_addition() {
        let set = ChangeSet::new(vec![
            ctx("top", 1, 1),
            del("old", 2),
            add("first", 2),
            add("second", 3),
            ctx("bottom", 3, 4),
        ]);
        let run = set.extract_modified_run(3, 3, true);
        assert_eq!(contents(&run), vec!["-old", "+second"]);
        assert_eq!(run.span(), Some(IndexSpan { start: 1, end: 3 }));
    }

    #[test]
    fn slice_backward_with_predicate_keeps_order() {
        let set = sample();
        let header = set.slice_by_index(5, Direction::Backward, 3, |c| c.line_before().is_some());
        assert_eq!(contents(&header), vec!["-three", " four", " five"]);
        assert_eq!(header.span(), Some(IndexSpan { start: 2, end: 5 }));
    }

    #[test]
    fn slice_forward_stops_at_size_or_end() {
        let set = sample();
        let footer = set.slice_by_index(4, Direction::Forward, 2, |_| true);
        assert_eq!(contents(&footer), vec![" four", " five"]);

        let footer = set.slice_by_index(6, Direction::Forward, 3, |c| c.line_before().is_some());
        assert_eq!(contents(&footer), vec![" six"]);

        assert!(set.slice_by_index(40, Direction::Forward, 3, |_| true).is_empty());
    }

    #[test]
    fn trailing_marker_follows_its_line() {
        let set = ChangeSet::new(vec![
            ctx("a", 1, 1),
            del("b", 2),
            add("B", 2),
            LineChange::no_newline_marker(),
        ]);
        let footer = set.slice_by_index(3, Direction::Forward, 3, |c| c.line_before().is_some());
        assert_eq!(contents(&footer), vec!["\\ No newline at end of file"]);

        let full = set.slice_by_index(0, Direction::Forward, 3, |_| true);
        assert_eq!(full.len(), 4);
    }

    #[test]
    fn trailing_marker_of_skipped_line_is_left_out() {
        let set = ChangeSet::new(vec![
            ctx("a", 1, 1),
            ctx("b", 2, 2),
            add("c", 3),
            LineChange::no_newline_marker(),
        ]);
        let footer = set.slice_by_index(0, Direction::Forward, 3, |c| c.line_before().is_some());
        assert_eq!(contents(&footer), vec![" a", " b"]);
    }

    #[test]
    fn conversion_returns_new_set() {
        let set = sample();
        let converted = set.convert_deleted_to_unchanged();
        assert_eq!(converted.get(2), Some(&ctx("three", 3, 3)));
        assert_eq!(set.get(2), Some(&del("three", 3)));
        assert_eq!(converted.span(), set.span());
    }

    #[test]
    fn concat_preserves_order() {
        let head = ChangeSet::new(vec![ctx("a", 1, 1)]);
        let body = ChangeSet::new(vec![add("b", 2)]);
        let tail = ChangeSet::new(vec![ctx("c", 2, 3)]);
        let all = head.concat([&body, &tail]);
        assert_eq!(contents(&all), vec![" a", "+b", " c"]);
        assert_eq!(all.before_line_range(), Some(LineRange::new(1, 2)));
        assert_eq!(all.after_line_range(), Some(LineRange::new(1, 3)));
        assert_eq!(all.after_line_range_for_patch(), Some(LineRange::new(1, 3)));
    }

    #[test]
    fn trim_trailing_unchanged_adjusts_span() {
        let trimmed = sample().slice_by_line_range(3, 5, LineBasis::After).trim_trailing_unchanged();
        assert_eq!(contents(&trimmed), vec!["+THREE"]);
        assert_eq!(trimmed.span(), Some(IndexSpan { start: 3, end: 3 }));
    }

    #[test]
    fn marker_is_rendered_after_deletion_or_last() {
        let set = ChangeSet::new(vec![
            del("x", 1),
            LineChange::no_newline_marker(),
            add("x", 1),
            add("y", 2),
            LineChange::no_newline_marker(),
        ]);
        assert_eq!(
            set.to_patch_lines(),
            vec![
                "-x",
                "\\ No newline at end of file",
                "+x",
                "+y",
                "\\ No newline at end of file"
            ]
        );

        let converted = set.convert_deleted_to_unchanged();
        assert_eq!(
            converted.to_patch_lines(),
            vec![" x", "+x", "+y", "\\ No newline at end of file"]
        );
    }

    /// `a` then `b` without a newline, grown to `a`, `b`, `c`.
    fn appended_after_unterminated_line() -> ChangeSet {
        ChangeSet::new(vec![
            ctx("a", 1, 1),
            del("b", 2),
            LineChange::no_newline_marker(),
            add("b", 2),
            add("c", 3),
        ])
    }

    #[test]
    fn run_takes_marker_of_replaced_unterminated_line() {
        let set = appended_after_unterminated_line();
        let run = set.extract_modified_run(2, 3, true);
        assert_eq!(
            contents(&run),
            vec!["-b", "\\ No newline at end of file", "+b", "+c"]
        );
        assert_eq!(run.span(), Some(IndexSpan { start: 1, end: 4 }));
        assert_eq!(
            run.to_patch_lines(),
            vec!["-b", "\\ No newline at end of file", "+b", "+c"]
        );
    }

    #[test]
    fn leading_deletion_keeps_its_marker() {
        // `b` without a newline replaced by `B`, `c`
        let set = ChangeSet::new(vec![
            del("b", 1),
            LineChange::no_newline_marker(),
            add("B", 1),
            add("c", 2),
        ]);
        let run = set.extract_modified_run(1, 1, true);
        assert_eq!(
            contents(&run),
            vec!["-b", "\\ No newline at end of file", "+B"]
        );
        assert_eq!(run.span(), Some(IndexSpan { start: 0, end: 2 }));
    }

    #[test]
    fn unterminated_line_is_found_in_context_span() {
        let set = appended_after_unterminated_line();
        assert_eq!(set.unterminated_line_in(IndexSpan { start: 0, end: 1 }), Some(2));
        assert_eq!(set.unterminated_line_in(IndexSpan { start: 3, end: 4 }), None);

        let terminated = sample();
        assert_eq!(terminated.unterminated_line_in(IndexSpan { start: 0, end: 5 }), None);
    }

    /// `@@ -5,2 +4,0 @@` as git writes it with zero context.
    fn zero_context_deletions() -> ChangeSet {
        ChangeSet::new(vec![del("five", 5), del("six", 6)])
    }

    #[test]
    fn zero_context_deletions_sit_at_chunk_origin() {
        let set = zero_context_deletions();
        assert!(set.extract_modified_run(4, 5, true).is_empty());

        let both = set.extract_modified_run_at(4, 4, 5, true);
        assert_eq!(contents(&both), vec!["-five", "-six"]);
        assert_eq!(both.span(), Some(IndexSpan { start: 0, end: 1 }));
        assert_eq!(both.before_line_range(), Some(LineRange::new(5, 6)));
        assert_eq!(
            both.after_line_range_for_patch().map(|range| range.to_string()),
            Some("4,0".to_string())
        );

        let second = set.extract_modified_run_at(4, 5, 9, true);
        assert_eq!(contents(&second), vec!["-six"]);
        assert!(set.extract_modified_run_at(4, 7, 9, true).is_empty());
    }

    #[test]
    fn origin_is_ignored_when_after_lines_exist() {
        let set = sample();
        assert_eq!(
            set.extract_modified_run_at(1, 3, 3, true),
            set.extract_modified_run(3, 3, true)
        );
    }

    /// Random chunk bodies: 0 keeps a line, 1 deletes it, 2 adds one.
    fn arb_change_set() -> impl Strategy<Value = ChangeSet> {
        prop::collection::vec(0u8..3, 1..40).prop_map(|ops| {
            let (mut before, mut after) = (1u32, 1u32);
            ops.into_iter()
                .map(|op| match op {
                    0 => {
                        let change = ctx("same", before, after);
                        before += 1;
                        after += 1;
                        change
                    }
                    1 => {
                        let change = del("old", before);
                        before += 1;
                        change
                    }
                    _ => {
                        let change = add("new", after);
                        after += 1;
                        change
                    }
                })
                .collect::<ChangeSet>()
        })
    }

    proptest! {
        #[test]
        fn aggregates_match_records(set in arb_change_set()) {
            let before = set.changes().iter().filter(|c| c.line_before().is_some()).count();
            let after = set.changes().iter().filter(|c| c.line_after().is_some()).count();
            prop_assert_eq!(set.before_line_count(), before);
            prop_assert_eq!(set.after_line_count(), after);
        }

        #[test]
        fn run_is_bounded_by_modifications(
            set in arb_change_set(),
            start in 1i64..45,
            len in 0i64..10,
            preceding in any::<bool>(),
        ) {
            let run = set.extract_modified_run(start, start + len, preceding);
            if let (Some(first), Some(last)) = (run.changes().first(), run.changes().last()) {
                prop_assert!(first.is_modified());
                let ends_on_context = matches!(last, LineChange::Unchanged { .. });
                prop_assert!(!ends_on_context);
                let span = run.span().unwrap();
                prop_assert_eq!(set.get(span.end), Some(last));
            } else {
                prop_assert_eq!(run.span(), None);
            }
        }

        #[test]
        fn after_lookup_is_inverse(set in arb_change_set()) {
            for (position, change) in set.changes().iter().enumerate() {
                if let Some(line) = change.line_after() {
                    prop_assert_eq!(set.position_of(LineBasis::After, line), Some(position));
                }
            }
        }
    }
}
