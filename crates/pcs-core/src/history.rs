//! Date-keyed sorted series with as-of lookup.

use chrono::NaiveDate;

/// A mapping from date to value, kept in chronological order with unique
/// keys. Appending to an existing date replaces the value.
#[derive(Debug, Clone, PartialEq)]
pub struct History<V> {
    entries: Vec<(NaiveDate, V)>,
}

impl<V> Default for History<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> History<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert preserving chronological order; replace on date collision.
    pub fn append(&mut self, date: NaiveDate, value: V) {
        match self.entries.binary_search_by_key(&date, |(d, _)| *d) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (date, value)),
        }
    }

    /// Exact-date lookup.
    pub fn get(&self, date: NaiveDate) -> Option<&V> {
        self.entries
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// The latest entry on or before `date`.
    pub fn value_as_of(&self, date: NaiveDate) -> Option<(NaiveDate, &V)> {
        let idx = self.entries.partition_point(|(d, _)| *d <= date);
        if idx == 0 {
            return None;
        }
        let (d, v) = &self.entries[idx - 1];
        Some((*d, v))
    }

    pub fn first(&self) -> Option<(NaiveDate, &V)> {
        self.entries.first().map(|(d, v)| (*d, v))
    }

    pub fn last(&self) -> Option<(NaiveDate, &V)> {
        self.entries.last().map(|(d, v)| (*d, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &V)> {
        self.entries.iter().map(|(d, v)| (*d, v))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.iter().map(|(d, _)| *d)
    }
}

/// The sorted union of all dates across the given sequences, each date
/// yielded exactly once.
pub fn merged_dates<I>(sequences: I) -> Vec<NaiveDate>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = NaiveDate>,
{
    let mut dates: Vec<NaiveDate> = sequences.into_iter().flatten().collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}
