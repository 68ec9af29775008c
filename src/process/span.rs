// src/process/span.rs
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct Carry<C> {
    remaining: usize,
    cell: C,
}

/// Column index → rows still covered by a `rowspan` cell from an earlier row.
///
/// Scoped to one table and reset at every region marker. A column that is
/// not in the map has nothing left to carry.
#[derive(Debug, Clone)]
pub struct SpanCarry<C> {
    columns: BTreeMap<usize, Carry<C>>,
}

impl<C> Default for SpanCarry<C> {
    fn default() -> Self {
        Self {
            columns: BTreeMap::new(),
        }
    }
}

impl<C: Copy> SpanCarry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.columns.clear();
    }

    pub fn remaining(&self, column: usize) -> usize {
        self.columns.get(&column).map_or(0, |c| c.remaining)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of columns the next row inherits.
    pub fn covered(&self) -> usize {
        self.columns.len()
    }

    /// `cell` at `column` spans `rowspan` rows, the current one included.
    pub fn record(&mut self, column: usize, rowspan: usize, cell: C) {
        let remaining = rowspan.saturating_sub(1);
        if remaining == 0 {
            self.columns.remove(&column);
            return;
        }
        trace!(column, remaining, "carrying cell");
        self.columns.insert(column, Carry { remaining, cell });
    }

    /// Columns the next row inherits, in column order. Each carry shrinks by one row.
    pub fn take_row(&mut self) -> Vec<(usize, C)> {
        let covered: Vec<(usize, C)> = self.columns.iter().map(|(&i, c)| (i, c.cell)).collect();
        self.columns.retain(|_, c| {
            c.remaining -= 1;
            c.remaining > 0
        });
        covered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_column_has_nothing_left() {
        let carry = SpanCarry::<&str>::new();
        assert_eq!(carry.remaining(4), 0);
        assert!(carry.is_empty());
    }

    #[test]
    fn rowspan_covers_following_rows() {
        let mut carry = SpanCarry::new();
        carry.record(1, 3, "Forsa");
        assert_eq!(carry.remaining(1), 2);
        assert_eq!(carry.covered(), 1);

        assert_eq!(carry.take_row(), vec![(1, "Forsa")]);
        assert_eq!(carry.remaining(1), 1);
        assert_eq!(carry.take_row(), vec![(1, "Forsa")]);
        assert_eq!(carry.remaining(1), 0);
        assert!(carry.take_row().is_empty());
    }

    #[test]
    fn single_row_span_is_not_carried() {
        let mut carry = SpanCarry::new();
        carry.record(0, 2, "a");
        carry.record(0, 1, "b");
        assert!(carry.is_empty());
    }

    #[test]
    fn columns_come_back_in_order_and_reset_clears() {
        let mut carry = SpanCarry::new();
        carry.record(5, 2, "x");
        carry.record(2, 4, "y");
        assert_eq!(carry.take_row(), vec![(2, "y"), (5, "x")]);
        assert_eq!(carry.take_row(), vec![(2, "y")]);
        carry.reset();
        assert_eq!(carry.remaining(2), 0);
        assert!(carry.take_row().is_empty());
    }
}
