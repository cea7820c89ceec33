use crate::model::*;

use super::columns::column_width;
use super::ROW_MS;

/// Build one row per half hour of `window`, padding sparse rows with
/// filter cells so every row renders the full width of its cluster.
pub fn grid_rows(slots: &[LayoutSlot], window: &Span) -> Vec<GridRow> {
    let mut rows = Vec::new();
    let mut row_time = window.start;
    // Slots are sorted by start, so new arrivals are a moving cursor.
    let mut cursor = 0;

    while row_time < window.end {
        let row_end = row_time.saturating_add(ROW_MS);
        let mut cells = Vec::new();

        let first_new = cursor;
        while cursor < slots.len() && slots[cursor].span.start < row_end {
            cells.push(Cell::Appointment(cursor));
            cursor += 1;
        }
        let new_count = cursor - first_new;

        // Everything before `first_new` started in an earlier row.
        let continuing = slots[..first_new]
            .iter()
            .filter(|s| s.span.contains_instant(row_time));
        let continuing_count = continuing.clone().count();

        // Widest cluster among everything visible in this row.
        let widest = slots[first_new..cursor]
            .iter()
            .chain(continuing)
            .max_by_key(|s| s.concurrent_count);

        match widest {
            Some(slot) => {
                let padding = slot
                    .concurrent_count
                    .saturating_sub(new_count + continuing_count);
                cells.extend(std::iter::repeat_n(
                    Cell::Filter {
                        width: slot.column_width,
                    },
                    padding,
                ));
            }
            None => cells.push(Cell::Filter {
                width: column_width(1),
            }),
        }

        rows.push(GridRow {
            time: row_time,
            cells,
        });
        row_time = row_end;
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Ms = HOUR_MS;
    const M: Ms = MINUTE_MS;

    fn slot(index: usize, start: Ms, end: Ms, concurrent: usize, column: usize) -> LayoutSlot {
        LayoutSlot {
            index,
            span: Span::new(start, end),
            start_row: 0,
            row_span: 0,
            top_margin: 0,
            bottom_margin: 0,
            concurrent_count: concurrent,
            column_index: column,
            column_width: column_width(concurrent),
        }
    }

    #[test]
    fn empty_day_is_all_full_width_filters() {
        let rows = grid_rows(&[], &Span::new(9 * H, 11 * H));
        assert_eq!(rows.len(), 4);
        for row in &rows {
            assert_eq!(row.cells, vec![Cell::Filter { width: 12 }]);
        }
        assert_eq!(rows[1].time, 9 * H + 30 * M);
    }

    #[test]
    fn continuing_appointment_suppresses_full_width_filter() {
        let slots = [slot(0, 9 * H, 10 * H, 1, 0)];
        let rows = grid_rows(&slots, &Span::new(9 * H, 10 * H + 30 * M));
        assert_eq!(rows[0].cells, vec![Cell::Appointment(0)]);
        assert!(rows[1].cells.is_empty());
        assert_eq!(rows[2].cells, vec![Cell::Filter { width: 12 }]);
    }

    #[test]
    fn sparse_row_padded_to_cluster_width() {
        // a:[9:00,10:00) col 0, b:[9:30,10:30) col 1, c:[10:00,10:30) col 0.
        let slots = [
            slot(0, 9 * H, 10 * H, 2, 0),
            slot(1, 9 * H + 30 * M, 10 * H + 30 * M, 2, 1),
            slot(2, 10 * H, 10 * H + 30 * M, 2, 0),
        ];
        let rows = grid_rows(&slots, &Span::new(9 * H, 11 * H));
        // 9:00: only a present, pad one filter of width 6.
        assert_eq!(rows[0].cells, vec![Cell::Appointment(0), Cell::Filter { width: 6 }]);
        // 9:30: b new, a continuing → no padding.
        assert_eq!(rows[1].cells, vec![Cell::Appointment(1)]);
        // 10:00: c new, b continuing.
        assert_eq!(rows[2].cells, vec![Cell::Appointment(2)]);
        // 10:30: nothing.
        assert_eq!(rows[3].cells, vec![Cell::Filter { width: 12 }]);
    }

    #[test]
    fn several_new_in_one_row() {
        let slots = [
            slot(0, 9 * H, 9 * H + 20 * M, 3, 0),
            slot(1, 9 * H + 5 * M, 9 * H + 25 * M, 3, 1),
            slot(2, 9 * H + 10 * M, 9 * H + 30 * M, 3, 2),
        ];
        let rows = grid_rows(&slots, &Span::new(9 * H, 10 * H));
        assert_eq!(
            rows[0].cells,
            vec![Cell::Appointment(0), Cell::Appointment(1), Cell::Appointment(2)]
        );
        assert_eq!(rows[1].cells, vec![Cell::Filter { width: 12 }]);
    }
}
