//! Day planner layout: places a day's appointments into half-hour rows and
//! non-overlapping columns.

mod columns;
mod grid;
mod prepare;
mod source;

pub use columns::column_width;
pub use grid::grid_rows;
pub use source::{AppointmentSource, SourceError, StaticSource};

use crate::model::*;

/// One grid row is half an hour.
pub const ROW_MS: Ms = 30 * MINUTE_MS;

/// Shortest duration an appointment is drawn with.
pub const MIN_DURATION_MS: Ms = 20 * MINUTE_MS;

/// Rendered height of one row; margins are expressed in these pixels.
pub const ROW_HEIGHT_PX: u32 = 30;

/// Lay out `appointments` inside `window`.
///
/// Appointments outside the window or with non-positive duration are
/// dropped, never reported. The result is sorted by clipped start time;
/// ties keep input order. `LayoutSlot::index` refers back into `appointments`.
pub fn layout(appointments: &[Appointment], window: Span) -> Vec<LayoutSlot> {
    if window.is_empty() {
        return Vec::new();
    }

    let mut prepared: Vec<_> = appointments
        .iter()
        .enumerate()
        .filter_map(|(i, a)| prepare::prepare(i, a.span, &window))
        .collect();
    prepared.sort_by_key(|p| p.span.start);

    let placements = columns::assign_columns(&prepared);

    prepared
        .iter()
        .zip(placements)
        .map(|(p, placement)| {
            let (start_row, row_span, top_margin, bottom_margin) =
                prepare::row_geometry(&p.span, &window);
            LayoutSlot {
                index: p.index,
                span: p.span,
                start_row,
                row_span,
                top_margin,
                bottom_margin,
                concurrent_count: placement.concurrent_count,
                column_index: placement.column_index,
                column_width: column_width(placement.concurrent_count),
            }
        })
        .collect()
}

/// A fully laid-out day, ready for a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPlan {
    pub window: Span,
    pub appointments: Vec<Appointment>,
    pub slots: Vec<LayoutSlot>,
    pub rows: Vec<GridRow>,
}

impl DayPlan {
    pub fn build(appointments: Vec<Appointment>, window: Span) -> Self {
        let started = std::time::Instant::now();
        let slots = layout(&appointments, window);
        let rows = grid_rows(&slots, &window);
        metrics::histogram!(crate::observability::LAYOUT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(
            input = appointments.len(),
            placed = slots.len(),
            rows = rows.len(),
            "day plan built"
        );
        Self {
            window,
            appointments,
            slots,
            rows,
        }
    }

    /// Query every source for `user` and lay out the union. A failing
    /// source is logged and skipped so the page still renders.
    pub async fn gather(sources: &[&dyn AppointmentSource], user: UserId, window: Span) -> Self {
        let mut appointments = Vec::new();
        for source in sources {
            match source.appointments(user, window).await {
                Ok(mut found) => appointments.append(&mut found),
                Err(e) => {
                    tracing::warn!("appointment source {} failed for {user}: {e}", source.name());
                    metrics::counter!(crate::observability::SOURCE_FAILURES_TOTAL).increment(1);
                }
            }
        }
        Self::build(appointments, window)
    }

    /// The appointment a slot was built from.
    pub fn appointment(&self, slot: &LayoutSlot) -> &Appointment {
        &self.appointments[slot.index]
    }

    /// Resolve a grid cell to its slot and source appointment.
    pub fn resolve(&self, cell: &Cell) -> Option<(&LayoutSlot, &Appointment)> {
        match cell {
            Cell::Appointment(i) => {
                let slot = self.slots.get(*i)?;
                Some((slot, self.appointment(slot)))
            }
            Cell::Filter { .. } => None,
        }
    }
}
