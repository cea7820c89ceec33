use crate::model::*;

use super::{MIN_DURATION_MS, ROW_HEIGHT_PX, ROW_MS};

/// An appointment that survived window filtering, before column assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Prepared {
    pub index: usize,
    pub span: Span,
}

/// Filter, extend, and clip one appointment against the visible window.
/// Returns `None` when the appointment has nothing to show.
pub(super) fn prepare(index: usize, span: Span, window: &Span) -> Option<Prepared> {
    if span.end <= window.start || span.start >= window.end {
        tracing::trace!(index, "appointment outside day window, dropped");
        return None;
    }
    if span.is_empty() {
        tracing::trace!(index, "appointment with non-positive duration, dropped");
        return None;
    }

    // Minimum visible length is applied before clipping.
    let end = if span.duration_ms() < MIN_DURATION_MS {
        span.start.saturating_add(MIN_DURATION_MS)
    } else {
        span.end
    };
    let clipped = Span::unchecked(span.start, end).clamp_to(window)?;
    Some(Prepared { index, span: clipped })
}

/// Row geometry for a clipped span: `(start_row, row_span, top_margin, bottom_margin)`.
/// Rows are half hours counted from `window.start`.
pub(super) fn row_geometry(span: &Span, window: &Span) -> (usize, usize, u32, u32) {
    let rel_start = span.start.saturating_sub(window.start);
    let rel_end = span.end.saturating_sub(window.start);

    let start_row = rel_start.div_euclid(ROW_MS);
    let end_row = rel_end.saturating_add(ROW_MS - 1).div_euclid(ROW_MS);

    let top = rel_start - start_row * ROW_MS;
    let bottom = (end_row * ROW_MS).saturating_sub(rel_end).max(0);

    (
        start_row as usize,
        (end_row - start_row) as usize,
        to_px(top),
        to_px(bottom),
    )
}

fn to_px(offset: Ms) -> u32 {
    (offset * ROW_HEIGHT_PX as Ms / ROW_MS) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: Ms = MINUTE_MS;
    const H: Ms = HOUR_MS;

    fn window() -> Span {
        Span::new(9 * H, 15 * H)
    }

    #[test]
    fn short_appointment_extended_to_minimum() {
        let p = prepare(0, Span::new(10 * H, 10 * H + 5 * M), &window()).unwrap();
        assert_eq!(p.span, Span::new(10 * H, 10 * H + 20 * M));
    }

    #[test]
    fn twenty_minutes_untouched() {
        let span = Span::new(10 * H, 10 * H + 20 * M);
        let p = prepare(0, span, &window()).unwrap();
        assert_eq!(p.span, span);
    }

    #[test]
    fn extension_happens_before_clipping() {
        // 5 minutes right before the window end: extended to 20, then clipped back.
        let p = prepare(0, Span::new(15 * H - 5 * M, 15 * H - M), &window()).unwrap();
        assert_eq!(p.span, Span::new(15 * H - 5 * M, 15 * H));
    }

    #[test]
    fn short_appointment_before_window_is_not_pulled_in() {
        // Ends 5 minutes before the window starts; extension must not resurrect it.
        assert!(prepare(0, Span::new(9 * H - 15 * M, 9 * H - 10 * M), &window()).is_none());
    }

    #[test]
    fn clipped_to_window_start() {
        let p = prepare(0, Span::new(8 * H, 10 * H), &window()).unwrap();
        assert_eq!(p.span.start, 9 * H);
        assert_eq!(p.span.end, 10 * H);
    }

    #[test]
    fn outside_window_dropped() {
        assert!(prepare(0, Span::new(7 * H, 8 * H), &window()).is_none());
        assert!(prepare(0, Span::new(15 * H, 16 * H), &window()).is_none());
        assert!(prepare(0, Span::new(8 * H, 9 * H), &window()).is_none()); // touches start
    }

    #[test]
    fn degenerate_dropped() {
        assert!(prepare(0, Span::unchecked(10 * H, 10 * H), &window()).is_none());
        assert!(prepare(0, Span::unchecked(11 * H, 10 * H), &window()).is_none());
    }

    #[test]
    fn geometry_aligned() {
        let w = window();
        let (row, span, top, bottom) = row_geometry(&Span::new(10 * H, 11 * H), &w);
        assert_eq!((row, span, top, bottom), (2, 2, 0, 0));
    }

    #[test]
    fn geometry_unaligned() {
        let w = window();
        // 10:10 → 10:40 covers rows 10:00 and 10:30.
        let (row, span, top, bottom) = row_geometry(&Span::new(10 * H + 10 * M, 10 * H + 40 * M), &w);
        assert_eq!(row, 2);
        assert_eq!(span, 2);
        assert_eq!(top, 10 * ROW_HEIGHT_PX / 30);
        assert_eq!(bottom, 20 * ROW_HEIGHT_PX / 30);
    }
}
