use crate::model::*;

use super::prepare::Prepared;

/// Grid width units for a cluster with `concurrent` columns (12-unit grid).
pub fn column_width(concurrent: usize) -> u8 {
    match concurrent {
        0 | 1 => 12,
        2 => 6,
        3 => 4,
        4 => 3,
        _ => 2,
    }
}

/// Column placement for one prepared appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Placement {
    pub column_index: usize,
    pub concurrent_count: usize,
}

/// Greedy sweep-line column assignment. `sorted` must be ordered by
/// `span.start`. Returns one placement per input, same order.
///
/// Placements are written into an index arena once a cluster closes, so
/// every member of a cluster ends up with the same `concurrent_count`.
pub(super) fn assign_columns(sorted: &[Prepared]) -> Vec<Placement> {
    let mut placements = vec![
        Placement {
            column_index: 0,
            concurrent_count: 1,
        };
        sorted.len()
    ];

    let mut column_ends: Vec<Ms> = Vec::new();
    let mut cluster: Vec<usize> = Vec::new();
    let mut cluster_end = Ms::MIN;

    for (i, item) in sorted.iter().enumerate() {
        debug_assert!(i == 0 || sorted[i - 1].span.start <= item.span.start);

        if cluster_end <= item.span.start {
            close_cluster(&mut placements, &cluster, column_ends.len());
            cluster.clear();
            column_ends.clear();
        }

        // Lowest free column wins, so columns stay stable across re-renders.
        let column = match column_ends.iter().position(|&end| end <= item.span.start) {
            Some(free) => {
                column_ends[free] = item.span.end;
                free
            }
            None => {
                column_ends.push(item.span.end);
                column_ends.len() - 1
            }
        };

        cluster_end = cluster_end.max(item.span.end);
        placements[i].column_index = column;
        cluster.push(i);
    }
    close_cluster(&mut placements, &cluster, column_ends.len());

    placements
}

fn close_cluster(placements: &mut [Placement], cluster: &[usize], columns: usize) {
    for &i in cluster {
        placements[i].concurrent_count = columns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(spans: &[(Ms, Ms)]) -> Vec<Prepared> {
        spans
            .iter()
            .enumerate()
            .map(|(index, &(s, e))| Prepared {
                index,
                span: Span::new(s, e),
            })
            .collect()
    }

    #[test]
    fn width_lookup() {
        assert_eq!(column_width(1), 12);
        assert_eq!(column_width(2), 6);
        assert_eq!(column_width(3), 4);
        assert_eq!(column_width(4), 3);
        assert_eq!(column_width(5), 2);
        assert_eq!(column_width(9), 2);
    }

    #[test]
    fn empty_input() {
        assert!(assign_columns(&[]).is_empty());
    }

    #[test]
    fn disjoint_items_each_own_cluster() {
        let p = assign_columns(&prepared(&[(0, 10), (10, 20), (30, 40)]));
        for placement in &p {
            assert_eq!(placement.column_index, 0);
            assert_eq!(placement.concurrent_count, 1);
        }
    }

    #[test]
    fn chain_reuses_freed_column() {
        // a:[0,10) b:[5,20) c:[10,25): c reuses a's column.
        let p = assign_columns(&prepared(&[(0, 10), (5, 20), (10, 25)]));
        assert_eq!(p[0].column_index, 0);
        assert_eq!(p[1].column_index, 1);
        assert_eq!(p[2].column_index, 0);
        assert!(p.iter().all(|x| x.concurrent_count == 2));
    }

    #[test]
    fn lowest_free_column_is_picked() {
        // Three columns open, then columns 0 and 2 free up at the same time.
        let p = assign_columns(&prepared(&[(0, 10), (1, 30), (2, 10), (10, 20)]));
        assert_eq!(p[3].column_index, 0);
        assert!(p.iter().all(|x| x.concurrent_count == 3));
    }

    #[test]
    fn nested_intervals() {
        let p = assign_columns(&prepared(&[(0, 100), (10, 20), (30, 40), (50, 60)]));
        assert_eq!(p[0].column_index, 0);
        assert!(p[1..].iter().all(|x| x.column_index == 1));
        assert!(p.iter().all(|x| x.concurrent_count == 2));
    }
}
