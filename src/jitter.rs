use std::borrow::Borrow;

use indexmap::IndexMap;

use crate::classify::{rec, CompoundKey};
use crate::record::{Field, Record};

#[derive(Debug, Clone, PartialEq)]
pub struct JitterReport {
    pub kept: Vec<Record>,
    pub dropped: usize,
}

impl JitterReport {
    pub fn filtered_percent(&self) -> f64 {
        let total = self.kept.len() + self.dropped;
        if total == 0 { 0.0 } else { 100.0 * self.dropped as f64 / total as f64 }
    }
}

/// Drops samples whose throughput strays more than `max_relative_deviation`
/// times the mean from the mean of their configuration group (every field
/// except the metrics).
///
/// Each group is trimmed on its own working copy: the farthest sample is
/// dropped while it violates the bound, then the mean is recomputed over the
/// survivors. The input is never mutated and the surviving records keep their
/// input order.
pub fn filter_jitter<R: Borrow<Record>>(records: &[R], max_relative_deviation: f64) -> JitterReport {
    let key_fields = Field::complement(&Field::METRICS);
    let mut groups: IndexMap<CompoundKey, Vec<usize>> = IndexMap::new();
    for (i, r) in records.iter().map(rec).enumerate() {
        let key: CompoundKey = key_fields.iter().map(|f| r.get(*f)).collect();
        groups.entry(key).or_default().push(i);
    }

    let throughput = |i: usize| rec(&records[i]).throughput();
    let mut rejected = vec![false; records.len()];
    for mut working in groups.into_values() {
        while working.len() > 1 {
            let avg = working.iter().map(|&i| throughput(i)).sum::<f64>() / working.len() as f64;
            let mut worst: Option<(usize, f64)> = None;
            for (pos, &i) in working.iter().enumerate() {
                let dev = (throughput(i) - avg).abs();
                if worst.map_or(true, |(_, d)| dev > d) {
                    worst = Some((pos, dev));
                }
            }
            match worst {
                Some((pos, dev)) if dev > avg * max_relative_deviation => {
                    rejected[working.remove(pos)] = true;
                }
                _ => break,
            }
        }
    }

    let kept: Vec<Record> = records
        .iter()
        .zip(&rejected)
        .filter(|(_, gone)| !**gone)
        .map(|(r, _)| rec(r).clone())
        .collect();
    let dropped = records.len() - kept.len();
    JitterReport { kept, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::throughput_gib_s;

    const ELEMENTS: u64 = 1 << 30;

    // runtime giving the requested throughput for 4 + 0.125 bytes per element
    fn at_throughput(approach: &str, gib_s: f64) -> Record {
        let ms = (4.125 * ELEMENTS as f64) / (gib_s * (1u64 << 30) as f64) * 1000.0;
        Record::new(approach, 1, "float", ELEMENTS, "uniform", 0.5, ms).unwrap()
    }

    fn throughputs(rows: &[Record]) -> Vec<f64> {
        rows.iter().map(|r| (r.throughput() * 1000.0).round() / 1000.0).collect()
    }

    #[test]
    fn helper_hits_requested_throughput() {
        let r = at_throughput("a", 100.0);
        assert!((r.throughput() - 100.0).abs() < 1e-9);
        assert_eq!(r.throughput(), throughput_gib_s(4, ELEMENTS, r.runtime_ms()));
    }

    #[test]
    fn drops_single_outlier() {
        let rows = vec![
            at_throughput("a", 100.0),
            at_throughput("a", 100.0),
            at_throughput("a", 100.0),
            at_throughput("a", 200.0),
        ];
        let report = filter_jitter(&rows, 0.1);
        assert_eq!(report.dropped, 1);
        assert_eq!(throughputs(&report.kept), vec![100.0, 100.0, 100.0]);
        assert!((report.filtered_percent() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn trims_until_the_group_settles() {
        // 400 goes first (mean 158.3), then 150 against the new mean of 110
        let rows = vec![
            at_throughput("a", 100.0),
            at_throughput("a", 150.0),
            at_throughput("a", 100.0),
            at_throughput("a", 400.0),
            at_throughput("a", 100.0),
            at_throughput("a", 100.0),
        ];
        let report = filter_jitter(&rows, 0.2);
        assert_eq!(report.dropped, 2);
        assert_eq!(throughputs(&report.kept), vec![100.0, 100.0, 100.0, 100.0]);
    }

    #[test]
    fn groups_are_judged_independently_and_order_is_kept() {
        let rows = vec![
            at_throughput("b", 50.0),
            at_throughput("a", 100.0),
            at_throughput("b", 52.0),
            at_throughput("a", 101.0),
        ];
        let report = filter_jitter(&rows, 0.1);
        assert_eq!(report.dropped, 0);
        let order: Vec<&str> = report.kept.iter().map(|r| r.approach()).collect();
        assert_eq!(order, vec!["b", "a", "b", "a"]);
    }

    #[test]
    fn input_is_left_untouched() {
        let rows = vec![at_throughput("a", 10.0), at_throughput("a", 100.0), at_throughput("a", 100.0)];
        let before = rows.clone();
        let report = filter_jitter(&rows, 0.1);
        assert_eq!(rows, before);
        assert_eq!(report.kept.len() + report.dropped, rows.len());
    }

    #[test]
    fn repeated_references_are_judged_per_position() {
        let (steady, spike) = (at_throughput("a", 100.0), at_throughput("a", 200.0));
        let rows: Vec<&Record> = vec![&steady, &steady, &spike, &steady, &steady, &steady];
        let report = filter_jitter(&rows, 0.1);
        assert_eq!(report.dropped, 1);
        assert_eq!(throughputs(&report.kept), vec![100.0; 5]);

        // identical samples at both ends: one trim leaves the other further out
        let rows: Vec<&Record> = vec![&spike, &steady, &steady, &steady, &steady, &spike];
        let report = filter_jitter(&rows, 0.1);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.kept.len(), 4);
    }

    #[test]
    fn singletons_and_empty_input_are_kept() {
        let rows: Vec<Record> = vec![];
        let report = filter_jitter(&rows, 0.1);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.filtered_percent(), 0.0);
        let one = vec![at_throughput("a", 1.0)];
        assert_eq!(filter_jitter(&one, 0.0).dropped, 0);
    }
}
