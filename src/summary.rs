use std::io::{self, Write};

use prettytable::{format, Cell, Row, Table};
use thiserror::Error;

use crate::aggregate::{highest_in_class, lowest_in_class, max_value, AggregateError};
use crate::classify::{classify, filter_equal};
use crate::record::{Field, Record, Value};

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub case: String,
    pub rows: usize,
    pub best_throughput: f64,
    pub best_thread_count: u64,
    pub best_selectivity: f64,
    pub worst_throughput: f64,
    pub worst_thread_count: u64,
    pub worst_selectivity: f64,
}

const HEADERS: [&str; 8] = ["case", "rows", "max GiB/s", "max tc", "max sel", "min GiB/s", "min tc", "min sel"];

impl SummaryRow {
    fn cells(&self) -> [String; 8] {
        [
            self.case.clone(),
            self.rows.to_string(),
            format!("{:.3}", self.best_throughput),
            self.best_thread_count.to_string(),
            self.best_selectivity.to_string(),
            format!("{:.3}", self.worst_throughput),
            self.worst_thread_count.to_string(),
            self.worst_selectivity.to_string(),
        ]
    }
}

/// Best and worst throughput per case, at the largest element count.
pub fn summarize(records: &[Record]) -> Result<Vec<SummaryRow>, SummaryError> {
    if records.is_empty() {
        return Ok(vec![]);
    }
    let max_elements = max_value(records, Field::ElementCount)? as u64;
    let slice = filter_equal(records, Field::ElementCount, &Value::Int(max_elements));
    let groups = classify(&slice, Field::Case);
    let best = highest_in_class(&groups, Field::Throughput)?;
    let worst = lowest_in_class(&groups, Field::Throughput)?;
    let mut out = Vec::with_capacity(groups.len());
    for (case, rows) in &groups {
        let (b, w) = (best[case], worst[case]);
        out.push(SummaryRow {
            case: case.to_string(),
            rows: rows.len(),
            best_throughput: b.throughput(),
            best_thread_count: b.thread_count(),
            best_selectivity: b.selectivity(),
            worst_throughput: w.throughput(),
            worst_thread_count: w.thread_count(),
            worst_selectivity: w.selectivity(),
        });
    }
    Ok(out)
}

/// Prints the summary as an aligned table, or as delimited text when
/// `csv_delimiter` is given.
pub fn write_summary<W: Write>(rows: &[SummaryRow], csv_delimiter: Option<&str>, writer: &mut W) -> Result<(), SummaryError> {
    match csv_delimiter {
        Some(od) => {
            writeln!(writer, "{}", HEADERS.join(od))?;
            for r in rows {
                writeln!(writer, "{}", r.cells().join(od))?;
            }
        }
        None => {
            let mut celltable = Table::new();
            celltable.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
            celltable.set_titles(Row::new(HEADERS.iter().map(|h| Cell::new(h)).collect()));
            for r in rows {
                celltable.add_row(Row::new(r.cells().iter().map(|c| Cell::new(c)).collect()));
            }
            celltable.print(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(approach: &str, tc: u64, elements: u64, sel: f64, ms: f64) -> Record {
        Record::new(approach, tc, "float", elements, "uniform", sel, ms).unwrap()
    }

    fn sample() -> Vec<Record> {
        vec![
            rec("a", 1, 1000, 0.5, 0.1),
            rec("a", 1, 2000, 0.5, 4.0),
            rec("a", 4, 2000, 0.1, 1.0),
            rec("b", 2, 2000, 0.5, 3.0),
        ]
    }

    #[test]
    fn per_case_extremes_at_largest_element_count() {
        let rows = summarize(&sample()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].case, "a-uniform-float");
        assert_eq!(rows[0].rows, 2);
        assert_eq!(rows[0].best_thread_count, 4);
        assert_eq!(rows[0].worst_thread_count, 1);
        assert_eq!(rows[0].best_selectivity, 0.1);
        assert_eq!(rows[1].best_throughput, rows[1].worst_throughput);
        assert!(summarize(&[]).unwrap().is_empty());
    }

    #[test]
    fn delimited_output() {
        let rows = summarize(&sample()).unwrap();
        let mut out = vec![];
        write_summary(&rows, Some(","), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "case,rows,max GiB/s,max tc,max sel,min GiB/s,min tc,min sel");
        assert!(lines[2].starts_with("b-uniform-float,1,"));
    }

    #[test]
    fn table_output_lists_every_case() {
        let rows = summarize(&sample()).unwrap();
        let mut out = vec![];
        write_summary(&rows, None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("max GiB/s"));
        assert!(text.contains("a-uniform-float"));
        assert!(text.contains("b-uniform-float"));
    }
}
