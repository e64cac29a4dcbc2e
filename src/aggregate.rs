use std::borrow::Borrow;
use std::hash::Hash;

use indexmap::IndexMap;
use thiserror::Error;

use crate::classify::{classify_mult, rec, Groups};
use crate::record::{Field, Record};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("division by empty group while aggregating '{0}'")]
    EmptyGroup(Field),
    #[error("field '{0}' is not numeric")]
    NotNumeric(Field),
    #[error("field '{0}' is not a metric column and cannot be averaged")]
    NotMetric(Field),
}

type Result<T> = std::result::Result<T, AggregateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Max,
    Min,
}

fn number(r: &Record, field: Field) -> Result<f64> {
    r.number(field).ok_or(AggregateError::NotNumeric(field))
}

pub fn mean<R: Borrow<Record>>(records: &[R], field: Field) -> Result<f64> {
    if records.is_empty() {
        return Err(AggregateError::EmptyGroup(field));
    }
    let mut total = 0f64;
    for r in records {
        total += number(rec(r), field)?;
    }
    Ok(total / records.len() as f64)
}

// Position of the extremal `field` value; ties keep the earliest record.
fn extremum_index<R: Borrow<Record>>(records: &[R], field: Field, direction: Direction) -> Result<usize> {
    let mut best: Option<(f64, usize)> = None;
    for (i, r) in records.iter().enumerate() {
        let v = number(rec(r), field)?;
        let better = match (best, direction) {
            (None, _) => true,
            (Some((b, _)), Direction::Max) => v > b,
            (Some((b, _)), Direction::Min) => v < b,
        };
        if better {
            best = Some((v, i));
        }
    }
    best.map(|(_, i)| i).ok_or(AggregateError::EmptyGroup(field))
}

/// The record holding the extremal `field` value. Ties go to the earliest
/// record in input order.
pub fn extremum<R: Borrow<Record>>(records: &[R], field: Field, direction: Direction) -> Result<&Record> {
    extremum_index(records, field, direction).map(|i| rec(&records[i]))
}

pub fn max_value<R: Borrow<Record>>(records: &[R], field: Field) -> Result<f64> {
    extremum(records, field, Direction::Max).and_then(|r| number(r, field))
}

pub fn min_value<R: Borrow<Record>>(records: &[R], field: Field) -> Result<f64> {
    extremum(records, field, Direction::Min).and_then(|r| number(r, field))
}

fn extremum_in_class<'a, K: Clone + Hash + Eq>(
    groups: &Groups<'a, K>,
    field: Field,
    direction: Direction,
) -> Result<IndexMap<K, &'a Record>> {
    let mut out = IndexMap::with_capacity(groups.len());
    for (k, rows) in groups {
        out.insert(k.clone(), rows[extremum_index(rows, field, direction)?]);
    }
    Ok(out)
}

/// Per group, the member with the largest `field`.
pub fn highest_in_class<'a, K: Clone + Hash + Eq>(groups: &Groups<'a, K>, field: Field) -> Result<IndexMap<K, &'a Record>> {
    extremum_in_class(groups, field, Direction::Max)
}

pub fn lowest_in_class<'a, K: Clone + Hash + Eq>(groups: &Groups<'a, K>, field: Field) -> Result<IndexMap<K, &'a Record>> {
    extremum_in_class(groups, field, Direction::Min)
}

// Groups are scanned in insertion order and only a strictly better mean
// replaces the current pick, so equal means resolve to the first group seen.
fn extremal_group_mean<'g, K>(groups: &'g Groups<'_, K>, field: Field, direction: Direction) -> Result<Option<(f64, &'g K)>> {
    let mut best: Option<(f64, &K)> = None;
    for (k, rows) in groups {
        let m = mean(rows, field)?;
        let better = match (best, direction) {
            (None, _) => true,
            (Some((b, _)), Direction::Max) => m > b,
            (Some((b, _)), Direction::Min) => m < b,
        };
        if better {
            best = Some((m, k));
        }
    }
    Ok(best)
}

/// Largest group mean of `field` and the key holding it; None without groups.
pub fn highest_group_mean<'g, K>(groups: &'g Groups<'_, K>, field: Field) -> Result<Option<(f64, &'g K)>> {
    extremal_group_mean(groups, field, Direction::Max)
}

pub fn lowest_group_mean<'g, K>(groups: &'g Groups<'_, K>, field: Field) -> Result<Option<(f64, &'g K)>> {
    extremal_group_mean(groups, field, Direction::Min)
}

pub fn group_with_highest_mean<'g, K>(groups: &'g Groups<'_, K>, field: Field) -> Result<Option<&'g K>> {
    Ok(highest_group_mean(groups, field)?.map(|(_, k)| k))
}

pub fn group_with_lowest_mean<'g, K>(groups: &'g Groups<'_, K>, field: Field) -> Result<Option<&'g K>> {
    Ok(lowest_group_mean(groups, field)?.map(|(_, k)| k))
}

/// Collapses repeated trials: one record per combination of every field not in
/// `metric_fields`, with the metrics replaced by their group mean. The identity
/// columns come from the first record of each group.
pub fn average_metrics<R: Borrow<Record>>(records: &[R], metric_fields: &[Field]) -> Result<Vec<Record>> {
    if let Some(f) = metric_fields.iter().find(|f| !f.is_metric()) {
        return Err(AggregateError::NotMetric(*f));
    }
    let key_fields = Field::complement(metric_fields);
    let groups = classify_mult(records, &key_fields);
    let mut out = Vec::with_capacity(groups.len());
    for rows in groups.values() {
        let mut row = rows[0].clone();
        for f in metric_fields {
            row.set_metric(*f, mean(rows, *f)?);
        }
        out.push(row);
    }
    Ok(out)
}
