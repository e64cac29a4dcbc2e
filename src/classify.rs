use std::borrow::Borrow;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::record::{Field, Record, Value};

/// Key of a multi-field grouping: the selected values in selector order.
pub type CompoundKey = SmallVec<[Value; 8]>;

/// Groups keep first-seen key order and input order within a group.
pub type Groups<'a, K> = IndexMap<K, Vec<&'a Record>>;

#[inline]
pub(crate) fn rec<R: Borrow<Record>>(r: &R) -> &Record {
    r.borrow()
}

pub fn classify<'a, R: Borrow<Record>>(records: &'a [R], field: Field) -> Groups<'a, Value> {
    let mut groups: Groups<'a, Value> = IndexMap::new();
    for r in records {
        let r = rec(r);
        groups.entry(r.get(field)).or_default().push(r);
    }
    groups
}

pub fn classify_mult<'a, R: Borrow<Record>>(records: &'a [R], fields: &[Field]) -> Groups<'a, CompoundKey> {
    let mut groups: Groups<'a, CompoundKey> = IndexMap::new();
    for r in records {
        let r = rec(r);
        let key: CompoundKey = fields.iter().map(|f| r.get(*f)).collect();
        groups.entry(key).or_default().push(r);
    }
    groups
}

pub fn unique_values<R: Borrow<Record>>(records: &[R], field: Field) -> Vec<Value> {
    let mut seen: IndexMap<Value, ()> = IndexMap::new();
    for r in records {
        seen.entry(rec(r).get(field)).or_insert(());
    }
    seen.into_keys().collect()
}

pub fn filter_by<'a, R, P>(records: &'a [R], mut pred: P) -> Vec<&'a Record>
where
    R: Borrow<Record>,
    P: FnMut(&Record) -> bool,
{
    records.iter().map(rec).filter(|r| pred(*r)).collect()
}

pub fn filter_equal<'a, R: Borrow<Record>>(records: &'a [R], field: Field, value: &Value) -> Vec<&'a Record> {
    filter_by(records, |r| r.get(field) == *value)
}

pub fn filter_excluding<'a, R: Borrow<Record>>(records: &'a [R], field: Field, value: &Value) -> Vec<&'a Record> {
    filter_by(records, |r| r.get(field) != *value)
}

pub fn filter_in_set<'a, R: Borrow<Record>>(records: &'a [R], field: Field, allowed: &[Value]) -> Vec<&'a Record> {
    let allowed: IndexMap<&Value, ()> = allowed.iter().map(|v| (v, ())).collect();
    filter_by(records, |r| allowed.contains_key(&r.get(field)))
}

/// True when at least one record matches every `(field, value)` pair.
pub fn contains_matching<R: Borrow<Record>>(records: &[R], pairs: &[(Field, Value)]) -> bool {
    records
        .iter()
        .any(|r| pairs.iter().all(|(f, v)| rec(r).get(*f) == *v))
}

/// Stable ascending sort on a numeric field; categorical fields sort by text.
pub fn sort_by_field<'a, R: Borrow<Record>>(records: &'a [R], field: Field) -> Vec<&'a Record> {
    let mut out: Vec<&Record> = records.iter().map(rec).collect();
    out.sort_by(|a, b| match (a.number(field), b.number(field)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.get(field).to_string().cmp(&b.get(field).to_string()),
    });
    out
}
