use std::fmt;
use std::hash::{Hash, Hasher};

use csv::StringRecord;
use thiserror::Error;

// one bit of mask per element
const MASK_BYTES_PER_ELEMENT: f64 = 0.125;
const GIB: f64 = (1u64 << 30) as f64;

/// Byte width the benchmark accounts for each element type.
static DATA_TYPE_WIDTHS: [(&str, u32); 6] = [
    ("float", 4),
    ("double", 8),
    ("uint8_t", 4),
    ("uint16_t", 4),
    ("uint32_t", 4),
    ("uint64_t", 8),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("missing field '{0}'")]
    MissingField(Field),
    #[error("field '{field}' is not a valid number: \"{raw}\"")]
    InvalidNumber { field: Field, raw: String },
    #[error("unknown data type \"{0}\"")]
    UnknownDataType(String),
    #[error("field '{field}' out of range: {reason}")]
    OutOfRange { field: Field, reason: &'static str },
}

pub fn byte_width(data_type: &str) -> Result<u32, RecordError> {
    DATA_TYPE_WIDTHS
        .iter()
        .find(|(name, _)| *name == data_type)
        .map(|&(_, w)| w)
        .ok_or_else(|| RecordError::UnknownDataType(data_type.to_string()))
}

/// Throughput in GiB/s, counting the payload plus its mask bit.
pub fn throughput_gib_s(byte_width: u32, element_count: u64, runtime_ms: f64) -> f64 {
    (byte_width as f64 + MASK_BYTES_PER_ELEMENT) * element_count as f64 / runtime_ms * 1000.0 / GIB
}

/// Named selector for every column of a [`Record`], in input order followed by
/// the two derived columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Approach,
    ThreadCount,
    DataType,
    ElementCount,
    MaskDistributionKind,
    Selectivity,
    RuntimeMs,
    Throughput,
    Case,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Approach,
        Field::ThreadCount,
        Field::DataType,
        Field::ElementCount,
        Field::MaskDistributionKind,
        Field::Selectivity,
        Field::RuntimeMs,
        Field::Throughput,
        Field::Case,
    ];
    /// Columns that vary between repeated trials of the same configuration.
    pub const METRICS: [Field; 2] = [Field::RuntimeMs, Field::Throughput];
    /// Columns read from the input table, in column order.
    pub const INPUT: [Field; 7] = [
        Field::Approach,
        Field::ThreadCount,
        Field::DataType,
        Field::ElementCount,
        Field::MaskDistributionKind,
        Field::Selectivity,
        Field::RuntimeMs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Approach => "approach",
            Field::ThreadCount => "thread_count",
            Field::DataType => "data_type",
            Field::ElementCount => "element_count",
            Field::MaskDistributionKind => "mask_distribution_kind",
            Field::Selectivity => "selectivity",
            Field::RuntimeMs => "runtime_ms",
            Field::Throughput => "throughput",
            Field::Case => "case",
        }
    }

    pub fn is_metric(self) -> bool {
        Field::METRICS.contains(&self)
    }

    /// Every field not in `excluded`, in schema order.
    pub fn complement(excluded: &[Field]) -> Vec<Field> {
        Field::ALL.iter().copied().filter(|f| !excluded.contains(f)).collect()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single field value usable as (part of) a group key.
///
/// Floats compare by numeric value, so `0.0` and `-0.0` land in the same
/// group. Records never carry NaN; construction rejects it.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Int(u64),
    Float(f64),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Text(_) => None,
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Int(i) => i.hash(state),
            // +0.0 and -0.0 are equal so they must hash alike
            Value::Float(f) => (if *f == 0.0 { 0u64 } else { f.to_bits() }).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// One benchmark measurement with its derived throughput and case label.
///
/// Identity fields are fixed at construction; only the metric fields are ever
/// replaced, and only by the averaging pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    approach: String,
    thread_count: u64,
    data_type: String,
    element_count: u64,
    mask_distribution_kind: String,
    selectivity: f64,
    runtime_ms: f64,
    throughput: f64,
    case: String,
}

impl Record {
    pub fn new(
        approach: &str,
        thread_count: u64,
        data_type: &str,
        element_count: u64,
        mask_distribution_kind: &str,
        selectivity: f64,
        runtime_ms: f64,
    ) -> Result<Record, RecordError> {
        let width = byte_width(data_type)?;
        if thread_count == 0 {
            return Err(RecordError::OutOfRange { field: Field::ThreadCount, reason: "must be positive" });
        }
        if element_count == 0 {
            return Err(RecordError::OutOfRange { field: Field::ElementCount, reason: "must be positive" });
        }
        if !(0.0..=1.0).contains(&selectivity) {
            return Err(RecordError::OutOfRange { field: Field::Selectivity, reason: "must be within [0, 1]" });
        }
        if !(runtime_ms > 0.0 && runtime_ms.is_finite()) {
            return Err(RecordError::OutOfRange { field: Field::RuntimeMs, reason: "must be a positive number" });
        }
        Ok(Record {
            approach: approach.to_string(),
            thread_count,
            data_type: data_type.to_string(),
            element_count,
            mask_distribution_kind: mask_distribution_kind.to_string(),
            selectivity,
            runtime_ms,
            throughput: throughput_gib_s(width, element_count, runtime_ms),
            case: format!("{}-{}-{}", approach, mask_distribution_kind, data_type),
        })
    }

    /// Builds a record from one data row of the input table. Extra trailing
    /// columns are ignored; missing ones are an error.
    pub fn parse(row: &StringRecord) -> Result<Record, RecordError> {
        let text = |field: Field| -> Result<&str, RecordError> {
            row.get(field_column(field)).ok_or(RecordError::MissingField(field))
        };
        let int = |field: Field| -> Result<u64, RecordError> {
            let raw = text(field)?;
            raw.trim().parse::<u64>().map_err(|_| RecordError::InvalidNumber { field, raw: raw.to_string() })
        };
        let float = |field: Field| -> Result<f64, RecordError> {
            let raw = text(field)?;
            raw.trim().parse::<f64>().map_err(|_| RecordError::InvalidNumber { field, raw: raw.to_string() })
        };
        Record::new(
            text(Field::Approach)?,
            int(Field::ThreadCount)?,
            text(Field::DataType)?,
            int(Field::ElementCount)?,
            text(Field::MaskDistributionKind)?,
            float(Field::Selectivity)?,
            float(Field::RuntimeMs)?,
        )
    }

    pub fn approach(&self) -> &str { &self.approach }
    pub fn thread_count(&self) -> u64 { self.thread_count }
    pub fn data_type(&self) -> &str { &self.data_type }
    pub fn element_count(&self) -> u64 { self.element_count }
    pub fn mask_distribution_kind(&self) -> &str { &self.mask_distribution_kind }
    pub fn selectivity(&self) -> f64 { self.selectivity }
    pub fn runtime_ms(&self) -> f64 { self.runtime_ms }
    pub fn throughput(&self) -> f64 { self.throughput }
    pub fn case(&self) -> &str { &self.case }

    pub fn get(&self, field: Field) -> Value {
        match field {
            Field::Approach => Value::Text(self.approach.clone()),
            Field::ThreadCount => Value::Int(self.thread_count),
            Field::DataType => Value::Text(self.data_type.clone()),
            Field::ElementCount => Value::Int(self.element_count),
            Field::MaskDistributionKind => Value::Text(self.mask_distribution_kind.clone()),
            Field::Selectivity => Value::Float(self.selectivity),
            Field::RuntimeMs => Value::Float(self.runtime_ms),
            Field::Throughput => Value::Float(self.throughput),
            Field::Case => Value::Text(self.case.clone()),
        }
    }

    /// Numeric view of a field, None for the categorical ones.
    pub fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::ThreadCount => Some(self.thread_count as f64),
            Field::ElementCount => Some(self.element_count as f64),
            Field::Selectivity => Some(self.selectivity),
            Field::RuntimeMs => Some(self.runtime_ms),
            Field::Throughput => Some(self.throughput),
            _ => None,
        }
    }

    /// Replaces one metric column. Identity columns are left untouched and a
    /// non-metric field is ignored.
    pub(crate) fn set_metric(&mut self, field: Field, value: f64) {
        match field {
            Field::RuntimeMs => self.runtime_ms = value,
            Field::Throughput => self.throughput = value,
            _ => {}
        }
    }
}

fn field_column(field: Field) -> usize {
    Field::INPUT.iter().position(|f| *f == field).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn throughput_formula_for_doubles() {
        let r = Record::new("st", 1, "double", 1024, "uniform", 0.5, 1000.0).unwrap();
        let expected = (8.0 + 0.125) * 1024.0 / 1000.0 * 1000.0 / 2f64.powi(30);
        assert_eq!(r.throughput(), expected);
        assert!((r.throughput() - 7.749e-6).abs() < 1e-9);
    }

    #[test]
    fn case_label_joins_approach_mask_and_type() {
        let r = Record::new("avx512", 8, "uint32_t", 64, "cluster", 0.25, 2.0).unwrap();
        assert_eq!(r.case(), "avx512-cluster-uint32_t");
    }

    #[test]
    fn parse_row_populates_derived_fields() {
        let r = Record::parse(&row(&["cpu_st", "4", "float", "2048", "multi-cluster", "0.1", "3.5"])).unwrap();
        assert_eq!(r.thread_count(), 4);
        assert_eq!(r.element_count(), 2048);
        assert_eq!(r.selectivity(), 0.1);
        assert_eq!(r.case(), "cpu_st-multi-cluster-float");
        assert_eq!(r.throughput(), throughput_gib_s(4, 2048, 3.5));
    }

    #[test]
    fn parse_rejects_unknown_data_type() {
        let err = Record::parse(&row(&["a", "1", "int128", "10", "uniform", "0.5", "1.0"])).unwrap_err();
        assert_eq!(err, RecordError::UnknownDataType("int128".to_string()));
    }

    #[test]
    fn parse_rejects_non_numeric_fields() {
        let err = Record::parse(&row(&["a", "four", "float", "10", "uniform", "0.5", "1.0"])).unwrap_err();
        assert!(matches!(err, RecordError::InvalidNumber { field: Field::ThreadCount, .. }));
        let err = Record::parse(&row(&["a", "1", "float", "10", "uniform", "0.5", "fast"])).unwrap_err();
        assert!(matches!(err, RecordError::InvalidNumber { field: Field::RuntimeMs, .. }));
    }

    #[test]
    fn parse_rejects_short_rows() {
        let err = Record::parse(&row(&["a", "1", "float", "10", "uniform"])).unwrap_err();
        assert_eq!(err, RecordError::MissingField(Field::Selectivity));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(Record::new("a", 0, "float", 10, "u", 0.5, 1.0).is_err());
        assert!(Record::new("a", 1, "float", 10, "u", 1.5, 1.0).is_err());
        assert!(Record::new("a", 1, "float", 10, "u", f64::NAN, 1.0).is_err());
        assert!(Record::new("a", 1, "float", 10, "u", 0.5, 0.0).is_err());
    }

    #[test]
    fn signed_zero_floats_share_a_key() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        assert!(set.contains(&Value::Float(-0.0)));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn complement_keeps_schema_order() {
        let rest = Field::complement(&Field::METRICS);
        assert_eq!(rest.len(), 7);
        assert_eq!(rest.first(), Some(&Field::Approach));
        assert_eq!(rest.last(), Some(&Field::Case));
        assert!(!rest.iter().any(|f| f.is_metric()));
    }
}
