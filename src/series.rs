use indexmap::IndexMap;
use thiserror::Error;

use crate::aggregate::{group_with_highest_mean, max_value, mean, AggregateError};
use crate::classify::{classify, filter_equal, unique_values};
use crate::record::{Field, Record, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("case {0} has no single-threaded baseline")]
    MissingBaseline(String),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XAxis {
    ThreadCount,
    Selectivity,
}

impl XAxis {
    pub fn field(self) -> Field {
        match self {
            XAxis::ThreadCount => Field::ThreadCount,
            XAxis::Selectivity => Field::Selectivity,
        }
    }
    pub fn label(self) -> &'static str {
        match self {
            XAxis::ThreadCount => "thread count",
            XAxis::Selectivity => "selectivity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Throughput,
    Runtime,
}

impl Metric {
    pub fn field(self) -> Field {
        match self {
            Metric::Throughput => Field::Throughput,
            Metric::Runtime => Field::RuntimeMs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    None,
    /// divide by the thread count of the point
    PerThread,
    /// divide by the case's single-threaded mean
    Speedup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesSpec {
    pub x: XAxis,
    pub metric: Metric,
    pub normalization: Normalization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Triangle,
    Cross,
    Circle,
    Square,
    Diamond,
    FilledTriangle,
    FilledCircle,
    FilledSquare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    pub color: Rgb,
    pub marker: Marker,
}

pub const COLORS: [Rgb; 22] = [
    Rgb(255, 140, 0),   // darkorange
    Rgb(0, 128, 0),     // green
    Rgb(255, 215, 0),   // gold
    Rgb(0, 191, 255),   // deepskyblue
    Rgb(0, 0, 128),     // navy
    Rgb(139, 0, 0),     // darkred
    Rgb(128, 0, 128),   // purple
    Rgb(255, 0, 0),     // red
    Rgb(147, 112, 219), // mediumpurple
    Rgb(64, 224, 208),  // turquoise
    Rgb(211, 211, 211), // lightgray
    Rgb(0, 128, 128),   // teal
    Rgb(0, 255, 0),     // lime
    Rgb(46, 139, 87),   // seagreen
    Rgb(221, 160, 221), // plum
    Rgb(176, 196, 222), // lightsteelblue
    Rgb(219, 112, 147), // palevioletred
    Rgb(0, 0, 0),       // black
    Rgb(0, 0, 255),     // blue
    Rgb(255, 0, 255),   // magenta
    Rgb(128, 128, 0),   // olive
    Rgb(218, 165, 32),  // goldenrod
];

pub const MARKERS: [Marker; 8] = [
    Marker::Triangle,
    Marker::Cross,
    Marker::Circle,
    Marker::Square,
    Marker::Diamond,
    Marker::FilledTriangle,
    Marker::FilledCircle,
    Marker::FilledSquare,
];

/// Color/marker assignment by first appearance of a label.
///
/// The n-th distinct label gets `COLORS[n % 22]` and `MARKERS[n % 8]`. Seeding
/// with the complete case list up front makes every job agree on the styles
/// regardless of which cases it happens to plot.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    slots: IndexMap<String, usize>,
}

impl Palette {
    pub fn new() -> Self {
        Palette::default()
    }

    pub fn seeded<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut p = Palette::new();
        for l in labels {
            p.assign(l.as_ref());
        }
        p
    }

    pub fn assign(&mut self, label: &str) -> Style {
        let next = self.slots.len();
        let slot = *self.slots.entry(label.to_string()).or_insert(next);
        Palette::style_for_slot(slot)
    }

    pub fn style_of(&self, label: &str) -> Option<Style> {
        self.slots.get(label).map(|&slot| Palette::style_for_slot(slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn style_for_slot(slot: usize) -> Style {
        Style { color: COLORS[slot % COLORS.len()], marker: MARKERS[slot % MARKERS.len()] }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub case: String,
    pub label: String,
    pub style: Style,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub series: Vec<Series>,
    /// distinct x values of the whole dataset, ascending
    pub x_ticks: Vec<f64>,
    pub max_element_count: u64,
    pub y_min: f64,
    pub y_max: f64,
}

fn sorted_numbers(values: &[Value]) -> Vec<f64> {
    let mut xs: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    xs.sort_by(f64::total_cmp);
    xs
}

/// Reduces an aggregated record set to one series per case.
///
/// Only rows at the largest element count are plotted. For selectivity charts
/// each case is restricted to its highest thread count.
pub fn build_series(records: &[Record], spec: &SeriesSpec, palette: &mut Palette) -> Result<ChartData, SeriesError> {
    if records.is_empty() {
        return Err(SeriesError::InsufficientData("empty dataset".to_string()));
    }
    let x_field = spec.x.field();
    let y_field = spec.metric.field();
    let max_element_count = max_value(records, Field::ElementCount)? as u64;
    let slice = filter_equal(records, Field::ElementCount, &Value::Int(max_element_count));
    let x_values = unique_values(records, x_field);
    if slice.is_empty() || x_values.len() < 2 {
        return Err(SeriesError::InsufficientData(format!(
            "{} distinct {} value(s), need at least 2",
            x_values.len(),
            x_field
        )));
    }

    let mut series = Vec::new();
    for (case, case_rows) in classify(&slice, Field::Case) {
        let case = case.to_string();
        let mut label = case.clone();
        let mut rows = case_rows.clone();
        if spec.x == XAxis::Selectivity {
            let by_tc = classify(&case_rows, Field::ThreadCount);
            if let Some(tc) = group_with_highest_mean(&by_tc, Field::ThreadCount)?.cloned() {
                if let Some(n) = tc.as_f64().filter(|n| *n > 1.0) {
                    label = format!("{} tc = {}", case, n as u64);
                }
                rows = by_tc[&tc].clone();
            }
        }
        let baseline = match spec.normalization {
            Normalization::Speedup => {
                let st = filter_equal(&rows, Field::ThreadCount, &Value::Int(1));
                if st.is_empty() {
                    return Err(SeriesError::MissingBaseline(case));
                }
                Some(mean(&st, y_field)?)
            }
            _ => None,
        };

        let mut by_x: Vec<(f64, Vec<&Record>)> = classify(&rows, x_field)
            .into_iter()
            .filter_map(|(k, group)| k.as_f64().map(|x| (x, group)))
            .collect();
        by_x.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut points = Vec::with_capacity(by_x.len());
        for (x, group) in &by_x {
            let mut y = mean(group, y_field)?;
            match (spec.normalization, baseline) {
                (Normalization::PerThread, _) => y /= mean(group, Field::ThreadCount)?,
                (Normalization::Speedup, Some(b)) => y /= b,
                _ => {}
            }
            points.push((*x, y));
        }
        let style = palette.assign(&case);
        series.push(Series { case, label, style, points });
    }

    let ys = series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
    let (y_min, y_max) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    Ok(ChartData { series, x_ticks: sorted_numbers(&x_values), max_element_count, y_min, y_max })
}
