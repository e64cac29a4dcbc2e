use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plotters::coord::combinators::BindKeyPoints;
use plotters::coord::Shift;
use plotters::prelude::IntoLogRange;
use plotters::prelude::*;
use thiserror::Error;

use crate::classify::{filter_by, filter_equal, unique_values};
use crate::record::{Field, Record};
use crate::series::{
    build_series, ChartData, Marker, Metric, Normalization, Palette, SeriesError, SeriesSpec, Style, XAxis,
};

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("rendering {path} failed: {message}")]
    Render { path: PathBuf, message: String },
    #[error("cannot remove stale chart {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error("chart job panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    ThroughputOverThreadCount,
    RuntimeOverThreadCount,
    ThroughputOverSelectivity,
    RuntimeOverSelectivity,
    SingleThreadedThroughput,
    Speedup,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::ThroughputOverThreadCount,
        ChartKind::RuntimeOverThreadCount,
        ChartKind::ThroughputOverSelectivity,
        ChartKind::RuntimeOverSelectivity,
        ChartKind::SingleThreadedThroughput,
        ChartKind::Speedup,
    ];

    pub fn series_spec(self) -> SeriesSpec {
        use ChartKind::*;
        let (x, metric, normalization) = match self {
            ThroughputOverThreadCount => (XAxis::ThreadCount, Metric::Throughput, Normalization::None),
            RuntimeOverThreadCount => (XAxis::ThreadCount, Metric::Runtime, Normalization::None),
            ThroughputOverSelectivity => (XAxis::Selectivity, Metric::Throughput, Normalization::None),
            RuntimeOverSelectivity => (XAxis::Selectivity, Metric::Runtime, Normalization::None),
            SingleThreadedThroughput => (XAxis::ThreadCount, Metric::Throughput, Normalization::PerThread),
            Speedup => (XAxis::ThreadCount, Metric::Throughput, Normalization::Speedup),
        };
        SeriesSpec { x, metric, normalization }
    }

    pub fn stem(self) -> &'static str {
        use ChartKind::*;
        match self {
            ThroughputOverThreadCount => "throughput_over_thread_count",
            RuntimeOverThreadCount => "runtime_over_thread_count",
            ThroughputOverSelectivity => "throughput_over_selectivity",
            RuntimeOverSelectivity => "runtime_over_selectivity",
            SingleThreadedThroughput => "single_threaded_throughput_over_thread_count",
            Speedup => "mt_speedup_over_thread_count",
        }
    }

    fn heading(self) -> &'static str {
        use ChartKind::*;
        match self {
            ThroughputOverThreadCount => "throughput over thread count",
            RuntimeOverThreadCount => "runtime over thread count",
            ThroughputOverSelectivity => "throughput over selectivity",
            RuntimeOverSelectivity => "runtime over selectivity",
            SingleThreadedThroughput => "single threaded throughput over thread count",
            Speedup => "multi threading speedup over thread count",
        }
    }

    pub fn y_desc(self) -> &'static str {
        match self.series_spec() {
            SeriesSpec { normalization: Normalization::Speedup, .. } => "mt speedup",
            SeriesSpec { metric: Metric::Runtime, .. } => "runtime (ms)",
            _ => "throughput (GiB/s)",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartParams {
    pub log: bool,
    /// let the linear y axis start at the smallest value instead of 0
    pub nonzero_baseline: bool,
    pub suffix: Option<String>,
}

/// A fully resolved render request.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_desc: &'static str,
    pub y_desc: &'static str,
    pub log: bool,
    pub nonzero_baseline: bool,
    pub data: ChartData,
}

impl Chart {
    pub fn x_range(&self) -> (f64, f64) {
        let ticks = &self.data.x_ticks;
        let (lo, hi) = match (ticks.first(), ticks.last()) {
            (Some(lo), Some(hi)) => (*lo, *hi),
            _ => (0.0, 1.0),
        };
        let pad = if hi > lo { (hi - lo) * 0.03 } else { 0.5 };
        (lo - pad, hi + pad)
    }

    /// Log charts start at the smallest plotted value; linear charts at 0
    /// unless a nonzero baseline was requested.
    pub fn y_range(&self) -> (f64, f64) {
        let (y_min, y_max) = (self.data.y_min, self.data.y_max);
        if self.log {
            let lo = if y_min > 0.0 { y_min } else { (y_max * 1e-3).max(f64::MIN_POSITIVE) };
            let hi = if y_max > lo { y_max * 1.1 } else { lo * 10.0 };
            return (lo, hi);
        }
        let lo = if self.nonzero_baseline { y_min } else { 0f64.min(y_min) };
        let hi = if y_max > lo { y_max * 1.05 } else { lo + 1.0 };
        (lo, hi)
    }
}

pub trait ChartRenderer: Send + Sync {
    fn render(&self, chart: &Chart, path: &Path) -> Result<(), ChartError>;
}

#[derive(Debug, Clone, Copy)]
pub struct SvgRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        SvgRenderer { width: 1600, height: 700 }
    }
}

impl ChartRenderer for SvgRenderer {
    fn render(&self, chart: &Chart, path: &Path) -> Result<(), ChartError> {
        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        draw_chart(root, chart).map_err(|e| ChartError::Render { path: path.to_path_buf(), message: e.to_string() })
    }
}

fn format_tick(v: f64) -> String {
    if v.fract() == 0.0 { format!("{:.0}", v) } else { format!("{:.2}", v) }
}

const LEGEND_COLUMNS: usize = 3;
const LEGEND_ROW: i32 = 22;

fn rgb(style: &Style) -> RGBColor {
    RGBColor(style.color.0, style.color.1, style.color.2)
}

/// Draws `marker` centered on `at`, in pixels relative to `area`.
fn draw_marker<DB>(area: &DrawingArea<DB, Shift>, at: (i32, i32), marker: Marker, color: RGBColor) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x, y) = at;
    match marker {
        Marker::Triangle => area.draw(&TriangleMarker::new(at, 5, color))?,
        Marker::FilledTriangle => area.draw(&TriangleMarker::new(at, 5, color.filled()))?,
        Marker::Cross => area.draw(&Cross::new(at, 4, color.stroke_width(2)))?,
        Marker::Circle => area.draw(&Circle::new(at, 4, color))?,
        Marker::FilledCircle => area.draw(&Circle::new(at, 4, color.filled()))?,
        Marker::Square => area.draw(&Rectangle::new([(x - 4, y - 4), (x + 4, y + 4)], color))?,
        Marker::FilledSquare => area.draw(&Rectangle::new([(x - 4, y - 4), (x + 4, y + 4)], color.filled()))?,
        Marker::Diamond => {
            area.draw(&PathElement::new(vec![(x, y - 5), (x + 5, y), (x, y + 5), (x - 5, y), (x, y - 5)], color))?
        }
    }
    Ok(())
}

// one entry per series, LEGEND_COLUMNS to a row
fn draw_legend<DB>(area: &DrawingArea<DB, Shift>, chart: &Chart) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (width, _) = area.dim_in_pixel();
    let column = (width as i32 - 140) / LEGEND_COLUMNS as i32;
    for (i, s) in chart.data.series.iter().enumerate() {
        let x = 90 + (i % LEGEND_COLUMNS) as i32 * column;
        let y = 12 + (i / LEGEND_COLUMNS) as i32 * LEGEND_ROW;
        let color = rgb(&s.style);
        area.draw(&PathElement::new(vec![(x, y), (x + 30, y)], color.stroke_width(2)))?;
        draw_marker(area, (x + 15, y), s.style.marker, color)?;
        area.draw(&Text::new(s.label.clone(), (x + 40, y - 8), ("sans-serif", 15).into_font()))?;
    }
    Ok(())
}

fn draw_chart<DB>(root: DrawingArea<DB, Shift>, chart: &Chart) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (_, height) = root.dim_in_pixel();
    let rows = chart.data.series.len().div_ceil(LEGEND_COLUMNS) as i32;
    let legend_height = (rows * LEGEND_ROW + 20).min(height as i32 / 2);
    let (upper, lower) = root.split_vertically(height as i32 - legend_height);

    let (x_lo, x_hi) = chart.x_range();
    let (y_lo, y_hi) = chart.y_range();
    // ticks sit on the measured x values only
    let x_axis = || (x_lo..x_hi).with_key_points(chart.data.x_ticks.clone());
    let mut builder = ChartBuilder::on(&upper);
    builder
        .caption(&chart.title, ("sans-serif", 22))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50);

    // linear and log y axes are different coordinate types
    macro_rules! plot {
        ($ctx:expr) => {{
            let mut ctx = $ctx;
            ctx.configure_mesh()
                .x_desc(chart.x_desc)
                .y_desc(chart.y_desc)
                .x_labels(chart.data.x_ticks.len())
                .x_label_formatter(&|v| format_tick(*v))
                .draw()?;
            for s in &chart.data.series {
                let color = rgb(&s.style);
                ctx.draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?;
                for p in &s.points {
                    draw_marker(&upper, ctx.backend_coord(p), s.style.marker, color)?;
                }
            }
        }};
    }

    if chart.log {
        plot!(builder.build_cartesian_2d(x_axis(), (y_lo..y_hi).log_scale())?);
    } else {
        plot!(builder.build_cartesian_2d(x_axis(), y_lo..y_hi)?);
    }
    draw_legend(&lower, chart)?;
    root.present()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Rendered(PathBuf),
    /// Not enough data for this chart; a stale file from an earlier run was
    /// removed when `removed_stale` is set.
    Aborted { path: PathBuf, reason: String, removed_stale: bool },
}

/// One chart to draw from a shared, already aggregated record set.
#[derive(Debug, Clone)]
pub struct ChartJob {
    pub kind: ChartKind,
    pub params: ChartParams,
    pub data: Arc<Vec<Record>>,
    pub palette: Arc<Palette>,
}

fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' }).collect()
}

fn remove_stale(path: &Path) -> Result<bool, ChartError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ChartError::Io { path: path.to_path_buf(), source }),
    }
}

impl ChartJob {
    pub fn new(kind: ChartKind, params: ChartParams, data: Arc<Vec<Record>>, palette: Arc<Palette>) -> Self {
        ChartJob { kind, params, data, palette }
    }

    /// `<kind>[_<suffix>][_log][_nz].svg`
    pub fn file_name(&self) -> String {
        let mut name = self.kind.stem().to_string();
        if let Some(suffix) = &self.params.suffix {
            name.push('_');
            name.push_str(&sanitize(suffix));
        }
        if self.params.log {
            name.push_str("_log");
        }
        if self.params.nonzero_baseline {
            name.push_str("_nz");
        }
        name.push_str(".svg");
        name
    }

    pub fn title(&self, max_element_count: u64) -> String {
        let mut t = format!("{} ", self.kind.heading());
        if let Some(suffix) = &self.params.suffix {
            t.push_str(&format!("for {} ", suffix));
        }
        t.push_str(&format!("(element count = {})", max_element_count));
        if self.kind.series_spec().x == XAxis::Selectivity {
            t.push_str(" (thread count = best in class)");
        }
        t
    }

    pub fn chart(&self) -> Result<Chart, SeriesError> {
        let spec = self.kind.series_spec();
        let mut palette = (*self.palette).clone();
        let data = build_series(&self.data, &spec, &mut palette)?;
        Ok(Chart {
            title: self.title(data.max_element_count),
            x_desc: spec.x.label(),
            y_desc: self.kind.y_desc(),
            log: self.params.log,
            nonzero_baseline: self.params.nonzero_baseline,
            data,
        })
    }

    /// Builds and renders the chart into `out_dir`. Insufficient data aborts
    /// the job without error; a partially written file is removed when the
    /// renderer fails.
    pub fn run(&self, out_dir: &Path, renderer: &dyn ChartRenderer) -> Result<JobOutcome, ChartError> {
        let path = out_dir.join(self.file_name());
        let chart = match self.chart() {
            Ok(chart) => chart,
            Err(e @ (SeriesError::InsufficientData(_) | SeriesError::MissingBaseline(_))) => {
                let removed_stale = remove_stale(&path)?;
                return Ok(JobOutcome::Aborted { path, reason: e.to_string(), removed_stale });
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = renderer.render(&chart, &path) {
            let _ = remove_stale(&path);
            return Err(e);
        }
        Ok(JobOutcome::Rendered(path))
    }
}

/// The jobs for one run, in the order they are reported.
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub jobs: Vec<ChartJob>,
    pub has_avx: bool,
}

fn push(jobs: &mut Vec<ChartJob>, data: &Arc<Vec<Record>>, palette: &Arc<Palette>, kind: ChartKind, log: bool, nz: bool, suffix: Option<&str>) {
    let params = ChartParams { log, nonzero_baseline: nz, suffix: suffix.map(str::to_string) };
    jobs.push(ChartJob::new(kind, params, data.clone(), palette.clone()));
}

/// The fixed chart family: the whole data set, the avx approaches, and one
/// facet per mask distribution kind.
pub fn plan_jobs(records: Vec<Record>, palette: Arc<Palette>) -> JobPlan {
    use ChartKind::*;
    let mut jobs = Vec::new();

    let avx: Vec<Record> = filter_by(&records, |r| r.approach().to_lowercase().contains("avx"))
        .into_iter()
        .cloned()
        .collect();
    let masks = unique_values(&records, Field::MaskDistributionKind);
    let facets: Vec<(String, Arc<Vec<Record>>)> = masks
        .iter()
        .map(|m| {
            let rows: Vec<Record> = filter_equal(&records, Field::MaskDistributionKind, m).into_iter().cloned().collect();
            (m.to_string(), Arc::new(rows))
        })
        .collect();

    let all = Arc::new(records);
    push(&mut jobs, &all, &palette, ThroughputOverSelectivity, false, false, None);
    push(&mut jobs, &all, &palette, ThroughputOverSelectivity, true, false, None);
    push(&mut jobs, &all, &palette, ThroughputOverThreadCount, false, false, None);
    push(&mut jobs, &all, &palette, ThroughputOverThreadCount, true, false, None);
    push(&mut jobs, &all, &palette, SingleThreadedThroughput, false, false, None);
    push(&mut jobs, &all, &palette, Speedup, false, false, None);
    push(&mut jobs, &all, &palette, RuntimeOverThreadCount, false, false, None);
    push(&mut jobs, &all, &palette, RuntimeOverSelectivity, false, false, None);

    let has_avx = !avx.is_empty();
    if has_avx {
        let avx = Arc::new(avx);
        push(&mut jobs, &avx, &palette, ThroughputOverSelectivity, false, false, Some("avx"));
        push(&mut jobs, &avx, &palette, ThroughputOverSelectivity, false, true, Some("avx"));
        push(&mut jobs, &avx, &palette, ThroughputOverSelectivity, true, false, Some("avx"));
    }

    for (mask, rows) in &facets {
        let m = Some(mask.as_str());
        for log in [false, true] {
            push(&mut jobs, rows, &palette, ThroughputOverSelectivity, log, false, m);
            push(&mut jobs, rows, &palette, ThroughputOverThreadCount, log, false, m);
            if !log {
                push(&mut jobs, rows, &palette, SingleThreadedThroughput, false, false, m);
                push(&mut jobs, rows, &palette, Speedup, false, false, m);
                push(&mut jobs, rows, &palette, ThroughputOverSelectivity, false, true, m);
                push(&mut jobs, rows, &palette, ThroughputOverThreadCount, false, true, m);
            }
        }
    }
    JobPlan { jobs, has_avx }
}
