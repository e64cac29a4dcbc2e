use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use lazy_static::lazy_static;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn get_default_chart_thread_no() -> usize {
    if num_cpus::get() > 12 { 12 } else { num_cpus::get() }
}

lazy_static! {
    pub static ref BUILD_INFO: String = format!("  ver: {}  rev: {}",
        env!("CARGO_PKG_VERSION"), env!("BUILD_GIT_HASH"));
}

#[derive(Parser, Debug)]
#[command(version = BUILD_INFO.as_str(), rename_all = "kebab-case")]
/// Aggregate mask-compaction benchmark results and render comparison charts.
///
/// Repeated trials are averaged, optionally jitter filtered, and drawn as one SVG
/// per chart kind into the output directory. Charts without enough data are
/// skipped and any stale file of the same name is removed.
pub struct CliCfg {
    #[arg(default_value = "cpu_data.csv")] pub input: PathBuf,
    #[arg(short='o', long="out_dir", default_value = ".")] pub out_dir: PathBuf,
    #[arg(short='d', long="input_delimiter", value_parser=parse_escape, default_value=";")] pub delimiter: char,
    #[arg(short='v', action=ArgAction::Count)] pub verbose: u8,
    #[arg(short='t', long="threads", default_value_t = get_default_chart_thread_no())] pub threads: usize,
    #[arg(long="sequential")] pub sequential: bool,
    /// drop samples deviating from their group mean throughput by more than this fraction
    #[arg(long="jitter", value_parser=parse_max_dev)] pub jitter: Option<f64>,
    #[arg(long="summary")] pub summary: bool,
    #[arg(short='c', long="csv_output")] pub csv_output: bool,
    #[arg(long="output_delimiter", default_value=",")] pub od: String,
    #[arg(long="no_charts")] pub no_charts: bool,
    #[arg(long="width", default_value_t = 1600)] pub width: u32,
    #[arg(long="height", default_value_t = 700)] pub height: u32,
}

fn escape_parser(s: &str) -> Result<char> {
    if let Some(stripped) = s.strip_prefix("\\d") {
        match u8::from_str(stripped) {
            Ok(v) if v <= 127 => Ok(v as char),
            _ => Err(format!("Expect delimiter escape decimal to a be a number between 0 and 127 but got: \"{}\"", stripped))?,
        }
    } else {
        match s {
            "\\t" => Ok('\t'),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Ok(c),
                    _ => Err("Delimiter not understood - must be 1 ascii character OR \\t or \\d<dec num>".to_string())?,
                }
            }
        }
    }
}

fn max_dev_parser(s: &str) -> Result<f64> {
    let v = f64::from_str(s.trim()).map_err(|_| format!("jitter bound \"{}\" is not a number", s))?;
    if !(v >= 0.0 && v.is_finite()) {
        Err(format!("jitter bound must be a non-negative fraction but got: {}", v))?;
    }
    Ok(v)
}

// clap wants Send + Sync + 'static errors
fn parse_escape(s: &str) -> std::result::Result<char, String> {
    escape_parser(s).map_err(|e| e.to_string())
}
fn parse_max_dev(s: &str) -> std::result::Result<f64, String> {
    max_dev_parser(s).map_err(|e| e.to_string())
}

pub fn get_cli() -> Result<Arc<CliCfg>> {
    // immutable from here on; shared with the chart workers
    let cfg = Arc::new({
        let mut cfg: CliCfg = CliCfg::parse();
        if cfg.threads == 0 {
            Err("thread count must be at least 1")?;
        }
        if cfg.width < 200 || cfg.height < 150 {
            Err(format!("chart size {}x{} is too small, need at least 200x150", cfg.width, cfg.height))?;
        }
        if cfg.sequential && cfg.threads > 1 {
            if cfg.verbose >= 1 {
                eprintln!("Override thread number to 1 since --sequential was given");
            }
            cfg.threads = 1;
        }
        cfg
    });
    if cfg.verbose >= 2 {
        eprintln!("CLI options: {:?}", cfg);
    }
    Ok(cfg)
}
