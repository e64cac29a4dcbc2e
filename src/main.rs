use std::error::Error;
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpu_time::ProcessTime;
use itertools::Itertools;

use compact_graphs::aggregate::average_metrics;
use compact_graphs::chart::{plan_jobs, JobOutcome, SvgRenderer};
use compact_graphs::classify::unique_values;
use compact_graphs::dispatch::{run_parallel, run_sequential, RunCtx};
use compact_graphs::input::read_records;
use compact_graphs::jitter::filter_jitter;
use compact_graphs::record::Field;
use compact_graphs::series::Palette;
use compact_graphs::status::Status;
use compact_graphs::summary::{summarize, write_summary};

mod cli;

use cli::get_cli;

fn main() {
    if let Err(err) = cgraphs() {
        eprintln!("error: {}", &err);
        std::process::exit(1);
    }
}

fn cgraphs() -> Result<(), Box<dyn Error>> {
    let start_f = Instant::now();
    let startcpu = ProcessTime::now();

    let cfg = get_cli()?;
    let status = Arc::new(Status::new(cfg.verbose));

    let mut raw = read_records(&cfg.input, cfg.delimiter as u8)?;
    status.info(1, format!("read {} records from {}", raw.len(), cfg.input.display()));

    // judged per trial, so it has to run before the trials are collapsed
    if let Some(max_dev) = cfg.jitter {
        let report = filter_jitter(&raw, max_dev);
        status.info(0, format!("filtered {:.2} % jittered values", report.filtered_percent()));
        raw = report.kept;
    }
    let data = average_metrics(&raw, &Field::METRICS)?;
    status.info(1, format!("averaged {} trials into {} configurations", raw.len(), data.len()));
    drop(raw);

    if cfg.summary {
        let rows = summarize(&data)?;
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        write_summary(&rows, cfg.csv_output.then_some(cfg.od.as_str()), &mut writer)?;
    }

    let record_count = data.len();
    let (mut rendered, mut aborted, mut failed) = (0usize, 0usize, 0usize);
    if !cfg.no_charts {
        fs::create_dir_all(&cfg.out_dir)
            .map_err(|e| format!("cannot create output directory {}: {}", cfg.out_dir.display(), e))?;

        let cases = unique_values(&data, Field::Case);
        status.info(2, format!("cases: {}", cases.iter().join(", ")));
        let palette = Arc::new(Palette::seeded(cases.iter().map(|c| c.to_string())));
        let plan = plan_jobs(data, palette);
        if !plan.has_avx {
            status.info(0, "no avx benchmarks found.");
        }

        let ctx = RunCtx {
            out_dir: cfg.out_dir.clone(),
            renderer: Arc::new(SvgRenderer { width: cfg.width, height: cfg.height }),
            status: status.clone(),
        };
        let reports = if cfg.sequential {
            run_sequential(plan.jobs, &ctx)
        } else {
            run_parallel(plan.jobs, cfg.threads, &ctx)?
        };
        for r in &reports {
            match r.result {
                Ok(JobOutcome::Rendered(_)) => rendered += 1,
                Ok(JobOutcome::Aborted { .. }) => aborted += 1,
                Err(_) => failed += 1,
            }
        }
    }

    if status.verbose() >= 1 {
        let elapsed = start_f.elapsed();
        let sec = (elapsed.as_secs() as f64) + (elapsed.subsec_nanos() as f64 / 1_000_000_000.0);
        let elapsedcpu: Duration = startcpu.elapsed();
        let seccpu: f64 = (elapsedcpu.as_secs() as f64) + (elapsedcpu.subsec_nanos() as f64 / 1_000_000_000.0);
        eprintln!(
            "records: {}  charts: {}  aborted: {}  failed: {}  time: {:.3}  cpu: {:.3}",
            record_count, rendered, aborted, failed, sec, seccpu
        );
    }
    if failed > 0 {
        Err(format!("{} chart job(s) failed", failed))?;
    }
    Ok(())
}
