use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::chart::{ChartError, ChartJob, ChartRenderer, JobOutcome};
use crate::status::Status;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("cannot spawn chart worker: {0}")]
    Spawn(io::Error),
    #[error("chart job queue closed early")]
    Queue,
    #[error("chart worker {0} died")]
    Worker(String),
}

/// Everything a worker needs besides the job itself.
#[derive(Clone)]
pub struct RunCtx {
    pub out_dir: PathBuf,
    pub renderer: Arc<dyn ChartRenderer>,
    pub status: Arc<Status>,
}

#[derive(Debug)]
pub struct JobReport {
    pub index: usize,
    pub name: String,
    pub result: Result<JobOutcome, ChartError>,
}

impl JobReport {
    pub fn failed(&self) -> bool {
        self.result.is_err()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run_one(index: usize, job: &ChartJob, ctx: &RunCtx) -> JobReport {
    let name = job.file_name();
    let result = panic::catch_unwind(AssertUnwindSafe(|| job.run(&ctx.out_dir, ctx.renderer.as_ref())))
        .unwrap_or_else(|payload| Err(ChartError::Panicked(panic_message(payload))));
    match &result {
        Ok(JobOutcome::Rendered(path)) => ctx.status.info(1, format!("wrote {}", path.display())),
        Ok(JobOutcome::Aborted { reason, removed_stale, .. }) => {
            ctx.status.warn(format!("aborting plot!: {} ({})", name, reason));
            if *removed_stale {
                ctx.status.info(1, format!("removed stale {}", name));
            }
        }
        Err(e) => ctx.status.error(format!("{} failed: {}", name, e)),
    }
    JobReport { index, name, result }
}

pub fn run_sequential(jobs: Vec<ChartJob>, ctx: &RunCtx) -> Vec<JobReport> {
    jobs.iter().enumerate().map(|(i, job)| run_one(i, job, ctx)).collect()
}

/// Feeds jobs through a bounded queue to `threads` named workers. A failing
/// or panicking job only fails its own report. Reports come back in job order.
pub fn run_parallel(jobs: Vec<ChartJob>, threads: usize, ctx: &RunCtx) -> Result<Vec<JobReport>, DispatchError> {
    let threads = threads.clamp(1, jobs.len().max(1));
    let (send, recv): (crossbeam_channel::Sender<Option<(usize, ChartJob)>>, crossbeam_channel::Receiver<Option<(usize, ChartJob)>>) =
        crossbeam_channel::bounded(threads * 2);

    let mut handles = Vec::with_capacity(threads);
    for no_threads in 0..threads {
        let recv = recv.clone();
        let ctx = ctx.clone();
        let h = thread::Builder::new()
            .name(format!("chart_job{}", no_threads))
            .spawn(move || {
                let mut reports = vec![];
                while let Ok(Some((index, job))) = recv.recv() {
                    reports.push(run_one(index, &job, &ctx));
                }
                reports
            })
            .map_err(DispatchError::Spawn)?;
        handles.push(h);
    }
    drop(recv);

    ctx.status.info(2, format!("dispatching {} chart jobs over {} threads", jobs.len(), threads));
    for job in jobs.into_iter().enumerate() {
        send.send(Some(job)).map_err(|_| DispatchError::Queue)?;
    }
    for _ in 0..threads {
        send.send(None).map_err(|_| DispatchError::Queue)?;
    }

    let mut reports = vec![];
    for h in handles {
        let name = h.thread().name().unwrap_or("?").to_string();
        reports.extend(h.join().map_err(|_| DispatchError::Worker(name))?);
    }
    reports.sort_by_key(|r| r.index);
    Ok(reports)
}
