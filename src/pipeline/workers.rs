//! # Pipeline Workers
//!
//! Runs extraction jobs on a fixed pool of scoped threads. Results are
//! reassembled by job index so the merged sequence is the same as a
//! sequential run.

use std::thread;

use crossbeam_channel::{bounded, unbounded};
use tracing::debug;

use crate::artefact::Artefact;
use crate::discovery::ProfileTarget;
use crate::extract::{Extractor, run_extractor};

/// One extractor applied to one profile.
pub struct ExtractJob<'a> {
    pub target: &'a ProfileTarget,
    pub extractor: &'a dyn Extractor,
}

impl ExtractJob<'_> {
    /// Run the extractor and attach the profile owner and browser.
    pub fn run(&self) -> Vec<Artefact> {
        let mut records = run_extractor(self.extractor, &self.target.paths);
        for record in &mut records {
            record.decorate(&self.target.user, self.target.browser);
        }
        records
    }
}

pub fn run_sequential(jobs: &[ExtractJob<'_>]) -> Vec<Vec<Artefact>> {
    jobs.iter().map(ExtractJob::run).collect()
}

/// Run `jobs` on `workers` threads. The output has one entry per job, in job
/// order.
pub fn run_parallel(jobs: &[ExtractJob<'_>], workers: usize) -> Vec<Vec<Artefact>> {
    let worker_count = workers.max(1).min(jobs.len().max(1));
    let (job_tx, job_rx) = bounded::<usize>(jobs.len().max(1));
    let (result_tx, result_rx) = unbounded::<(usize, Vec<Artefact>)>();

    for idx in 0..jobs.len() {
        // capacity equals the job count, never blocks
        let _ = job_tx.send(idx);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for worker in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for idx in job_rx {
                    let job = &jobs[idx];
                    debug!(
                        worker,
                        user = %job.target.user,
                        "running {}::{}",
                        job.target.browser.as_str(),
                        job.extractor.name()
                    );
                    if result_tx.send((idx, job.run())).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut slots: Vec<Vec<Artefact>> = (0..jobs.len()).map(|_| Vec::new()).collect();
    for (idx, records) in result_rx {
        slots[idx] = records;
    }
    slots
}
