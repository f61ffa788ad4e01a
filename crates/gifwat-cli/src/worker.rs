//! Runs backend commands and image probes off the UI loop.
//!
//! The picker submits [`Job`]s and drains [`Done`] results each iteration;
//! results come back in completion order, which the controller tolerates.
//! Every submitted job yields exactly one result: a job that panics, or that
//! the worker never got to, comes back as a failure.

use crate::media::{MediaProbe, ProbeOutcome};
use gifwat_core::image_load::LoadAttempt;
use gifwat_core::store::{execute, Reply};
use gifwat_core::{Backend, Error, GifId, Request};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

pub enum Job {
    Backend(Request),
    Image { id: GifId, attempt: LoadAttempt },
    Preview(LoadAttempt),
}

pub enum Done {
    Backend(Reply),
    Image {
        id: GifId,
        seq: u32,
        outcome: ProbeOutcome,
    },
    Preview {
        seq: u32,
        outcome: ProbeOutcome,
    },
}

impl Job {
    /// The result reported when this job cannot complete.
    fn failure(&self, reason: &str) -> Done {
        match self {
            Job::Backend(req) => Done::Backend(Reply {
                ticket: req.ticket,
                command: req.command.clone(),
                result: Err(Error::Backend(reason.to_string())),
            }),
            Job::Image { id, attempt } => Done::Image {
                id: id.clone(),
                seq: attempt.seq,
                outcome: ProbeOutcome::Failed(reason.to_string()),
            },
            Job::Preview(attempt) => Done::Preview {
                seq: attempt.seq,
                outcome: ProbeOutcome::Failed(reason.to_string()),
            },
        }
    }
}

pub trait Executor {
    fn submit(&mut self, job: Job);
    fn drain(&mut self) -> Vec<Done>;
    /// True when nothing is queued or running.
    fn idle(&self) -> bool;
}

fn run(backend: &dyn Backend, probe: &dyn MediaProbe, job: Job) -> Done {
    match job {
        Job::Backend(req) => Done::Backend(execute(backend, req)),
        Job::Image { id, attempt } => {
            tracing::trace!(id, url = %attempt.fetch_url(), "probing image");
            Done::Image {
                seq: attempt.seq,
                outcome: probe.probe(&attempt),
                id,
            }
        }
        Job::Preview(attempt) => Done::Preview {
            seq: attempt.seq,
            outcome: probe.probe(&attempt),
        },
    }
}

/// `run`, with a panic turned into the job's failure result.
fn run_guarded(backend: &dyn Backend, probe: &dyn MediaProbe, job: Job) -> Done {
    let failed = job.failure("job panicked");
    match panic::catch_unwind(AssertUnwindSafe(|| run(backend, probe, job))) {
        Ok(done) => done,
        Err(_) => {
            tracing::error!("worker job panicked");
            failed
        }
    }
}

/// Executes jobs on submit. Deterministic; used headless and in tests.
pub struct InlineExecutor {
    backend: Arc<dyn Backend>,
    probe: Arc<dyn MediaProbe>,
    done: VecDeque<Done>,
}

impl InlineExecutor {
    pub fn new(backend: Arc<dyn Backend>, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            backend,
            probe,
            done: VecDeque::new(),
        }
    }
}

impl Executor for InlineExecutor {
    fn submit(&mut self, job: Job) {
        let done = run_guarded(self.backend.as_ref(), self.probe.as_ref(), job);
        self.done.push_back(done);
    }

    fn drain(&mut self) -> Vec<Done> {
        self.done.drain(..).collect()
    }

    fn idle(&self) -> bool {
        self.done.is_empty()
    }
}

/// One background thread per executor; jobs run in submission order.
pub struct ThreadExecutor {
    jobs: Option<Sender<Job>>,
    done: Receiver<Done>,
    /// Failure results for submitted jobs, oldest first; popped as real results arrive
    in_flight: VecDeque<Done>,
    /// Results produced without the worker (it was already gone)
    orphaned: Vec<Done>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ThreadExecutor {
    pub fn spawn(backend: Arc<dyn Backend>, probe: Arc<dyn MediaProbe>) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (done_tx, done_rx) = mpsc::channel::<Done>();
        let handle = thread::Builder::new()
            .name("gifwat-worker".into())
            .spawn(move || {
                for job in job_rx {
                    let done = run_guarded(backend.as_ref(), probe.as_ref(), job);
                    if done_tx.send(done).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| tracing::error!(error = %e, "failed to spawn worker thread"))
            .ok();
        Self {
            jobs: handle.as_ref().map(|_| job_tx),
            done: done_rx,
            in_flight: VecDeque::new(),
            orphaned: Vec::new(),
            handle,
        }
    }
}

impl Executor for ThreadExecutor {
    fn submit(&mut self, job: Job) {
        let failed = job.failure("worker is gone");
        let Some(tx) = &self.jobs else {
            tracing::error!("worker is gone; failing job");
            self.orphaned.push(failed);
            return;
        };
        match tx.send(job) {
            Ok(()) => self.in_flight.push_back(failed),
            Err(_) => {
                tracing::error!("worker is gone; failing job");
                self.jobs = None;
                self.orphaned.push(failed);
            }
        }
    }

    fn drain(&mut self) -> Vec<Done> {
        let mut out = std::mem::take(&mut self.orphaned);
        loop {
            match self.done.try_recv() {
                Ok(done) => {
                    self.in_flight.pop_front();
                    out.push(done);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.in_flight.is_empty() {
                        tracing::error!(lost = self.in_flight.len(), "worker exited with jobs in flight");
                    }
                    self.jobs = None;
                    out.extend(self.in_flight.drain(..));
                    break;
                }
            }
        }
        out
    }

    fn idle(&self) -> bool {
        self.in_flight.is_empty() && self.orphaned.is_empty()
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        // closing the job channel ends the worker loop
        self.jobs.take();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}
