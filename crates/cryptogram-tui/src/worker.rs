//! Background thread that talks to the puzzle service
//!
//! Service calls block, so they run here while the UI keeps drawing.
//! Every job carries the generation of the puzzle it belongs to; the app
//! drops completions from an older generation after a new puzzle starts.

use cryptogram_core::{dispatch, Outgoing, PuzzlePayload, PuzzleService, Response, ServiceResult, Ticket};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Work for the service thread
#[derive(Debug)]
pub enum Job {
    Fetch { generation: u64 },
    Send { generation: u64, outgoing: Outgoing },
}

/// Answer from the service thread
#[derive(Debug)]
pub enum Completion {
    Fetched {
        generation: u64,
        result: ServiceResult<PuzzlePayload>,
    },
    Answered {
        generation: u64,
        ticket: Ticket,
        outcome: ServiceResult<Response>,
    },
}

impl Completion {
    pub fn generation(&self) -> u64 {
        match self {
            Completion::Fetched { generation, .. } | Completion::Answered { generation, .. } => {
                *generation
            }
        }
    }
}

/// Handle to the service thread.
///
/// Dropping it closes the job channel. The thread is detached: it finishes
/// the call in progress (bounded by the request timeout) and exits on its
/// own, so quitting never waits on a hung request.
pub struct Worker {
    jobs: Sender<Job>,
    completions: Receiver<Completion>,
}

impl Worker {
    pub fn spawn(service: Arc<dyn PuzzleService>) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (done_tx, done_rx) = mpsc::channel();

        thread::Builder::new()
            .name("puzzle-service".into())
            .spawn(move || {
                for job in job_rx {
                    let completion = run(service.as_ref(), job);
                    if done_tx.send(completion).is_err() {
                        break;
                    }
                }
                debug!("service worker stopped");
            })?;

        Ok(Self {
            jobs: job_tx,
            completions: done_rx,
        })
    }

    /// Queue a job. Returns false if the worker has stopped.
    pub fn submit(&self, job: Job) -> bool {
        match self.jobs.send(job) {
            Ok(()) => true,
            Err(_) => {
                warn!("service worker is gone");
                false
            }
        }
    }

    /// Next finished job, if any
    pub fn try_recv(&self) -> Option<Completion> {
        match self.completions.try_recv() {
            Ok(completion) => Some(completion),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

fn run(service: &dyn PuzzleService, job: Job) -> Completion {
    match job {
        Job::Fetch { generation } => {
            debug!(generation, backend = service.backend_name(), "fetching puzzle");
            Completion::Fetched {
                generation,
                result: service.fetch_puzzle(),
            }
        }
        Job::Send {
            generation,
            outgoing,
        } => {
            debug!(generation, ticket = %outgoing.ticket, request = ?outgoing.request, "sending request");
            Completion::Answered {
                generation,
                ticket: outgoing.ticket,
                outcome: dispatch(service, &outgoing.request),
            }
        }
    }
}
