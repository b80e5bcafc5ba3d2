//! Orchestrator: feeds locations to the worker pool until stopped

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::stats::StatsSnapshot;
use super::worker::{JobReceiver, Worker, WorkerReport};
use super::{BookingContext, StopReason, StopSignal};
use crate::error::{Error, Result};
use crate::models::{Booking, Location};

/// Upper bound on concurrent workers
pub const MAX_WORKERS: usize = 16;

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub booking: Option<Booking>,
    pub stop_reason: Option<StopReason>,
    pub enqueued: u64,
    pub workers: Vec<WorkerReport>,
    pub stats: StatsSnapshot,
}

impl RunSummary {
    pub fn is_booked(&self) -> bool {
        self.booking.is_some()
    }
}

/// Drives a pool of workers over a cyclic list of locations
#[derive(Debug)]
pub struct Orchestrator {
    ctx: Arc<BookingContext>,
    locations: Vec<Location>,
    workers: usize,
}

impl Orchestrator {
    pub fn new(ctx: BookingContext, locations: Vec<Location>, workers: usize) -> Result<Self> {
        if locations.is_empty() {
            return Err(Error::config("at least one location is required"));
        }
        if !(1..=MAX_WORKERS).contains(&workers) {
            return Err(Error::config(format!(
                "worker count must be between 1 and {MAX_WORKERS}, got {workers}"
            )));
        }

        Ok(Self {
            ctx: Arc::new(ctx),
            locations,
            workers,
        })
    }

    /// Handle for stopping the run from outside (e.g. on Ctrl-C)
    pub fn stop_signal(&self) -> StopSignal {
        self.ctx.stop.clone()
    }

    pub fn context(&self) -> &Arc<BookingContext> {
        &self.ctx
    }

    /// Run until a booking is confirmed or the stop signal is set
    pub async fn run(&self) -> RunSummary {
        info!(
            workers = self.workers,
            locations = self.locations.len(),
            "Starting booker"
        );

        let (tx, rx) = mpsc::channel::<Location>(self.workers);
        let rx: JobReceiver = Arc::new(Mutex::new(rx));

        let handles: Vec<_> = (1..=self.workers)
            .map(|id| {
                let worker = Worker::new(id, Arc::clone(&self.ctx));
                tokio::spawn(worker.run(Arc::clone(&rx)))
            })
            .collect();
        drop(rx);

        let enqueued = self.feed(tx).await;

        info!("Waiting for workers to finish");

        let mut workers = Vec::with_capacity(handles.len());
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(report) => workers.push(report),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }

        let booking = workers.iter().find_map(|report| report.booking.clone());
        let stats = self.ctx.stats.snapshot();

        info!(
            booked = booking.is_some(),
            enqueued,
            polls = stats.polls,
            unavailable = stats.unavailable,
            abandoned = stats.abandoned,
            "Booker finished"
        );

        RunSummary {
            booking,
            stop_reason: self.ctx.stop.reason(),
            enqueued,
            workers,
            stats,
        }
    }

    /// Cycle the location list into the queue; returns how many were sent
    ///
    /// Dropping `tx` on return closes the queue.
    async fn feed(&self, tx: mpsc::Sender<Location>) -> u64 {
        let stop = &self.ctx.stop;
        let mut enqueued = 0;

        for location in self.locations.iter().cycle() {
            if stop.is_stopped() {
                break;
            }

            tokio::select! {
                biased;

                reason = stop.stopped() => {
                    debug!(?reason, "Stop signal received while queue was full");
                    break;
                }
                sent = tx.send(location.clone()) => {
                    if sent.is_err() {
                        warn!("All workers exited, closing queue");
                        break;
                    }
                    enqueued += 1;
                }
            }
        }

        info!(reason = ?stop.reason(), "Stopped enqueueing locations");
        enqueued
    }
}
