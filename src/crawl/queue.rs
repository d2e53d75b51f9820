// src/crawl/queue.rs
// =============================================================================
// A bounded work queue that knows when all the work is finished.
//
// How it works:
// 1. Producers call Submitter::submit(job). This first sends "+1" to the
//    counter observer, then puts the job in a bounded channel. If the channel
//    is full, submit waits until the dispatcher takes something out.
// 2. The dispatch loop (WorkQueue::run) takes jobs out of the channel and
//    spawns one tokio task per job. When a job finishes, "-1" is sent to the
//    observer.
// 3. The observer is a single task that adds up the +1/-1 messages. All of
//    them go through one channel, so it sees them in one order. When the total
//    comes back to zero, no job is queued or running anywhere, and it tells
//    the dispatch loop to stop.
//
// Why can't we just check "counter == 0" with an atomic?
// - A job's children are submitted (+1) before the job itself finishes (-1),
//   so the total only hits zero when the last job is done. But two threads
//   reading an atomic could each see a different "last" value. With one
//   observer there is exactly one place that decides.
//
// Rust concepts:
// - mpsc channels: Many senders, one receiver
// - oneshot channel: Send exactly one value (our "done" signal)
// - tokio::select!: Wait for whichever of several futures is ready first
// - JoinSet: A group of spawned tasks we can wait on or abort together
// =============================================================================

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::error::CrawlError;

// A unit of work: any future that runs to completion on its own task
pub type Job = BoxFuture<'static, ()>;

/// How a call to [`WorkQueue::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The in-flight count returned to zero
    Completed,
    /// The deadline passed first; unfinished jobs were aborted
    DeadlineReached,
    /// Every submitter was dropped and the queue was empty
    Disconnected,
}

pub struct WorkQueue {
    jobs: mpsc::Receiver<Job>,
    ticks: mpsc::UnboundedReceiver<i64>,
    tick_sender: mpsc::UnboundedSender<i64>,
}

/// The producer side of a [`WorkQueue`]. Cheap to clone.
#[derive(Clone)]
pub struct Submitter {
    jobs: mpsc::Sender<Job>,
    ticks: mpsc::UnboundedSender<i64>,
}

impl WorkQueue {
    /// Creates a queue holding at most `capacity` waiting jobs.
    ///
    /// `capacity` must be at least 1 (tokio panics on a zero-sized channel);
    /// `CrawlSettings` guarantees this.
    pub fn new(capacity: usize) -> (Self, Submitter) {
        let (job_sender, jobs) = mpsc::channel(capacity);
        let (tick_sender, ticks) = mpsc::unbounded_channel();

        let queue = Self {
            jobs,
            ticks,
            tick_sender: tick_sender.clone(),
        };
        let submitter = Submitter {
            jobs: job_sender,
            ticks: tick_sender,
        };

        (queue, submitter)
    }

    // Runs the dispatch loop until all submitted work is done
    //
    // Blocks the caller (asynchronously) for the whole crawl. Once this
    // returns, the queue is closed and every later submit fails.
    pub async fn run(self, deadline: Option<Duration>) -> QueueOutcome {
        let WorkQueue {
            mut jobs,
            ticks,
            tick_sender,
        } = self;

        let (done_sender, mut done) = oneshot::channel();
        tokio::spawn(observe_in_flight(ticks, done_sender));

        let timer = tokio::time::sleep(deadline.unwrap_or_default());
        tokio::pin!(timer);

        let mut workers = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                biased;

                _ = &mut done => break QueueOutcome::Completed,

                _ = &mut timer, if deadline.is_some() => break QueueOutcome::DeadlineReached,

                Some(result) = workers.join_next(), if !workers.is_empty() => {
                    // A panicking job never sent its -1, so send it here
                    if let Err(err) = result {
                        warn!("crawl job failed: {}", err);
                        let _ = tick_sender.send(-1);
                    }
                }

                job = jobs.recv() => match job {
                    Some(job) => {
                        let ticks = tick_sender.clone();
                        workers.spawn(async move {
                            job.await;
                            let _ = ticks.send(-1);
                        });
                    }
                    None => break QueueOutcome::Disconnected,
                },
            }
        };

        jobs.close();
        if outcome == QueueOutcome::DeadlineReached {
            warn!("deadline reached with {} job(s) still running", workers.len());
            workers.abort_all();
        }
        // Wait until every job's future is dropped, so nothing still holds
        // a reference into the results
        while workers.join_next().await.is_some() {}

        debug!(?outcome, "work queue stopped");
        outcome
    }
}

impl Submitter {
    // Adds a job to the queue, waiting while the queue is full
    //
    // The +1 is sent before the job becomes visible to the dispatcher, so the
    // observer can never see a job finish that it did not count.
    pub async fn submit(&self, job: Job) -> Result<(), CrawlError> {
        self.ticks.send(1).map_err(|_| CrawlError::QueueClosed)?;

        if self.jobs.send(job).await.is_err() {
            // Keep the count balanced even though the run is over
            let _ = self.ticks.send(-1);
            return Err(CrawlError::QueueClosed);
        }

        Ok(())
    }
}

// The single observer of the in-flight count
async fn observe_in_flight(mut ticks: mpsc::UnboundedReceiver<i64>, done: oneshot::Sender<()>) {
    let mut in_flight: i64 = 0;

    while let Some(delta) = ticks.recv().await {
        in_flight += delta;
        if in_flight == 0 {
            break;
        }
    }

    // No more counting: submits after this point fail with QueueClosed
    ticks.close();
    let _ = done.send(());
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a bounded channel?
//    - mpsc::channel(capacity) holds at most `capacity` jobs
//    - When it is full, send().await waits instead of growing forever
//    - So if fetching falls behind, discovering new pages slows down too
//
// 2. Why is the +1 sent before the job?
//    - If the job went first, it could run and send -1 before the +1 arrived
//    - The observer would see the total hit zero and stop the crawl early
//
// 3. What does `biased;` do in select!?
//    - Normally select! picks a random ready branch
//    - biased checks branches top to bottom, so "done" always wins
//
// 4. What is BoxFuture?
//    - Pin<Box<dyn Future<Output = ()> + Send>>
//    - Lets the queue hold futures of different concrete types
// -----------------------------------------------------------------------------
