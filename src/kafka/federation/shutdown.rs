//! Parallel, deadline-bounded shutdown of per-cluster consumers
//!
//! Closing a per-cluster consumer can block on broker I/O, so every consumer
//! is closed on its own thread. All threads share one deadline: each gets the
//! time remaining when it starts, not a fixed per-consumer timeout, and the
//! coordinator waits on a completion channel until every thread has reported
//! or the deadline passes.
//!
//! Threads still running at the deadline are left detached and reported in a
//! `ShutdownTimeout` error with their cluster, thread name, thread id and
//! running time. Every close error (and panic) is collected; none is dropped.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, error, info, warn};

use super::snapshot::ClusterConsumerEntry;
use crate::kafka::cluster::ConsumerResult;
use crate::kafka::constants::{CLOSE_THREAD_NAME_PREFIX, CONSUMER_CLOSE_MAX_TIMEOUT};
use crate::kafka::error::{
    ConsumerError, FederationError, Result, ShutdownFailure, StuckShutdown,
};
use crate::kafka::types::ClusterGroupDescriptor;

/// A close task that has not reported back yet
struct PendingClose {
    cluster: String,
    thread: Thread,
}

/// `start + timeout`, saturating for timeouts too large for `Instant`
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(CONSUMER_CLOSE_MAX_TIMEOUT))
        .unwrap_or(start)
}

/// Close every entry's consumer in parallel within `timeout`
pub(crate) fn close_all(
    group: &ClusterGroupDescriptor,
    entries: &[ClusterConsumerEntry],
    timeout: Duration,
) -> Result<()> {
    if entries.is_empty() {
        info!(%group, "no consumers to close for cluster group");
        return Ok(());
    }

    debug!(
        %group,
        count = entries.len(),
        timeout_ms = timeout.as_millis() as u64,
        "closing per-cluster consumers"
    );

    let start = Instant::now();
    let deadline = deadline_after(start, timeout);
    let (done_tx, done_rx) =
        crossbeam_channel::bounded::<(usize, ConsumerResult<()>)>(entries.len());
    let mut pending: HashMap<usize, PendingClose> = HashMap::with_capacity(entries.len());
    let mut failures: Vec<ShutdownFailure> = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let cluster = entry.cluster().name().to_string();
        let consumer = Arc::clone(entry.consumer());
        let done_tx = done_tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}{}", CLOSE_THREAD_NAME_PREFIX, cluster))
            .spawn(move || {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    consumer.lock().close(remaining)
                }))
                .unwrap_or_else(|payload| Err(ConsumerError::Panicked(panic_message(payload))));
                // Nobody is listening any more once the deadline has passed
                let _ = done_tx.send((index, result));
            });

        match spawned {
            // Dropping the JoinHandle detaches the thread
            Ok(handle) => {
                pending.insert(
                    index,
                    PendingClose {
                        cluster,
                        thread: handle.thread().clone(),
                    },
                );
            }
            Err(e) => {
                warn!(%cluster, error = %e, "failed to spawn close thread");
                failures.push(ShutdownFailure {
                    cluster,
                    error: ConsumerError::Other(format!("failed to spawn close thread: {}", e)),
                });
            }
        }
    }
    drop(done_tx);

    while !pending.is_empty() {
        match done_rx.recv_deadline(deadline) {
            Ok((index, result)) => {
                let Some(closed) = pending.remove(&index) else {
                    continue;
                };
                match result {
                    Ok(()) => debug!(cluster = %closed.cluster, "per-cluster consumer closed"),
                    Err(error) => {
                        warn!(
                            cluster = %closed.cluster,
                            error = %error,
                            "per-cluster consumer failed to close"
                        );
                        failures.push(ShutdownFailure {
                            cluster: closed.cluster,
                            error,
                        });
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                let stuck = stuck_diagnostics(pending, start);
                for task in &stuck {
                    error!(
                        %group,
                        cluster = %task.cluster,
                        thread_name = %task.thread_name,
                        thread_id = %task.thread_id,
                        elapsed_ms = task.elapsed.as_millis() as u64,
                        "per-cluster consumer close still running at deadline"
                    );
                }
                return Err(FederationError::ShutdownTimeout {
                    group: group.clone(),
                    timeout,
                    stuck,
                    failures,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Every task reports before exiting, so this means a task died silently
                for (_, lost) in pending.drain() {
                    failures.push(ShutdownFailure {
                        cluster: lost.cluster,
                        error: ConsumerError::Other(
                            "close task exited without reporting".to_string(),
                        ),
                    });
                }
            }
        }
    }

    if !failures.is_empty() {
        return Err(FederationError::ShutdownFailed {
            group: group.clone(),
            failures,
        });
    }

    info!(
        %group,
        count = entries.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "closed per-cluster consumers"
    );
    Ok(())
}

fn stuck_diagnostics(pending: HashMap<usize, PendingClose>, start: Instant) -> Vec<StuckShutdown> {
    let elapsed = start.elapsed();
    let mut stuck: Vec<StuckShutdown> = pending
        .into_values()
        .map(|task| StuckShutdown {
            thread_name: task.thread.name().unwrap_or("<unnamed>").to_string(),
            thread_id: format!("{:?}", task.thread.id()),
            cluster: task.cluster,
            elapsed,
        })
        .collect();
    stuck.sort_by(|a, b| a.cluster.cmp(&b.cluster));
    stuck
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
