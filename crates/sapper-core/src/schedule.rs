//! Bounded FIFO command scheduler.
//!
//! Exactly one command is in flight at a time; every send first waits for
//! limiter admission. Rate rejections re-queue the command, transport
//! failures retry with exponential backoff up to a cap, logic rejections
//! are reported to the caller and never retried here.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::client::{ApiError, ArenaApi};
use crate::limit::{Admission, RateLimiter};
use crate::models::{MoveCommand, UnitId};

#[derive(Debug, thiserror::Error)]
#[error("scheduler queue full (capacity {capacity})")]
pub struct SchedulerFull {
    pub capacity: usize,
}

#[derive(Debug)]
struct Pending {
    command: MoveCommand,
    transport_attempts: u32,
}

/// Outcome of one submitted command, keyed by owning unit.
#[derive(Debug)]
pub struct CommandOutcome {
    pub unit: UnitId,
    pub outcome: SubmitOutcome,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Accepted by the arena.
    Accepted,
    /// Game-logic rejection; not retried.
    Rejected(String),
    /// Transport retries exhausted.
    Failed(String),
    /// Still queued at the deadline, dropped without sending.
    Dropped,
}

pub struct RequestScheduler {
    api: Arc<dyn ArenaApi>,
    limiter: Arc<RateLimiter>,
    queue: VecDeque<Pending>,
    capacity: usize,
    transport_retries: u32,
    transport_backoff: Duration,
}

impl RequestScheduler {
    pub fn new(
        api: Arc<dyn ArenaApi>,
        limiter: Arc<RateLimiter>,
        capacity: usize,
        transport_retries: u32,
        transport_backoff: Duration,
    ) -> Self {
        Self {
            api,
            limiter,
            queue: VecDeque::with_capacity(capacity),
            capacity,
            transport_retries,
            transport_backoff,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn enqueue(&mut self, command: MoveCommand) -> Result<(), SchedulerFull> {
        if self.queue.len() >= self.capacity {
            return Err(SchedulerFull {
                capacity: self.capacity,
            });
        }
        self.queue.push_back(Pending {
            command,
            transport_attempts: 0,
        });
        Ok(())
    }

    /// Drop queued commands whose unit no longer qualifies (cancellation).
    pub fn drop_where(&mut self, mut stale: impl FnMut(&UnitId) -> bool) -> Vec<UnitId> {
        let mut dropped = Vec::new();
        self.queue.retain(|pending| {
            if stale(&pending.command.unit) {
                dropped.push(pending.command.unit.clone());
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Drain the queue in FIFO order until it is empty or the deadline
    /// passes. Anything still queued at the deadline is dropped.
    pub async fn flush(&mut self, deadline: Instant) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::new();

        while let Some(mut pending) = self.queue.pop_front() {
            if Instant::now() >= deadline {
                outcomes.push(Self::dropped(pending));
                outcomes.extend(self.queue.drain(..).map(Self::dropped));
                break;
            }

            if !self.admit(deadline).await {
                outcomes.push(Self::dropped(pending));
                outcomes.extend(self.queue.drain(..).map(Self::dropped));
                break;
            }

            let unit = pending.command.unit.clone();
            match self.api.submit_move(&pending.command).await {
                Ok(_) => {
                    self.limiter.on_success();
                    tracing::debug!(unit = unit.short(), "command accepted");
                    outcomes.push(CommandOutcome {
                        unit,
                        outcome: SubmitOutcome::Accepted,
                    });
                }
                Err(ApiError::Throttled { retry_after }) => {
                    self.limiter.on_throttled(retry_after);
                    // Budget exhaustion, not a verdict: back of the queue.
                    self.queue.push_back(pending);
                }
                Err(ApiError::Rejected(reason)) => {
                    tracing::warn!(unit = unit.short(), %reason, "command rejected");
                    outcomes.push(CommandOutcome {
                        unit,
                        outcome: SubmitOutcome::Rejected(reason),
                    });
                }
                Err(err) => {
                    pending.transport_attempts += 1;
                    if pending.transport_attempts > self.transport_retries {
                        tracing::warn!(
                            unit = unit.short(),
                            error = %err,
                            "command failed, transport retries exhausted"
                        );
                        outcomes.push(CommandOutcome {
                            unit,
                            outcome: SubmitOutcome::Failed(err.to_string()),
                        });
                    } else {
                        let backoff = self
                            .transport_backoff
                            .saturating_mul(1u32 << (pending.transport_attempts - 1).min(5));
                        tracing::debug!(
                            unit = unit.short(),
                            attempt = pending.transport_attempts,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %err,
                            "transport error, retrying"
                        );
                        tokio::time::sleep(backoff.min(Self::remaining(deadline))).await;
                        self.queue.push_front(pending);
                    }
                }
            }
        }
        outcomes
    }

    /// Wait for limiter admission, bounded by the deadline. Returns false
    /// when admission cannot happen in time.
    async fn admit(&self, deadline: Instant) -> bool {
        loop {
            match self.limiter.try_acquire() {
                Admission::Granted => return true,
                Admission::RetryAfter(wait) => {
                    if Instant::now() + wait >= deadline {
                        return false;
                    }
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn remaining(deadline: Instant) -> Duration {
        deadline.saturating_duration_since(Instant::now())
    }

    fn dropped(pending: Pending) -> CommandOutcome {
        CommandOutcome {
            unit: pending.command.unit.clone(),
            outcome: SubmitOutcome::Dropped,
        }
    }
}
