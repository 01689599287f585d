// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Saga
//!
//! Ordered log of committed steps for an operation spanning the local ledger
//! and the platform. Each committed step registers how to undo itself; on
//! failure [`Saga::abort`] walks the log backwards and runs every
//! compensation once.
//!
//! A failing compensation is not retried. It is logged as an inconsistency
//! that needs an operator and the unwind moves on to the next step.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use tracing::{error, info, warn};

type CompensationFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
type Compensation<'a> = Box<dyn FnOnce() -> CompensationFuture<'a> + Send + 'a>;

struct CommittedStep<'a> {
    name: &'static str,
    compensate: Compensation<'a>,
}

/// Outcome of a backward walk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnwindReport {
    /// Steps undone, in the order they were undone.
    pub compensated: Vec<&'static str>,
    /// Steps whose compensation failed and were left in place.
    pub failed: Vec<&'static str>,
}

impl UnwindReport {
    pub fn is_consistent(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Saga<'a> {
    name: &'static str,
    subject: String,
    committed: Vec<CommittedStep<'a>>,
}

impl<'a> Saga<'a> {
    pub fn new(name: &'static str, subject: impl Into<String>) -> Self {
        Self {
            name,
            subject: subject.into(),
            committed: Vec::new(),
        }
    }

    /// Records `step` as committed along with the action that reverses it.
    pub fn committed<F, Fut, E>(&mut self, step: &'static str, compensate: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<(), E>> + Send + 'a,
        E: Display + 'a,
    {
        let compensate: Compensation<'a> = Box::new(move || {
            Box::pin(async move { compensate().await.map_err(|e| e.to_string()) })
        });
        self.committed.push(CommittedStep { name: step, compensate });
    }

    pub fn committed_steps(&self) -> Vec<&'static str> {
        self.committed.iter().map(|s| s.name).collect()
    }

    /// Marks the saga done. Nothing is compensated.
    pub fn complete(self) {
        info!(
            saga = self.name,
            subject = %self.subject,
            steps = ?self.committed_steps(),
            "Saga completed"
        );
    }

    /// Undoes every committed step in reverse order after `failed_step`
    /// failed with `cause`.
    pub async fn abort(
        self,
        failed_step: &'static str,
        cause: &(dyn Display + Sync),
    ) -> UnwindReport {
        warn!(
            saga = self.name,
            subject = %self.subject,
            failed_step,
            error = %cause,
            committed = self.committed.len(),
            "Saga step failed, compensating"
        );

        let mut report = UnwindReport::default();
        for step in self.committed.into_iter().rev() {
            match (step.compensate)().await {
                Ok(()) => {
                    info!(
                        saga = self.name,
                        subject = %self.subject,
                        step = step.name,
                        "Step compensated"
                    );
                    report.compensated.push(step.name);
                }
                Err(e) => {
                    error!(
                        inconsistency = true,
                        saga = self.name,
                        subject = %self.subject,
                        step = step.name,
                        failed_step,
                        error = %e,
                        "Compensation failed; manual cleanup required"
                    );
                    report.failed.push(step.name);
                }
            }
        }
        report
    }
}
