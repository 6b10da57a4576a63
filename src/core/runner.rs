//! # Drive one task and settle it.
//!
//! A [`TaskRun`] is spawned for every task right after it is registered. It
//! calls the runner, then settles the task exactly once.
//!
//! ```text
//! runner.run(ctx) ──► Ok(output)   ──► settle(output.status) ─┐
//!        │                                                     ├─► Ok  ─► publish terminal event
//!        ├──────────► Err(reject)  ──► settle(FAILED) ─────────┤         report_error on rejection
//!        └─ panic ──► Err(Panic)   ──► settle(FAILED) ─────────┘
//!                                                              └─► Err(CANCELLED) ─► discard result,
//!                                                                                    cancelled output
//! then: unsubscribe listener
//!       if not drained by shutdown and epoch unchanged (checked under the
//!       live-table lock): remove from live table, write action cache
//!       send result to the ResultHandle
//! ```
//!
//! ## Rules
//! - The runner's result never overwrites a terminal status; a cancelled task
//!   resolves with a cancelled outcome whatever the runner produced.
//! - A rejected runner still gets a cache entry (empty trace, FAILED).
//! - A task that settles after [`Engine::close_agent`](crate::Engine::close_agent)
//!   drained it leaves no trace in the live table or the cache.
//! - Bookkeeping failures are logged and reported on the bus; the caller's
//!   result is the same either way.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;

use crate::cache::{ActionCache, ActionCacheEntry, ActionCacheStore};
use crate::core::live::{LiveTasks, Removal};
use crate::core::transitions;
use crate::error::{Rejection, TaskError};
use crate::events::EventKind;
use crate::fabric::Fabric;
use crate::fabric::best_effort::panic_message;
use crate::tasks::{
    CANCELLED_OUTPUT, CLOSED_OUTPUT, CancelReason, RunContext, RunnerRef, TaskOutcome, TaskOutput,
    TaskId, TaskResult, TaskState, TaskStatus,
};

pub(crate) struct TaskRun {
    pub(crate) runner: RunnerRef,
    pub(crate) state: Arc<TaskState>,
    pub(crate) fabric: Arc<Fabric>,
    pub(crate) live: Arc<LiveTasks>,
    pub(crate) cache: Arc<ActionCacheStore>,
    pub(crate) epoch: u64,
    pub(crate) max_diag: usize,
}

impl TaskRun {
    pub(crate) async fn drive(self, ctx: RunContext, tx: watch::Sender<Option<TaskResult>>) {
        let res = match AssertUnwindSafe(self.runner.run(ctx)).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(Rejection::Panic(panic_message(panic.as_ref()))),
        };
        let result = self.settle(res);
        // The handle may already be gone; nothing to deliver then.
        let _ = tx.send(Some(result));
    }

    fn settle(&self, res: Result<TaskOutput, Rejection>) -> TaskResult {
        let id = self.state.id().clone();

        let (target, output, trace, rejection) = match res {
            Ok(out) => (terminal_for(&out, id.as_str()), out.output, out.trace, None),
            Err(rejection) => (TaskStatus::Failed, None, Vec::new(), Some(rejection)),
        };

        let result = match self.state.settle(target) {
            Ok(status) => match rejection {
                Some(rejection) => {
                    let err = TaskError::from_rejection(id.as_str(), rejection, self.max_diag);
                    tracing::warn!(task = %id, label = err.as_label(), error = %err.message, "task failed");
                    self.fabric.report_status(id.as_str(), status);
                    self.fabric.report_error(&err);
                    Err(err)
                }
                None => {
                    let (kind, output) = match status {
                        TaskStatus::Cancelled => {
                            (EventKind::TaskCancelled, Some(CANCELLED_OUTPUT.to_string()))
                        }
                        TaskStatus::Failed => (EventKind::TaskFailed, output),
                        _ => (EventKind::TaskCompleted, output),
                    };
                    tracing::debug!(task = %id, %status, "task settled");
                    transitions::announce(&self.state, &self.fabric, status, kind, None);
                    Ok(TaskOutcome {
                        task_id: id.clone(),
                        status,
                        output,
                    })
                }
            },
            Err(current) => {
                tracing::debug!(task = %id, status = %current, "runner result discarded");
                let output = match self.state.cancel_reason() {
                    Some(CancelReason::Shutdown) => CLOSED_OUTPUT,
                    _ => CANCELLED_OUTPUT,
                };
                Ok(TaskOutcome {
                    task_id: id.clone(),
                    status: current,
                    output: Some(output.to_string()),
                })
            }
        };

        self.fabric.unsubscribe(id.as_str());

        if self.state.cancel_reason() == Some(CancelReason::Shutdown) {
            tracing::debug!(task = %id, "drained by engine close; bookkeeping skipped");
            return result;
        }
        self.record(&id, trace);
        result
    }

    fn record(&self, id: &TaskId, trace: Vec<ActionCacheEntry>) {
        match self.live.remove_settled(id.as_str(), self.fabric.epoch(), self.epoch) {
            Removal::Removed => {}
            Removal::Stale => {
                tracing::debug!(task = %id, "settled after engine close; bookkeeping skipped");
                return;
            }
            Removal::Missing => self.fabric.report_bookkeeping("live_tasks", Some(id.as_str())),
        }
        let status = self.state.status();
        match self.cache.insert(ActionCache::new(id.clone(), status, trace)) {
            Ok(evicted) => {
                for old in evicted {
                    tracing::debug!(task = %old, "action cache entry evicted");
                }
            }
            Err(e) => {
                tracing::warn!(task = %id, error = %e, "action cache write skipped");
                self.fabric.report_bookkeeping("action_cache", Some(id.as_str()));
            }
        }
    }
}

/// Maps the runner's reported status onto a terminal one.
fn terminal_for(out: &TaskOutput, id: &str) -> TaskStatus {
    match out.status {
        s if s.is_terminal() => s,
        other => {
            tracing::warn!(task = id, status = %other, "runner returned a non-terminal status; recording FAILED");
            TaskStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shutdown;
    use crate::events::Bus;
    use crate::tasks::RunnerFn;
    use tokio_util::sync::CancellationToken;

    struct Setup {
        run: TaskRun,
        bus: tokio::sync::broadcast::Receiver<crate::events::Event>,
    }

    fn setup() -> Setup {
        let fabric = Arc::new(Fabric::new(Bus::new(64), 8));
        let bus = fabric.bus().subscribe();
        let live = Arc::new(LiveTasks::default());
        let cache = Arc::new(ActionCacheStore::new(8));
        let state = Arc::new(TaskState::new(
            TaskId::generate(),
            "open the page".into(),
            None,
            CancellationToken::new(),
        ));
        let epoch = fabric.epoch().current();
        live.insert(
            crate::core::live::LiveTask {
                state: Arc::clone(&state),
                epoch,
            },
            fabric.epoch(),
        )
        .unwrap();
        let _events = fabric.subscribe(state.id().as_str()).unwrap();
        let _ = state.start();

        let runner: RunnerRef = RunnerFn::arc(|_ctx: RunContext| async {
            Ok::<_, Rejection>(TaskOutput::completed("unused"))
        });
        Setup {
            run: TaskRun {
                runner,
                state,
                fabric,
                live,
                cache,
                epoch,
                max_diag: 200,
            },
            bus,
        }
    }

    fn bookkeeping_failures(rx: &mut tokio::sync::broadcast::Receiver<crate::events::Event>) -> usize {
        let mut n = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::BookkeepingFailed {
                n += 1;
            }
        }
        n
    }

    #[test]
    fn close_between_runner_return_and_settle_leaves_no_trace() {
        let Setup { run, mut bus } = setup();
        let id = run.state.id().clone();

        shutdown::drain(&run.fabric, &run.live);
        let outcome = run
            .settle(Ok(TaskOutput::completed("late success")))
            .unwrap();

        assert_eq!(outcome.status, TaskStatus::Cancelled);
        assert_eq!(outcome.output.as_deref(), Some(CLOSED_OUTPUT));
        assert!(run.cache.get(id.as_str()).is_none());
        assert!(run.cache.is_empty());
        assert!(run.live.ids().is_empty());
        assert_eq!(bookkeeping_failures(&mut bus), 0);
    }

    #[test]
    fn settled_then_closed_before_bookkeeping_is_left_to_shutdown() {
        let Setup { run, mut bus } = setup();
        let id = run.state.id().clone();

        // Settled, then the epoch moves before the live table is touched.
        run.fabric.epoch().advance();
        let outcome = run.settle(Ok(TaskOutput::completed("done"))).unwrap();

        assert_eq!(outcome.status, TaskStatus::Completed);
        assert!(run.cache.is_empty());
        assert_eq!(run.live.ids(), vec![id]);
        assert_eq!(bookkeeping_failures(&mut bus), 0);
    }

    #[test]
    fn current_epoch_settlement_is_recorded() {
        let Setup { run, mut bus } = setup();
        let id = run.state.id().clone();

        let outcome = run.settle(Ok(TaskOutput::completed("done"))).unwrap();

        assert_eq!(outcome.output.as_deref(), Some("done"));
        assert_eq!(run.cache.get(id.as_str()).map(|c| c.status), Some(TaskStatus::Completed));
        assert!(run.live.ids().is_empty());
        assert_eq!(bookkeeping_failures(&mut bus), 0);
    }
}
