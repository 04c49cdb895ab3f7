//! WorkerLoop - タスク実行ループ
//!
//! ホストに触れる唯一のスレッドで動きます。
//!
//! # フロー
//! 1. INIT: スレッドをホストに attach、任意で起動時ヘルスプローブ
//! 2. IDLE: ホストのメッセージを drain → timeout 付きで queue から pop
//! 3. PROCESSING: RetryController で 1 タスクを実行 → TaskReport を sink へ
//! 4. SHUTDOWN: quit を受けたら queue を閉じ、残りを破棄して detach
//!
//! 途中キャンセルはしません。quit は実行中のタスクが終わってから効きます。

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::lifecycle::{Lifecycle, Phase};
use super::pipeline::AnnotationPipeline;
use crate::config::Settings;
use crate::domain::{HealthReport, OutcomeKind, Task, TaskKind, TaskReport, TaskResult};
use crate::ports::{ContentSource, HostApplication, HostFault, ReportSink};
use crate::queue::TaskQueue;
use crate::retry::RetryController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Init,
    Idle,
    Processing,
    Shutdown,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to attach worker thread to host: {0}")]
    Init(#[source] HostFault),

    #[error("failed to start worker runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("worker thread panicked")]
    Panicked,
}

/// Counters returned when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Tasks still queued behind `quit`.
    pub discarded: usize,
}

pub struct WorkerLoop {
    host: Box<dyn HostApplication>,
    queue: Arc<TaskQueue>,
    lifecycle: Arc<Lifecycle>,
    pipeline: AnnotationPipeline,
    retry: RetryController,
    sink: Arc<dyn ReportSink>,
    idle_poll: Duration,
    startup_probe: bool,
    state: WorkerState,
    summary: WorkerSummary,
}

impl WorkerLoop {
    pub fn new(
        host: Box<dyn HostApplication>,
        queue: Arc<TaskQueue>,
        lifecycle: Arc<Lifecycle>,
        settings: &Settings,
        content: Arc<dyn ContentSource>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            host,
            queue,
            lifecycle,
            pipeline: AnnotationPipeline::new(settings, content),
            retry: RetryController::new(settings.retry_policy()),
            sink,
            idle_poll: settings.idle_poll(),
            startup_probe: settings.worker.startup_probe,
            state: WorkerState::Init,
            summary: WorkerSummary::default(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run until `quit` is dequeued or the queue is closed from outside.
    pub async fn run(mut self) -> Result<WorkerSummary, WorkerError> {
        if let Err(fault) = self.host.attach_thread() {
            error!(%fault, "worker init failed");
            self.queue.close();
            self.lifecycle.advance(Phase::Stopped);
            return Err(WorkerError::Init(fault));
        }
        self.lifecycle.advance(Phase::Running);
        info!("worker attached to host");

        if self.startup_probe {
            self.probe_on_startup().await;
        }

        self.state = WorkerState::Idle;
        loop {
            let drained = self.host.drain_messages();
            if drained > 0 {
                debug!(drained, "host messages drained");
            }

            let Some(task) = self.queue.pop_timeout(self.idle_poll).await else {
                if self.queue.is_closed() {
                    info!("queue closed; leaving idle loop");
                    break;
                }
                continue;
            };

            if task.kind() == TaskKind::Quit {
                info!(task_id = %task.id(), "quit received");
                break;
            }

            self.state = WorkerState::Processing;
            let report = self.process(&task).await;
            self.sink.record(&report);
            self.summary.processed += 1;
            if report.is_success() {
                self.summary.succeeded += 1;
            } else {
                self.summary.failed += 1;
            }
            self.state = WorkerState::Idle;
        }

        Ok(self.shutdown())
    }

    async fn probe_on_startup(&self) {
        match self.pipeline.health(self.host.as_ref()).await {
            Ok(health) if health.ready => {
                info!(version = ?health.version, document = ?health.document, "startup probe: host ready")
            }
            Ok(health) => warn!(detail = %health.detail, "startup probe: host not ready"),
            Err(err) => warn!(error = %err, "startup probe failed"),
        }
    }

    async fn process(&self, task: &Task) -> TaskReport {
        let span = info_span!("task", task_id = %task.id(), kind = %task.kind());
        async {
            let started = Instant::now();
            let host = self.host.as_ref();
            info!(queued_at = %task.enqueued_at(), "task started");

            let (outcome, result, attempts, degradations) = match task.kind() {
                TaskKind::HealthCheck => {
                    let run = self
                        .retry
                        .run(task.kind().as_str(), |_| self.pipeline.health(host))
                        .await;
                    let health = run
                        .result
                        .unwrap_or_else(|err| HealthReport::unavailable(err.to_string()));
                    let outcome = if health.ready {
                        OutcomeKind::Success
                    } else {
                        OutcomeKind::Failure
                    };
                    (outcome, TaskResult::Health(health), run.attempts, Vec::new())
                }
                _ => {
                    let run = self
                        .retry
                        .run(task.kind().as_str(), |_| self.pipeline.annotate(host, task))
                        .await;
                    match run.result {
                        Ok(done) => (
                            OutcomeKind::Success,
                            TaskResult::Annotated(done.value),
                            run.attempts,
                            done.degradations,
                        ),
                        Err(err) => (
                            OutcomeKind::Failure,
                            TaskResult::Failed {
                                error: err.kind(),
                                message: err.message().to_string(),
                            },
                            run.attempts,
                            Vec::new(),
                        ),
                    }
                }
            };

            let report = TaskReport {
                task_id: task.id(),
                kind: task.kind(),
                outcome,
                result,
                attempts,
                latency_ms: started.elapsed().as_millis() as u64,
                degradations,
            };
            match report.error_kind() {
                None => info!(
                    outcome = ?report.outcome,
                    attempts,
                    latency_ms = report.latency_ms,
                    "task finished"
                ),
                Some(kind) => warn!(
                    outcome = ?report.outcome,
                    error = %kind,
                    attempts,
                    latency_ms = report.latency_ms,
                    "task failed"
                ),
            }
            report
        }
        .instrument(span)
        .await
    }

    fn shutdown(mut self) -> WorkerSummary {
        self.state = WorkerState::Shutdown;
        self.lifecycle.advance(Phase::ShuttingDown);

        let discarded = self.queue.close();
        if !discarded.is_empty() {
            warn!(count = discarded.len(), "discarding tasks queued after quit");
        }
        self.summary.discarded = discarded.len();

        self.host.detach_thread();
        self.lifecycle.advance(Phase::Stopped);
        info!(
            processed = self.summary.processed,
            succeeded = self.summary.succeeded,
            failed = self.summary.failed,
            "worker stopped"
        );
        self.summary
    }
}
