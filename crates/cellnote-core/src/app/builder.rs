//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - `Send` でないホストを、専用スレッドの中で生成する

use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::info;

use super::lifecycle::Lifecycle;
use super::worker_loop::{WorkerError, WorkerLoop, WorkerSummary};
use crate::config::{Settings, ValidationError};
use crate::domain::{Task, TaskId};
use crate::ports::{ContentSource, HostApplication, NoopSink, ReportSink};
use crate::queue::{QueueError, TaskQueue};

/// Builds the host on the worker thread. The host itself may be thread-bound.
pub type HostFactory = Box<dyn FnOnce() -> Box<dyn HostApplication> + Send>;

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no host factory configured")]
    MissingHost,

    #[error("no content source configured")]
    MissingContent,

    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] ValidationError),
}

/// # 使用例
/// ```ignore
/// let running = AppBuilder::new()
///     .settings(settings)
///     .host(move || Box::new(SimulatedHost::from_fixture(&fixture)))
///     .content(TemplateContentSource::default())
///     .build()?
///     .spawn()?;
/// running.submit(Task::auto_annotate())?;
/// running.quit()?;
/// let summary = running.join()?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    settings: Settings,
    host: Option<HostFactory>,
    content: Option<Arc<dyn ContentSource>>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn host<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> Box<dyn HostApplication> + Send + 'static,
    {
        self.host = Some(Box::new(factory));
        self
    }

    pub fn content(mut self, content: impl ContentSource + 'static) -> Self {
        self.content = Some(Arc::new(content));
        self
    }

    /// Defaults to a sink that drops reports.
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 検証して App を生成
    ///
    /// - ホストと本文ソースが揃っていること
    /// - Settings::validate() が通ること
    pub fn build(self) -> Result<App, BuildError> {
        self.settings.validate()?;
        let host = self.host.ok_or(BuildError::MissingHost)?;
        let content = self.content.ok_or(BuildError::MissingContent)?;
        Ok(App {
            settings: self.settings,
            host,
            content,
            sink: self.sink.unwrap_or_else(|| Arc::new(NoopSink)),
        })
    }
}

/// Validated, not yet running.
pub struct App {
    settings: Settings,
    host: HostFactory,
    content: Arc<dyn ContentSource>,
    sink: Arc<dyn ReportSink>,
}

impl App {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Start the worker thread with its own single-threaded runtime.
    pub fn spawn(self) -> Result<RunningApp, WorkerError> {
        let queue = Arc::new(TaskQueue::new());
        let lifecycle = Arc::new(Lifecycle::new());

        let worker_queue = queue.clone();
        let worker_lifecycle = lifecycle.clone();
        let App {
            settings,
            host,
            content,
            sink,
        } = self;

        let join = std::thread::Builder::new()
            .name("cellnote-worker".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        worker_queue.close();
                        worker_lifecycle.advance(super::lifecycle::Phase::Stopped);
                        return Err(WorkerError::Runtime(e));
                    }
                };
                let worker = WorkerLoop::new(
                    host(),
                    worker_queue,
                    worker_lifecycle,
                    &settings,
                    content,
                    sink,
                );
                runtime.block_on(worker.run())
            })
            .map_err(WorkerError::Runtime)?;

        info!("worker thread spawned");
        Ok(RunningApp {
            queue,
            lifecycle,
            join,
        })
    }
}

/// Handle held by the trigger side.
pub struct RunningApp {
    queue: Arc<TaskQueue>,
    lifecycle: Arc<Lifecycle>,
    join: JoinHandle<Result<WorkerSummary, WorkerError>>,
}

impl RunningApp {
    pub fn submit(&self, task: Task) -> Result<TaskId, QueueError> {
        let id = task.id();
        self.queue.push(task)?;
        Ok(id)
    }

    /// Enqueue `quit`. Tasks already queued ahead of it still run.
    pub fn quit(&self) -> Result<TaskId, QueueError> {
        self.submit(Task::quit())
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Wait for the worker thread to finish.
    pub fn join(self) -> Result<WorkerSummary, WorkerError> {
        self.join.join().map_err(|_| WorkerError::Panicked)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellValue;
    use crate::impls::{MemorySink, SimulatedHost, TemplateContentSource};

    fn fast_settings() -> Settings {
        let mut settings = Settings::default();
        settings.retry.base_delay_ms = 1;
        settings.retry.max_delay_ms = 5;
        settings.readiness.timeout_ms = 20;
        settings.readiness.poll_interval_ms = 1;
        settings.worker.idle_poll_ms = 5;
        settings
    }

    #[test]
    fn build_requires_host_and_content() {
        let err = AppBuilder::new().build().err().unwrap();
        assert!(matches!(err, BuildError::MissingHost));

        let err = AppBuilder::new()
            .host(|| Box::new(SimulatedHost::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::MissingContent));
    }

    #[test]
    fn build_rejects_invalid_settings() {
        let mut settings = Settings::default();
        settings.retry.max_attempts = 0;
        let err = AppBuilder::new()
            .settings(settings)
            .host(|| Box::new(SimulatedHost::new()))
            .content(TemplateContentSource::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::InvalidSettings(_)));
    }

    #[test]
    fn spawned_worker_processes_then_quits() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        host.set_cell("Sheet1", 1, 1, CellValue::text("AAPL"));
        host.select(3, 3, 1, 1);
        let sink = MemorySink::new();

        let worker_host = host.clone();
        let running = AppBuilder::new()
            .settings(fast_settings())
            .host(move || Box::new(worker_host))
            .content(TemplateContentSource::default())
            .sink(Arc::new(sink.clone()))
            .build()
            .unwrap()
            .spawn()
            .unwrap();

        running.submit(Task::auto_annotate()).unwrap();
        running.submit(Task::health_check()).unwrap();
        running.quit().unwrap();
        let lifecycle = running.lifecycle().clone();

        let summary = running.join().unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(sink.len(), 2);
        assert_eq!(host.annotations("Sheet1", 3, 3).len(), 1);
        assert!(lifecycle.is_stopped());
        assert!(!lifecycle.accepts_triggers());
    }

    #[test]
    fn init_failure_is_returned_from_join() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        host.fail_attach(crate::ports::HostFault::Disconnected);

        let running = AppBuilder::new()
            .settings(fast_settings())
            .host(move || Box::new(host))
            .content(TemplateContentSource::default())
            .build()
            .unwrap()
            .spawn()
            .unwrap();

        let err = running.join().unwrap_err();
        assert!(matches!(err, WorkerError::Init(_)));
    }
}
