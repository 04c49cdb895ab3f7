//! cellnote-core
//!
//! Resilient session adapter for annotating cells in a live spreadsheet application.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, selection, errors, decision, outcome）
//! - **ports**: 抽象化レイヤー（HostApplication, ContentSource, ReportSink）
//! - **session**: ホストに触れる部品（SessionAdapter, ReadinessProber, ContextExtractor, AnnotationWriter）
//! - **retry**: バックオフポリシーと RetryController
//! - **queue**: トリガースレッドからワーカーへの FIFO
//! - **app**: アプリケーションロジック（builder, lifecycle, pipeline, worker_loop）
//! - **impls**: 実装（SimulatedHost など開発・テスト用）
//! - **config**: Settings と検証

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod retry;
pub mod session;

pub use app::{AppBuilder, RunningApp};
pub use config::Settings;
pub use domain::{Task, TaskKind, TaskReport};
