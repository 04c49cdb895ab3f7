//! App - アプリケーション層
//!
//! このモジュールは、ports と session 層を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Lifecycle**: トリガー側とワーカー側で共有する状態フラグ
//! - **AnnotationPipeline**: 1 attempt 分の処理
//! - **WorkerLoop**: タスク実行ループ（drain→pop→retry→report）

pub mod builder;
pub mod lifecycle;
pub mod pipeline;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError, HostFactory, RunningApp};
pub use self::lifecycle::{Lifecycle, Phase};
pub use self::pipeline::{AnnotationPipeline, Attempted};
pub use self::worker_loop::{WorkerError, WorkerLoop, WorkerState, WorkerSummary};
