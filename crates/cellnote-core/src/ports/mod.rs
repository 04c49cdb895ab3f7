//! Ports - 抽象化レイヤー
//!
//! 外部システム（スプレッドシートアプリ、本文取得パイプライン、結果の表示先）への
//! インターフェースを定義し、実装の詳細を隠蔽します。

pub mod content_source;
pub mod host;
pub mod report_sink;

pub use self::content_source::{ContentError, ContentSource};
pub use self::host::{HostApplication, HostFault, HostInstance, HostResult, WindowHandle};
pub use self::report_sink::{NoopSink, ReportSink};
