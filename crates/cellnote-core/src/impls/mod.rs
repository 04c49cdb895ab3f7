//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **SimulatedHost**: メモリ上のワークブックを持つホスト（フォールト注入付き）
//! - **TemplateContentSource**: コンテキストからインサイトブロックを組み立てる
//! - **MemorySink**: レポートをメモリに溜める
//!
//! # 本番用実装
//! 実アプリ（COM）向けの `HostApplication` は別クレートに置く想定です。

pub mod memory_sink;
pub mod sim_host;
pub mod template_content;

pub use self::memory_sink::MemorySink;
pub use self::sim_host::{
    CellFixture, HostFixture, HostOp, InstanceFixture, SelectionFixture, SheetFixture,
    SimulatedHost,
};
pub use self::template_content::{FailingContentSource, TemplateContentSource};
