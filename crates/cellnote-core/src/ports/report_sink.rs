//! ReportSink port - タスク結果の通知先
//!
//! ワーカーは処理したタスクごとに 1 件の `TaskReport` を渡します。
//! health-check の結果もここからユーザーに届きます。

use crate::domain::TaskReport;

pub trait ReportSink: Send + Sync {
    fn record(&self, report: &TaskReport);
}

/// Drops every report (logging still happens in the worker).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ReportSink for NoopSink {
    fn record(&self, _report: &TaskReport) {}
}
