//! ContentSource port - 注釈本文の取得
//!
//! 実際の検索・要約パイプラインは外部コラボレーター。core は失敗を
//! タスク失敗として扱うだけで、リトライはしない（必要なら実装側で）。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Context;

#[derive(Debug, Clone, Error)]
pub enum ContentError {
    #[error("no content for {0}")]
    NotFound(String),

    #[error("content source failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, context: &Context) -> Result<String, ContentError>;
}
