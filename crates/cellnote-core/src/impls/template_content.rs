//! TemplateContentSource - 外部パイプラインなしで使える本文生成
//!
//! 抽出したコンテキストからインサイトブロックを組み立てるだけ。
//! 本物の検索・要約はこの trait の別実装として差し込みます。

use async_trait::async_trait;

use crate::domain::Context;
use crate::ports::{ContentError, ContentSource};

const FALLBACK_TOPIC: &str = "Financial Highlights";

#[derive(Debug, Clone)]
pub struct TemplateContentSource {
    source_label: String,
    summary: String,
}

impl TemplateContentSource {
    pub fn new(source_label: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            source_label: source_label.into(),
            summary: summary.into(),
        }
    }

    pub fn render(&self, context: &Context) -> String {
        let topic = if context.line_item.is_empty() {
            FALLBACK_TOPIC
        } else {
            context.line_item.as_str()
        };
        format!(
            "--- KEY INSIGHTS ---\nTarget: {} | Period: {}\nTopic: {}\nSource: {}\n\n{}",
            context.ticker, context.period, topic, self.source_label, self.summary
        )
    }
}

impl Default for TemplateContentSource {
    fn default() -> Self {
        Self::new("workbook context", "No summary available.")
    }
}

#[async_trait]
impl ContentSource for TemplateContentSource {
    async fn fetch(&self, context: &Context) -> Result<String, ContentError> {
        Ok(self.render(context))
    }
}

/// Always fails. Used to exercise the content-failure path.
#[derive(Debug, Clone, Default)]
pub struct FailingContentSource;

#[async_trait]
impl ContentSource for FailingContentSource {
    async fn fetch(&self, context: &Context) -> Result<String, ContentError> {
        Err(ContentError::NotFound(context.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renders_header_block() {
        let ctx = Context {
            ticker: "AAPL".into(),
            period: "Q1 2024".into(),
            line_item: "Revenue".into(),
        };
        let text = TemplateContentSource::new("10-Q", "Revenue grew 4%.")
            .fetch(&ctx)
            .await
            .unwrap();
        assert_eq!(
            text,
            "--- KEY INSIGHTS ---\nTarget: AAPL | Period: Q1 2024\nTopic: Revenue\nSource: 10-Q\n\nRevenue grew 4%."
        );
    }

    #[test]
    fn empty_line_item_uses_fallback_topic() {
        let text = TemplateContentSource::default().render(&Context::default());
        assert!(text.contains("Topic: Financial Highlights"));
    }
}
