//! AnnotationPipeline - 1 attempt 分の処理
//!
//! locate → probe → open → selection → extract → fetch → write を 1 つの
//! リトライ単位として実行します。ハンドルは attempt ごとに作り直し、
//! 前の attempt から何も持ち越しません。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::domain::{
    Degradation, ErrorKind, HealthReport, SessionError, Task, TaskKind, WriteReceipt,
};
use crate::ports::{ContentSource, HostApplication, WindowHandle};
use crate::session::{AnnotationWriter, ContextExtractor, ReadinessProber, SessionAdapter};

/// Value of a successful attempt plus the degradations it absorbed.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub degradations: Vec<Degradation>,
}

pub struct AnnotationPipeline {
    prober: ReadinessProber,
    extractor: ContextExtractor,
    writer: AnnotationWriter,
    target: Option<WindowHandle>,
    correction_passes: u32,
    content: Arc<dyn ContentSource>,
}

impl AnnotationPipeline {
    pub fn new(settings: &Settings, content: Arc<dyn ContentSource>) -> Self {
        Self {
            prober: settings.prober(),
            extractor: ContextExtractor::new(settings.annotation.header_rule),
            writer: AnnotationWriter::new(settings.annotation.max_chars),
            target: settings.target_window(),
            correction_passes: settings.session.correction_passes,
            content,
        }
    }

    fn adapter<'h>(&self, host: &'h dyn HostApplication) -> SessionAdapter<'h> {
        SessionAdapter::new(host)
            .with_target(self.target)
            .with_correction_passes(self.correction_passes)
    }

    /// One attempt of an auto or prompted annotation.
    pub async fn annotate(
        &self,
        host: &dyn HostApplication,
        task: &Task,
    ) -> Result<Attempted<WriteReceipt>, SessionError> {
        let prompt = match task.kind() {
            TaskKind::PromptedAnnotate => match task.prompt().map(str::trim) {
                Some(p) if !p.is_empty() => Some(p),
                _ => return Err(SessionError::malformed("prompted annotate needs a prompt")),
            },
            TaskKind::AutoAnnotate => None,
            other => {
                return Err(SessionError::malformed(format!(
                    "{other} is not an annotation task"
                )));
            }
        };

        let mut degradations = Vec::new();
        let adapter = self.adapter(host);

        let located = adapter.locate()?;
        degradations.extend(located.degradation().cloned());

        if !self.prober.probe(located.instance()).await {
            return Err(SessionError::new(
                ErrorKind::HostNotReady,
                format!("host not ready within {:?}", self.prober.timeout()),
            ));
        }

        let handle = adapter.open(located)?;
        let (selection, corrected) = adapter.current_selection(&handle)?;
        degradations.extend(corrected);

        let context = self
            .extractor
            .extract(handle.instance(), &selection.top_left())?;

        let content = self
            .content
            .fetch(&context)
            .await
            .map_err(|e| SessionError::new(ErrorKind::ContentFetch, e.to_string()))?;
        let text = match prompt {
            Some(p) => format!("{content}\n\n--- ANALYST PROMPT ---\nQ: {p}"),
            None => content,
        };

        let (receipt, collapsed) = self.writer.write(&handle, &selection, &text)?;
        degradations.extend(collapsed);

        Ok(Attempted {
            value: receipt,
            degradations,
        })
    }

    /// One attempt of a health check. Never touches the selection.
    ///
    /// A probe timeout is an answer (`ready = false`), not an error; only
    /// connection and host faults are returned as errors.
    pub async fn health(&self, host: &dyn HostApplication) -> Result<HealthReport, SessionError> {
        let located = self.adapter(host).locate()?;
        let instance = located.instance();

        let ready = self.prober.probe(instance).await;
        let version = instance.version().ok();
        if !ready {
            warn!(window = %located.window(), "health check: host not ready");
            return Ok(HealthReport {
                ready: false,
                version,
                document: None,
                sheet: None,
                detail: format!("host not ready within {:?}", self.prober.timeout()),
            });
        }

        let document = instance.active_document()?;
        let sheet = instance.active_sheet()?;
        let editing = instance.is_editing()?;
        let detail = if editing {
            "ready; a cell edit is in progress".to_string()
        } else {
            "ready".to_string()
        };
        debug!(window = %located.window(), ?document, ?sheet, "health check passed");
        Ok(HealthReport {
            ready: true,
            version,
            document,
            sheet,
            detail,
        })
    }
}
