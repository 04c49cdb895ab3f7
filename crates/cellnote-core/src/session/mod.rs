//! Session layer: everything that touches the live host during one attempt.

mod adapter;
mod extractor;
mod readiness;
mod writer;

pub use adapter::{Located, SessionAdapter, SessionHandle};
pub use extractor::{ContextExtractor, HeaderRule};
pub use readiness::ReadinessProber;
pub use writer::AnnotationWriter;
