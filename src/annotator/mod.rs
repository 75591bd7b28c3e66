// src/annotator/mod.rs

pub mod backend;
pub mod client;
pub mod gate;
pub mod labels;
pub mod retry;

pub use backend::{Completion, CompletionBackend, HttpCompletionBackend};
pub use client::AnnotationClient;
pub use gate::{AdmissionGate, GatePermit};
pub use labels::{classify, LabelRule, LABEL_RULES};
pub use retry::{AttemptState, RetryPolicy};
