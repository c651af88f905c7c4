//! The external vision capability that turns a camera frame into a person
//! count and crowd position. Everything analytical happens on the other side
//! of this boundary; this crate only ships the prompt, validates the
//! response, and plumbs the result.

mod vision;

pub use vision::{ClassifierFlow, VisionClassifier};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AnalysisOutcome, Frame};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("classifier call timed out")]
    Timeout,
    #[error("classifier response failed validation: {0}")]
    Schema(String),
}

/// Maps one encoded frame to `{personCount, direction, confidence}`.
///
/// Failure is always distinguishable from "zero people detected": a zero
/// count is an `Ok` outcome, never an error.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<AnalysisOutcome, ClassifierError>;
}
