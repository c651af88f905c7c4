//! Orchestrates one frame analysis: classify, then record the observation
//! when anyone was seen.

use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::classifier::{Classifier, ClassifierError};
use crate::models::{AnalysisOutcome, Frame};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    /// The classifier call failed or produced an invalid response.
    #[error("failed to analyze frame")]
    Analysis(#[source] ClassifierError),
    /// The observation could not be recorded.
    #[error("failed to record analysis")]
    Persistence(#[source] StoreError),
}

pub struct Ingestor {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn RecordStore>,
}

impl Ingestor {
    pub fn new(classifier: Arc<dyn Classifier>, store: Arc<dyn RecordStore>) -> Self {
        Self { classifier, store }
    }

    /// Single-shot per frame: no internal retry, no partial writes. A zero
    /// person count returns the neutral outcome and is never stored, since an
    /// empty frame is not a direction observation.
    pub async fn analyze_frame(&self, frame: &Frame) -> Result<AnalysisOutcome, IngestError> {
        let outcome = match self.classifier.classify(frame).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("frame analysis failed: {err}");
                return Err(IngestError::Analysis(err));
            }
        };

        if outcome.person_count == 0 {
            return Ok(AnalysisOutcome::nobody());
        }

        self.store
            .append(outcome.direction, outcome.confidence)
            .await
            .map_err(|err| {
                warn!("failed to record analysis: {err}");
                IngestError::Persistence(err)
            })?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::models::{AnalysisRecord, Direction};
    use crate::store::MemoryStore;

    struct StubClassifier {
        result: Result<AnalysisOutcome, ()>,
    }

    impl StubClassifier {
        fn returning(outcome: AnalysisOutcome) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(outcome),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { result: Err(()) })
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(&self, _frame: &Frame) -> Result<AnalysisOutcome, ClassifierError> {
            self.result
                .clone()
                .map_err(|()| ClassifierError::Schema("stubbed failure".into()))
        }
    }

    struct UnwritableStore;

    #[async_trait]
    impl RecordStore for UnwritableStore {
        async fn append(
            &self,
            _direction: Direction,
            _confidence: f64,
        ) -> Result<AnalysisRecord, StoreError> {
            Err(StoreError::Unavailable(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only volume",
            )))
        }

        async fn latest(&self) -> Result<Option<AnalysisRecord>, StoreError> {
            Ok(None)
        }

        async fn all(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn frame() -> Frame {
        Frame::new("image/jpeg", vec![0xff, 0xd8, 0xff])
    }

    #[tokio::test]
    async fn positive_count_appends_one_record_and_echoes_the_outcome() {
        let outcome = AnalysisOutcome {
            person_count: 5,
            direction: Direction::Right,
            confidence: 0.9,
        };
        let store = Arc::new(MemoryStore::new(10));
        let ingestor = Ingestor::new(StubClassifier::returning(outcome.clone()), store.clone());

        let returned = ingestor.analyze_frame(&frame()).await.unwrap();
        assert_eq!(returned, outcome);

        let records = store.all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].direction, Direction::Right);
        assert_eq!(records[0].confidence, 0.9);
    }

    #[tokio::test]
    async fn zero_count_never_touches_the_store() {
        // The classifier reported a direction and confidence alongside the
        // zero count; neither may leak into the store or the response.
        let outcome = AnalysisOutcome {
            person_count: 0,
            direction: Direction::Left,
            confidence: 0.95,
        };
        let store = Arc::new(MemoryStore::new(10));
        let ingestor = Ingestor::new(StubClassifier::returning(outcome), store.clone());

        let returned = ingestor.analyze_frame(&frame()).await.unwrap();
        assert_eq!(returned, AnalysisOutcome::nobody());
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn classifier_failure_surfaces_without_a_write() {
        let store = Arc::new(MemoryStore::new(10));
        let ingestor = Ingestor::new(StubClassifier::failing(), store.clone());

        let err = ingestor.analyze_frame(&frame()).await.unwrap_err();
        assert!(matches!(err, IngestError::Analysis(_)));
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_not_swallowed() {
        let outcome = AnalysisOutcome {
            person_count: 2,
            direction: Direction::Center,
            confidence: 0.6,
        };
        let ingestor = Ingestor::new(
            StubClassifier::returning(outcome),
            Arc::new(UnwritableStore),
        );

        let err = ingestor.analyze_frame(&frame()).await.unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
    }
}
