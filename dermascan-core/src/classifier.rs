//! Image classifier capability.
//!
//! The service ships without a trained model: `RandomClassifier` stands in for
//! inference and `FixedClassifier` gives deterministic verdicts. A real model
//! plugs in by implementing `Classifier`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ClassifierConfig;
use crate::models::Verdict;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify raw image bytes as cancer or non-cancer.
    async fn classify(&self, image: &[u8]) -> Result<Verdict, ClassifierError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Unknown classifier backend '{0}'")]
    UnknownBackend(String),
}

/// Coin-flip classifier: `true` (Cancer) with probability one half.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomClassifier;

#[async_trait]
impl Classifier for RandomClassifier {
    async fn classify(&self, _image: &[u8]) -> Result<Verdict, ClassifierError> {
        Ok(Verdict::from_is_cancer(rand::random::<bool>()))
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// Always answers with the same verdict.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier(pub Verdict);

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _image: &[u8]) -> Result<Verdict, ClassifierError> {
        Ok(self.0)
    }

    fn name(&self) -> &str {
        match self.0 {
            Verdict::Cancer => "cancer",
            Verdict::NonCancer => "non-cancer",
        }
    }
}

pub fn create_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, ClassifierError> {
    match config.backend.as_str() {
        "random" => Ok(Arc::new(RandomClassifier)),
        "cancer" => Ok(Arc::new(FixedClassifier(Verdict::Cancer))),
        "non-cancer" => Ok(Arc::new(FixedClassifier(Verdict::NonCancer))),
        other => Err(ClassifierError::UnknownBackend(other.to_string())),
    }
}
