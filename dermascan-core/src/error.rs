use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::store::StoreError;

/// Startup-level failures: building the store, the classifier, or the upload directory.
#[derive(Error, Debug)]
pub enum DermascanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
}
