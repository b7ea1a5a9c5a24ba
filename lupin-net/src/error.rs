//! Error taxonomy for the network pipeline.
//!
//! Only unrecoverable conditions are errors. Per-pair numeric degeneracy is
//! flagged in the similarity matrix (NaN entries plus a logged warning) and
//! a power scan that never reaches the target fit is a low-confidence
//! advisory on the report; neither aborts the pipeline.

/// Fatal pipeline errors. Messages carry the stage name and the offending
/// gene identifiers or parameter values.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Bad input data: zero-variance genes, non-finite values, duplicate or
    /// mismatched gene identifiers, too few samples.
    #[error("data quality [{stage}]: {detail}")]
    DataQuality { stage: String, detail: String },

    /// Out-of-range parameters, rejected before any matrix computation.
    #[error("invalid parameter [{stage}]: {detail}")]
    ParameterInvalid { stage: String, detail: String },
}

impl NetworkError {
    pub fn data_quality(stage: &str, detail: impl Into<String>) -> Self {
        NetworkError::DataQuality {
            stage: stage.into(),
            detail: detail.into(),
        }
    }

    pub fn parameter(stage: &str, detail: impl Into<String>) -> Self {
        NetworkError::ParameterInvalid {
            stage: stage.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;
