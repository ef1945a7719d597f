//! Pipeline error and skip types

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors. Any of these stops the batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration or input data, detected before processing
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] slumpdod_core::Error),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing or malformed statistics table while merging
    #[error("Merge error: {0}")]
    Merge(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Why a single feature was left out of the results.
///
/// Skips are recorded and logged; the batch continues with the next feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The buffered extent does not overlap the DEM
    NoCoverage,
    /// The clipped DEM holds no valid cell
    EmptyPointCloud,
    /// Too few donor points remain after masking the footprint
    InsufficientDonors { found: usize, required: usize },
    /// Donor points are collinear or coincident
    DegenerateTriangulation,
    /// No valid DoD cell lies inside the footprint
    EmptyZone,
}

impl SkipReason {
    /// Map a per-feature geometric engine error to a skip.
    ///
    /// Returns `None` for errors that must stop the batch.
    pub fn from_engine(err: &slumpdod_core::Error) -> Option<Self> {
        use slumpdod_core::Error;
        match err {
            Error::EmptyExtent(_) => Some(SkipReason::NoCoverage),
            Error::InsufficientPoints { found, required } => Some(SkipReason::InsufficientDonors {
                found: *found,
                required: *required,
            }),
            Error::DegenerateTriangulation(_) => Some(SkipReason::DegenerateTriangulation),
            _ => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoCoverage => write!(f, "buffered extent does not overlap the DEM"),
            SkipReason::EmptyPointCloud => write!(f, "clipped DEM has no valid cells"),
            SkipReason::InsufficientDonors { found, required } => {
                write!(f, "{} donor points, at least {} required", found, required)
            }
            SkipReason::DegenerateTriangulation => write!(f, "donor points are collinear"),
            SkipReason::EmptyZone => write!(f, "no valid DoD cells inside the footprint"),
        }
    }
}
