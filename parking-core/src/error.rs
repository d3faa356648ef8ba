use thiserror::Error;

use crate::grid::{CellState, Position};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("position {pos} is outside the {rows}x{cols} grid")]
    OutOfBounds {
        pos: Position,
        rows: usize,
        cols: usize,
    },
    #[error("cell {pos} cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        pos: Position,
        from: CellState,
        to: CellState,
    },
}

/// Failures talking to the backend gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend request timed out after {0} ms")]
    Timeout(u32),
    #[error("backend rejected {endpoint} with status {status}")]
    Rejected { endpoint: &'static str, status: u16 },
    #[error("malformed response from {endpoint}: {detail}")]
    Malformed {
        endpoint: &'static str,
        detail: String,
    },
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the request never got an answer (as opposed to a refusal).
    pub fn is_network(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_) | GatewayError::Timeout(_))
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("backend rejected {endpoint} with status {status}")]
    BackendRejected { endpoint: &'static str, status: u16 },
    #[error("backend sent an unusable response: {0}")]
    BackendMalformed(GatewayError),
    #[error("No license plate detected.")]
    NoPlateDetected,
    #[error("No available parking spots found.")]
    NoAvailableSpot,
    #[error("a number plate is required to park")]
    MissingPlate,
    #[error("cell {0} already has a request in flight")]
    Busy(Position),
    #[error("a detection is already running")]
    DetectionInProgress,
    #[error("File must be an image (got {0:?})")]
    UnsupportedImage(String),
    #[error("image is {size} bytes, the limit is {limit}")]
    ImageTooLarge { size: usize, limit: usize },
    #[error("history could not be recorded: {0}")]
    HistoryFailed(GatewayError),
}

impl ControllerError {
    /// Local invariant violations. The UI is expected to make these unreachable.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, ControllerError::Grid(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
