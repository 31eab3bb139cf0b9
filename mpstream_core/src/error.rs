use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbortReason {
    #[error("maximum runtime exceeded")]
    MaxRuntime,
    #[error("shutdown requested")]
    Shutdown,
}

#[derive(Debug, Error, Clone)]
pub enum MpError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for controller")]
    Timeout,
    #[error("profile has no points")]
    EmptyProfile,
    #[error("maneuver aborted: {0}")]
    Abort(AbortReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing left axis")]
    MissingLeftAxis,
    #[error("missing right axis")]
    MissingRightAxis,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
