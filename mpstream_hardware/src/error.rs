use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("controller not reachable on the bus")]
    Disconnected,
    #[error("top buffer full ({0} points)")]
    TopBufferFull(usize),
    #[error("status frame timeout")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, HwError>;
