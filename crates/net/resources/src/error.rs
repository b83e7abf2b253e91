#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("connection manager high water ({high}) must be greater than low water ({low})")]
    InvalidWatermarks { low: u64, high: u64 },
}
