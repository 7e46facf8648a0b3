use thiserror::Error;

/// Failures reported by the partitioned storage and the sort engine.
///
/// Only allocation can fail at runtime. The sort, merge and placement passes are purely in-memory
/// and deterministic once the index arrays are sized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("out of memory while allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },
    #[error("range {start}..{start}+{length} is outside of an array of length {len}")]
    InvalidRange {
        start: usize,
        length: usize,
        len: usize,
    },
    #[error("partition table does not match its length: {reason}")]
    ShapeMismatch { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn out_of_memory<T>(elements: usize) -> Self {
        Self::OutOfMemory {
            bytes: elements.saturating_mul(std::mem::size_of::<T>()),
        }
    }
}
