//! Error types for pool operations

use thiserror::Error;

/// Result type for pool operations
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Pool operation errors
///
/// Configuration mistakes (bad alignment, zero objects per chunk, size
/// overflow) are reported at construction time; `OutOfMemory` is the only
/// error a correctly configured pool can return afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The underlying reservation for a chunk could not be satisfied
    #[error("out of memory: requested {requested} bytes")]
    OutOfMemory {
        /// Bytes requested from the system allocator
        requested: usize,
    },

    /// Alignment is not a power of two
    #[error("invalid alignment: {align} is not a power of two")]
    InvalidAlignment {
        /// The rejected alignment value
        align: usize,
    },

    /// A size parameter was rejected
    #[error("invalid size {size}: {reason}")]
    InvalidSize {
        /// The rejected size value
        size: usize,
        /// Why the size was rejected
        reason: String,
    },

    /// Chunk size calculation overflowed
    #[error("chunk size calculation overflowed")]
    SizeOverflow,

    /// Invalid pool configuration
    #[error("configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },
}

impl PoolError {
    /// Create an out of memory error
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }

    /// Create an invalid alignment error
    pub fn invalid_alignment(align: usize) -> Self {
        Self::InvalidAlignment { align }
    }

    /// Create an invalid size error
    pub fn invalid_size(size: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSize {
            size,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Checks if this is an out of memory error
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let oom = PoolError::out_of_memory(4096);
        assert_eq!(oom.to_string(), "out of memory: requested 4096 bytes");
        assert!(oom.is_out_of_memory());

        let align = PoolError::invalid_alignment(3);
        assert_eq!(align.to_string(), "invalid alignment: 3 is not a power of two");
        assert!(!align.is_out_of_memory());

        let size = PoolError::invalid_size(0, "zero objects per chunk");
        assert_eq!(size.to_string(), "invalid size 0: zero objects per chunk");
    }
}
