//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, querying, mutating or decoding a ring.
///
/// None of these are retried inside the library; the caller decides whether
/// to re-fetch the ring and try again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed construction input or wire data.
    #[error("invalid ring: {0}")]
    Invalid(String),

    /// The ring cannot produce enough distinct peers for its replication factor.
    #[error("insufficient peers: need {needed}, have {available}")]
    InsufficientPeers {
        /// Replication factor that had to be satisfied.
        needed: usize,
        /// Distinct peers the ring could offer.
        available: usize,
    },

    /// An add-peers mutation would leave membership unchanged.
    #[error("all peers already exist in the ring")]
    AlreadyExists,

    /// A remove-peers mutation would leave membership unchanged.
    #[error("none of the peers exist in the ring")]
    NotExist,

    /// The wire record names a strategy tag with no implementation.
    #[error("unknown ring type: {0}")]
    UnknownType(u32),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::Invalid(msg.into())
    }
}
