//! Token abstraction module for placement hashing.
//!
//! Tokens represent positions in a 64-bit hash space and must be comparable,
//! hashable, and thread-safe.

pub mod sip;
pub mod traits;
pub mod xxh3;

pub use sip::SipToken;
pub use traits::Token;
pub use xxh3::Xxh3Token;
