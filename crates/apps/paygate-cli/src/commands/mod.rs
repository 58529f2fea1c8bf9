//! CLI command implementations.

pub mod canonicalize;
pub mod fetch_key;
pub mod fingerprint;
pub mod sign;
pub mod verify;

// Re-export command handlers
pub use canonicalize::canonicalize;
pub use fetch_key::fetch_key;
pub use fingerprint::fingerprint;
pub use sign::sign;
pub use verify::verify;
