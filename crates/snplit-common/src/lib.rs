//! snplit-common — Shared error type and the allowlisting HTTP client used by
//! every snplit service client.

pub mod error;
pub mod sandbox;

pub use error::{Result, SnplitError};
pub use sandbox::SandboxClient;
