//! Collaborator service-provider interfaces.
//!
//! # Responsibility
//! - Define the async contracts core consumes from external services:
//!   realtime events, signed-URL issuance, metadata lookup, analytics and the
//!   AI tutor.
//! - Provide the shared collaborator error type and deadline helper.
//!
//! # Invariants
//! - Collaborators are injected as `Arc<dyn Trait>`; core never constructs
//!   process-wide clients.
//! - Core never retries collaborator calls; retry policy belongs to the
//!   collaborator.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;

pub mod analytics;
pub mod realtime;
pub mod storage;
pub mod tutor;

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Failure reported by (or on behalf of) an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Transport or service unreachable; usually transient.
    Unavailable(String),
    /// Service answered but refused the request.
    Rejected(String),
    /// Core-side deadline elapsed before the collaborator answered.
    Timeout(Duration),
}

impl CollaboratorError {
    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Rejected(_) => "rejected",
            Self::Timeout(_) => "timeout",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl Display for CollaboratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "collaborator unavailable: {message}"),
            Self::Rejected(message) => write!(f, "collaborator rejected request: {message}"),
            Self::Timeout(limit) => {
                write!(f, "collaborator timed out after {} ms", limit.as_millis())
            }
        }
    }
}

impl Error for CollaboratorError {}

/// Awaits `call`, bounding it by `limit` when one is configured.
///
/// An elapsed deadline surfaces as [`CollaboratorError::Timeout`] and drops
/// the pending call.
pub async fn with_deadline<T, F>(limit: Option<Duration>, call: F) -> CollaboratorResult<T>
where
    F: Future<Output = CollaboratorResult<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout(limit)),
        },
        None => call.await,
    }
}
