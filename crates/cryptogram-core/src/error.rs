use crate::letter::Letter;
use crate::sync::Ticket;
use thiserror::Error;

/// Errors surfaced by the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Fetched puzzle data cannot be played. Fatal to the session.
    #[error("malformed puzzle: {0}")]
    MalformedPuzzle(String),
    /// The puzzle could not be fetched at all. Fatal to the session.
    #[error("could not fetch puzzle: {0}")]
    FetchFailed(#[source] ServiceError),
    /// The service declined a substitution or could not be reached.
    /// The optimistic edit has already been reverted.
    #[error("substitution for {letter} rejected: {reason}")]
    SubstitutionRejected { letter: Letter, reason: String },
    /// The solution was already requested in this session
    #[error("solution reveal already triggered")]
    RevealAlreadyTriggered,
    /// A completion arrived for a request this engine never issued
    #[error("no outstanding request for ticket {0}")]
    UnknownTicket(Ticket),
}

/// Errors from the puzzle service transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Network/connection error
    #[error("network error: {0}")]
    Network(String),
    /// The service answered with an error payload
    #[error("server error: {0}")]
    Server(String),
    /// The service answered with something unparseable
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The backend is switched off
    #[error("service unavailable")]
    Unavailable,
}

/// Result type for puzzle service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
