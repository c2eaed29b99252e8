use crate::core::subject::SubjectKind;
use thiserror::Error;

/// Typed failures surfaced to library callers.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("invalid {kind} id {id}: does not resolve to a subject")]
    InvalidSubject { kind: SubjectKind, id: u64 },
}
