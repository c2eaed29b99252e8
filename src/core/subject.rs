use crate::core::error::CollectorError;
use std::fmt;

/// Kind of content subject a collection can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Post,
    Term,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Post => write!(f, "post"),
            SubjectKind::Term => write!(f, "term"),
        }
    }
}

/// A resolved content subject, fixed at collector construction.
///
/// Independent call sites referring to the same subject converge on the
/// same collection name without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: u64,
}

impl Subject {
    pub fn new(kind: SubjectKind, id: u64) -> Result<Self, CollectorError> {
        if id == 0 {
            return Err(CollectorError::InvalidSubject { kind, id });
        }
        Ok(Self { kind, id })
    }

    pub fn collection_name(&self) -> String {
        format!("{}-{}", self.kind, self.id)
    }
}
