//! Validation errors raised before an entry is constructed.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry title cannot be empty")]
    EmptyTitle,

    #[error("invalid color '{0}': expected #rrggbb")]
    InvalidColor(String),
}
