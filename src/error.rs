use std::fmt;

use crate::transport::TransportError;

/// The store operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Fixed user-facing message recorded in the store's `error` status.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch prompts",
            Operation::Create => "Failed to create prompt",
            Operation::Update => "Failed to update prompt",
            Operation::Delete => "Failed to delete prompt",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A failed store operation.
///
/// Displays as the generic message for the operation; the transport
/// failure stays reachable through `source()`.
#[derive(thiserror::Error, Debug)]
#[error("{}", .operation.failure_message())]
pub struct StoreError {
    pub operation: Operation,
    #[source]
    pub source: TransportError,
}

impl StoreError {
    pub fn new(operation: Operation, source: impl Into<TransportError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}
