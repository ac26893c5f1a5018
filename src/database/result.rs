use bytes::Bytes;
use strum_macros::Display;
use thiserror::Error as ThisError;

use crate::compute::{CommandName, ParseError};
use crate::context::ContextError;
use crate::storage::StorageError;

/// Outcome of a single [`Database::exec`](crate::database::Database::exec) call.
#[derive(Debug)]
pub enum ExecResult {
    /// The query succeeded and has nothing to return.
    OkNoData,
    /// The query succeeded and returned a value.
    Ok(Bytes),
    /// The requested key does not exist.
    NotFound,
    /// The query kind is not served by this database.
    Unsupported(ExecError),
    Err(ExecError),
}

impl ExecResult {
    pub fn status(&self) -> ExecStatus {
        match self {
            ExecResult::OkNoData => ExecStatus::OkNoData,
            ExecResult::Ok(_) => ExecStatus::Ok,
            ExecResult::NotFound => ExecStatus::NotFound,
            ExecResult::Unsupported(_) => ExecStatus::Unsupported,
            ExecResult::Err(_) => ExecStatus::Err,
        }
    }

    pub fn data(&self) -> Option<&Bytes> {
        match self {
            ExecResult::Ok(data) => Some(data),
            _ => None,
        }
    }

    pub fn err(&self) -> Option<&ExecError> {
        match self {
            ExecResult::Unsupported(err) | ExecResult::Err(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ExecStatus {
    OkNoData,
    Ok,
    NotFound,
    Unsupported,
    Err,
}

#[derive(Debug, ThisError)]
pub enum ExecError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("parse query: {0}")]
    Parse(#[source] ParseError),
    #[error("set query: {0}")]
    Set(#[source] StorageError),
    #[error("get query: {0}")]
    Get(#[source] StorageError),
    #[error("del query: {0}")]
    Del(#[source] StorageError),
    #[error("unsupported query: {0} is not served in read-only mode")]
    ReadOnly(CommandName),
}
