use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Closed vocabulary of error items sent to clients, both in HTTP error
/// bodies and in WebSocket command replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorItem {
    InvalidParams,
    InvalidRequest,
    NotFoundError,
    NotRegistered,
    NotInRoom,
}

impl ErrorItem {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorItem::InvalidParams => "INVALID_PARAMS",
            ErrorItem::InvalidRequest => "INVALID_REQUEST",
            ErrorItem::NotFoundError => "NOT_FOUND_ERROR",
            ErrorItem::NotRegistered => "NOT_REGISTERED",
            ErrorItem::NotInRoom => "NOT_IN_ROOM",
        }
    }
}

impl fmt::Display for ErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of every non-2xx HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub item: ErrorItem,
    pub message: String,
}

impl ErrorBody {
    pub fn new(item: ErrorItem, message: impl Into<String>) -> Self {
        Self {
            item,
            message: message.into(),
        }
    }
}
