//! Error types.
//!
//! Internally we use `anyhow` (`Res<T>`) and attach context as errors bubble up. At public
//! boundaries the error is classified with an `ErrorType` so that the CLI and the HTTP server can
//! decide how to surface it. Operations of the application store additionally carry a fixed
//! `ErrorCode` that clients can match on.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of a public error.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The caller sent something we cannot use, e.g. a missing query parameter.
    Request,
    /// The configuration or home directory is missing or invalid.
    Config,
    /// The spreadsheet API (or the local stand-in) failed: transport, permission, auth.
    Sheet,
    /// Local persistence failed: unreadable or corrupt JSON, disk errors.
    Storage,
    /// An optimistic concurrency check failed.
    Conflict,
    /// The server itself failed to start or run.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// Fixed codes reported by the application store.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SaveTransactionFailed,
    GetTransactionsFailed,
    SaveConfigFailed,
    GetConfigFailed,
    ConfigVersionConflict,
}

serde_plain::derive_display_from_serialize!(ErrorCode);

impl ErrorCode {
    /// The message shown to users when the operation fails. Details go to the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::SaveTransactionFailed => "거래 내역 저장에 실패했습니다.",
            ErrorCode::GetTransactionsFailed => "거래 내역 조회에 실패했습니다.",
            ErrorCode::SaveConfigFailed => "관리 설정 저장에 실패했습니다.",
            ErrorCode::GetConfigFailed => "관리 설정 조회에 실패했습니다.",
            ErrorCode::ConfigVersionConflict => {
                "관리 설정이 다른 곳에서 변경되었습니다. 다시 불러온 뒤 저장해 주세요."
            }
        }
    }
}

/// The public error type.
pub struct Error {
    error_type: ErrorType,
    code: Option<ErrorCode>,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            code: None,
            inner: inner.into(),
        }
    }

    pub(crate) fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// The message of the outermost error only, without the chain of causes.
    pub fn summary(&self) -> String {
        self.inner.to_string()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error", self.error_type)?;
        if let Some(code) = self.code {
            write!(f, " ({code})")?;
        }
        write!(f, ": {:?}", self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

/// Converts internal results into public results with a classification.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;

    fn coded_result(self, error_type: ErrorType, code: ErrorCode) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }

    fn coded_result(self, error_type: ErrorType, code: ErrorCode) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e).with_code(code))
    }
}
