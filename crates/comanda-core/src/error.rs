// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Comanda.

use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type shared by every Comanda crate.
#[derive(Debug, Error)]
pub enum ComandaError {
    /// Configuration errors (invalid TOML, missing fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The language backend could not produce a reply (HTTP failure,
    /// non-success status after retries, undecodable envelope).
    #[error("language backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        source: Option<BoxError>,
    },

    /// An external call exceeded its time budget.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The backend's payload did not decode under the extraction schema.
    ///
    /// Non-fatal: the interpreter catches it and degrades to schema defaults.
    #[error("malformed extraction: {message}")]
    MalformedExtraction { message: String },

    /// Conversation history could not be read or written.
    #[error("conversation history unavailable: {source}")]
    HistoryUnavailable { source: BoxError },

    /// The catalog could not be queried. Distinct from an empty match.
    #[error("catalog unavailable: {source}")]
    CatalogUnavailable { source: BoxError },

    /// Storage failures outside the turn pipeline (catalog management, setup).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// A catalog-management operation referenced a missing record.
    #[error("{entity} `{id}` not found")]
    NotFound { entity: String, id: String },

    /// Caller-supplied data was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`ComandaError`] for callers that render
/// failures (HTTP status mapping, CLI exit messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    BackendUnavailable,
    MalformedExtraction,
    HistoryUnavailable,
    CatalogUnavailable,
    Storage,
    NotFound,
    InvalidInput,
    Internal,
}

impl ComandaError {
    /// Returns the kind of this error.
    ///
    /// Timeouts are reported as `BackendUnavailable`: the only call that
    /// surfaces a raw timeout to callers is the backend call.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::BackendUnavailable { .. } | Self::Timeout { .. } => {
                ErrorKind::BackendUnavailable
            }
            Self::MalformedExtraction { .. } => ErrorKind::MalformedExtraction,
            Self::HistoryUnavailable { .. } => ErrorKind::HistoryUnavailable,
            Self::CatalogUnavailable { .. } => ErrorKind::CatalogUnavailable,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a single retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::BackendUnavailable { .. }
        )
    }

    /// Re-tag a storage failure as a history failure.
    ///
    /// Stores report [`ComandaError::Storage`]; the pipeline needs to tell
    /// history from catalog failures apart.
    pub fn into_history(self) -> Self {
        match self {
            Self::Storage { source } => Self::HistoryUnavailable { source },
            Self::Timeout { duration } => Self::HistoryUnavailable {
                source: format!("history store timed out after {duration:?}").into(),
            },
            other => other,
        }
    }

    /// Re-tag a storage failure as a catalog failure.
    pub fn into_catalog(self) -> Self {
        match self {
            Self::Storage { source } => Self::CatalogUnavailable { source },
            Self::Timeout { duration } => Self::CatalogUnavailable {
                source: format!("catalog lookup timed out after {duration:?}").into(),
            },
            other => other,
        }
    }
}
