#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the insights crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.

use std::path::{Path, PathBuf};

/// Unified error type returned by the API clients, digest builders and CLI.
///
/// Remote failures fall into two kinds: [`Error::Network`] when the request
/// never produced a usable response, and [`Error::ResponseFormat`] when the
/// response arrived but did not have the expected JSON shape. The remaining
/// variants cover configuration loading and output.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Transport failure or non-success HTTP status from a remote service.
    #[error("network error: {message}")]
    Network {
        /// Human readable description including the failing endpoint.
        message: String
    },
    /// Response body was not valid JSON or lacked expected fields/columns.
    #[error("unexpected response format: {message}")]
    ResponseFormat {
        /// Human readable description of the malformed part.
        message: String
    },
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the configuration violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Wraps serialization errors when writing JSON digests.
    #[error("failed to serialize digest: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// Wraps I/O errors that occur while writing digests.
    #[error("failed to write digest: {source}")]
    Output {
        /// Underlying I/O error reported by the operating system.
        source: std::io::Error
    }
}

impl Error {
    /// Constructs a network error from the provided displayable value.
    pub fn network<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Network {
            message: message.into()
        }
    }

    /// Constructs a response format error from the provided displayable value.
    pub fn response_format<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::ResponseFormat {
            message: message.into()
        }
    }

    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// Intended for CLI contexts where the variant name does not add value to
    /// end users. The returned string matches the [`std::fmt::Display`]
    /// implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Output {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
