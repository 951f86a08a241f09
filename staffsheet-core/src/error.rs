//! Error types for the extraction engine.
//!
//! Only failures that make a whole call meaningless are errors. Everything
//! that happens inside a sheet, row or field is reported through
//! [`ParseStats`](crate::stats::ParseStats) instead.

use thiserror::Error;

/// Fatal failure while turning raw bytes into a workbook model.
///
/// There is no partial workbook: when this is returned no sheet was processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkbookLoadError {
    /// The content is not a workbook container any supported format recognizes.
    #[error("Content is not a recognizable workbook: {message}")]
    Unrecognized {
        /// Decoder message.
        message: String,
    },

    /// The container was recognized but a sheet could not be decoded.
    #[error("Workbook is corrupt (sheet '{sheet}'): {message}")]
    Corrupt {
        /// Sheet whose content failed to decode.
        sheet: String,
        /// Decoder message.
        message: String,
    },

    /// The workbook decoded but holds no sheets at all.
    #[error("Workbook contains no sheets")]
    NoSheets,
}

/// Failure while loading or validating a [`ParserConfig`](crate::config::ParserConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Failed to parse configuration '{path}': {message}")]
    Parse {
        /// Path (or `<inline>`) of the configuration source.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Configuration parsed but holds values the engine cannot work with.
    #[error("Configuration error: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}
