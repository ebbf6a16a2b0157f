//! Core results and error types

use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A type name referenced by a directive or descriptor is absent from the dictionary.
    #[error("unknown type `{name}`")]
    UnknownType {
        /// The type name that failed to resolve.
        name: String,
    },

    /// A descriptor carries an encoding the rewriter does not handle.
    #[error("unsupported encoding `{encoding}` for type `{type_name}`")]
    UnsupportedEncoding {
        /// The type whose descriptor carries the encoding.
        type_name: String,
        /// The raw encoding string from the descriptor.
        encoding: String,
    },
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
