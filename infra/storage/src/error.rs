use std::borrow::Cow;

/// Errors raised by the storage layer.
#[basis_derive::basis_error]
pub enum StorageError {
    #[error("File not found{}: {message}", format_context(.context))]
    FileNotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The path is absolute, empty, or escapes the storage root.
    #[error("Invalid path{}: {message}", format_context(.context))]
    InvalidPath { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Decompression failure{}: {source}", format_context(.context))]
    Decompress { source: lz4_flex::block::DecompressError, context: Option<Cow<'static, str>> },
}

impl StorageError {
    /// Returns `true` when the error only means the file is not there.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}
