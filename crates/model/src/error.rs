use std::borrow::Cow;

/// Errors surfaced by the model layer.
///
/// Loading never fails because of missing or malformed files; those degrade to the next
/// fallback. What remains are write failures and misuse at the call site.
#[basis_derive::basis_error]
pub enum ModelError {
    /// Reading or writing through the storage layer failed.
    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: basis_storage::StorageError, context: Option<Cow<'static, str>> },

    /// A value handed to the encoder could not be serialized.
    #[error("Archive encoding error{}: {source}", format_context(.context))]
    Encode { source: postcard::Error, context: Option<Cow<'static, str>> },

    /// The bytes are not a readable archive.
    #[error("Malformed archive{}: {message}", format_context(.context))]
    Archive { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The notification center rejected its settings.
    #[error("Notification error{}: {source}", format_context(.context))]
    Notification { source: basis_events::NotificationError, context: Option<Cow<'static, str>> },

    #[error("Configuration error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    /// The path is absolute, empty, or escapes its root.
    #[error("Invalid path{}: {message}", format_context(.context))]
    InvalidPath { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Per-id persistence was requested for a type that cannot carry an id.
    #[error("Missing unique id{}: {message}", format_context(.context))]
    MissingUniqueId { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ModelError {
    /// Lifts storage path rejections into [`ModelError::InvalidPath`].
    pub(crate) fn from_storage(error: basis_storage::StorageError) -> Self {
        match error {
            basis_storage::StorageError::InvalidPath { message, context } => {
                Self::InvalidPath { message, context }
            },
            other => Self::from(other),
        }
    }
}
