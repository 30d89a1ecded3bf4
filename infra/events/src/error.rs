use std::borrow::Cow;

/// Errors that can occur while configuring a notification center.
#[basis_derive::basis_error]
pub enum NotificationError {
    /// Broadcast capacity must be greater than zero.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
