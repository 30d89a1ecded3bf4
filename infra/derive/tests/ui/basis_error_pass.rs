use basis_derive::basis_error;
use std::borrow::Cow;

#[basis_error]
#[derive(Debug)]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<std::borrow::Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let _ = DemoError::from("boom");
}
