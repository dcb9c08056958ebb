use nexo_derive::nexo_error;
use std::borrow::Cow;

#[nexo_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<Vec<u8>, DemoError> {
    std::fs::read("missing.bin").context("Reading fixture")
}

fn main() {
    let _ = read().map_err(|e| e.context().map(str::to_owned));
    let _: DemoError = "fallback".into();
}
