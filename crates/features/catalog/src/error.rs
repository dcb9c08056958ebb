use nexo_database::DatabaseError;
use std::borrow::Cow;

/// A specialized [`CatalogError`] enum of this crate.
///
/// Store failures are folded into these four kinds by [`From<DatabaseError>`]; the
/// operation that failed is carried in `context`.
#[nexo_derive::nexo_error]
pub enum CatalogError {
    /// The addressed plan, locality or zone type does not exist.
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A locality or zone type with the same name (ignoring case) already exists.
    #[error("Conflict{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The store could not be reached or failed while serving the request.
    #[error("Backend unavailable{}: {message}", format_context(.context))]
    BackendUnavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Malformed caller input.
    #[error("Validation failed{}: {message}", format_context(.context))]
    ValidationFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl CatalogError {
    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ValidationFailed { message: message.into(), context: None }
    }
}

impl From<DatabaseError> for CatalogError {
    fn from(err: DatabaseError) -> Self {
        let message: Cow<'static, str> = err.to_string().into();
        match err {
            DatabaseError::Conflict { .. } => Self::Conflict { message, context: None },
            DatabaseError::Reference { .. } => Self::NotFound { message, context: None },
            DatabaseError::Validation { .. } => Self::ValidationFailed { message, context: None },
            _ => Self::BackendUnavailable { message, context: None },
        }
    }
}

impl<T> CatalogErrorExt<T> for Result<T, DatabaseError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, CatalogError> {
        self.map_err(CatalogError::from).context(context)
    }
}
