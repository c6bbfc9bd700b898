use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::error::{AppError, ServiceError};

/// Record id taken from the path. An id that is not a number, or does not fit
/// one, cannot name a record and ends up as a 404.
pub struct Id(pub i32);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Id {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state).await?;
        Ok(Id(id))
    }
}

/// Splits a store result into what a form handler cares about: validation
/// messages come back as `Ok(Err(message))` so the form can be shown again,
/// anything else is a real error.
pub trait SplitValidation<T> {
    fn split_validation(self) -> Result<Result<T, String>, AppError>;
}

impl<T> SplitValidation<T> for Result<T, ServiceError> {
    fn split_validation(self) -> Result<Result<T, String>, AppError> {
        match self {
            Ok(v) => Ok(Ok(v)),
            Err(ServiceError::Validation(message)) => Ok(Err(message)),
            Err(e) => Err(e.into()),
        }
    }
}
