use std::fmt::Debug;
use std::fmt::Display;

use axum::extract::rejection::PathRejection;
use axum::response::Html;
use axum::{http::StatusCode, response::IntoResponse};

/// Failures reported by the stores.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("no tag named {0:?}")]
    UnknownTag(String),

    /// Rejected input. The message is shown to the visitor as-is.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),

    #[error("connection pool: {0}")]
    Pool(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownTag(_))
    }
}

pub struct AppError {
    pub inner: anyhow::Error,
}

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(PathRejection::FailedToDeserializePathParams(_)) =
            self.inner.downcast_ref::<PathRejection>()
        {
            return StatusCode::NOT_FOUND;
        }
        match self.inner.downcast_ref::<ServiceError>() {
            Some(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status == StatusCode::NOT_FOUND {
            tracing::info!(error = %self.inner, "not found");
            return (
                status,
                Html(String::from(
                    "<h1>Not Found</h1><p><a href=\"/users\">View All Users</a></p>",
                )),
            )
                .into_response();
        }

        tracing::error!(error = ?self.inner, "request failed");
        (status, Html(String::from("<h1>Something went wrong</h1>"))).into_response()
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. That way you don't need to do that manually.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self { inner: err.into() }
    }
}
