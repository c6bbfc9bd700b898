pub mod posts;
pub mod tags;
pub mod users;

use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;

use crate::middleware::logging::HttpLoggingExt;
use crate::pages::Pages;
use crate::services::BlogStore;

/// State handed to every handler: the store and the page templates.
pub type RouteState<S> = (S, Pages);

/// Builds the whole site on top of `svc`.
pub fn app<S: BlogStore>(svc: S, pages: Pages) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/users") }))
        .merge(users::router::<S>())
        .merge(posts::router::<S>())
        .merge(tags::router::<S>())
        .with_state((svc, pages))
        .with_http_logging()
        .layer(CompressionLayer::new())
}
