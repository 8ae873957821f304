use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{Deployment, routes};

mod auth;

pub use auth::USER_ID_HEADER;

pub fn router(deployment: Deployment) -> Router {
    let protected_routes = Router::new()
        .merge(routes::users::router())
        .merge(routes::projects::router(&deployment))
        .merge(routes::columns::router(&deployment))
        .merge(routes::tasks::router(&deployment))
        .layer(from_fn_with_state(
            deployment.clone(),
            auth::require_caller,
        ));

    let api_routes = Router::new()
        .merge(routes::users::public_router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
