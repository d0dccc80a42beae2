use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(public_routes())
        .merge(auth_routes())
        .merge(admin_listing_routes())
}

fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::listing::list_public))
        .routes(routes!(handlers::listing::get_public))
        .routes(routes!(handlers::listing::categories))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn admin_listing_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::listing::list_admin,
            handlers::listing::create
        ))
        .routes(routes!(handlers::listing::stats))
        .routes(routes!(handlers::listing::slug_preview))
        .routes(routes!(
            handlers::listing::get_listing,
            handlers::listing::update,
            handlers::listing::delete
        ))
        .routes(routes!(handlers::listing::set_status))
        .layer(handlers::listing::listing_upload_body_limit())
}
