use axum::{routing::get, Extension, Router};
use tower_http::trace::TraceLayer;

use chat_relay::{error::AppErr, routes, state::RoomMap};

#[tokio::main]
async fn main() -> Result<(), AppErr> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    let rooms = RoomMap::default();

    let app = Router::new()
        .route("/", get(|| async { "Socket server OK" }))
        .merge(routes::router())
        .layer(Extension(rooms))
        .layer(TraceLayer::new_for_http());

    let bind = std::env::var("BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".into());
    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!("relay on http://{bind}:{port}");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
