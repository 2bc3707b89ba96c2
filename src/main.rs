use crate::startup::AppState;
use axum::{
    Router,
    extract::Extension,
    http::{
        StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{
    Expiry, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};
use tower_sessions_sqlx_store::PostgresStore;

#[macro_use]
extern crate tracing;

mod admin;
mod auth;
mod db;
mod error;
mod lifecycle;
mod maintenance;
mod startup;
mod suggestions;
mod votes;

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = db::connection::init_db(&database_url)
        .await
        .expect("Unable to initialize database");
    info!("Connected to Postgres, schema and seed data applied");

    let app_state = AppState::new(pool.clone());

    let session_store = PostgresStore::new(pool);
    session_store
        .migrate()
        .await
        .expect("Unable to run session store migration");

    let app = Router::new()
        .route("/", get(votes::index))
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", get(auth::logout))
        .route("/vote", post(votes::cast_vote))
        .route("/results", get(votes::results))
        .route("/admin/results", get(votes::admin_results))
        .route("/suggest-nomination", post(suggestions::suggest_nomination))
        .route("/feedback", post(suggestions::feedback))
        .route("/api/nominations", get(admin::list_nominations))
        .route("/manage-categories", get(admin::manage_categories))
        .route("/add-category", post(admin::add_category))
        .route(
            "/update-category-end-time",
            post(admin::update_category_end_time),
        )
        .route("/add-nomination", post(admin::add_nomination))
        .route("/categories/:id/delete", delete(admin::delete_category))
        .route("/categories/:id/restore", post(admin::restore_category))
        .route("/nominations/:id/delete", delete(admin::delete_nomination))
        .route("/nominations/:id/restore", post(admin::restore_nomination))
        .route(
            "/nominations/bulk-delete",
            post(admin::bulk_delete_nominations),
        )
        .route("/suggestions", get(admin::list_suggestions))
        .route("/suggestions/:id/process", post(admin::process_suggestion))
        .route("/suggestions/:id/delete", delete(admin::delete_suggestion))
        .route("/trash", get(admin::trash))
        .route("/admin/stats", get(maintenance::stats))
        .route("/admin/backup", post(maintenance::backup))
        .route(
            "/admin/maintenance/clean-duplicates",
            post(maintenance::clean_duplicates),
        )
        .route(
            "/admin/settings",
            get(admin::list_settings).post(admin::update_setting),
        )
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    axum::http::Method::POST,
                    axum::http::Method::GET,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .layer(
            SessionManagerLayer::new(session_store)
                .with_name("voting_session")
                .with_same_site(SameSite::Lax)
                .with_secure(false) // TODO: enable once the app terminates TLS in production
                .with_expiry(Expiry::OnInactivity(Duration::seconds(3600))),
        )
        .fallback(handler_404);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on {addr}");
    info!("Default admin credentials: admin / admin123");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Unable to spawn tcp listener");

    axum::serve(listener, app).await.unwrap();
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
