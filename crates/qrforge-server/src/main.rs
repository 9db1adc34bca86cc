use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use qrforge_api::mailer::{Mailer, MailerConfig};
use qrforge_api::middleware::require_auth;
use qrforge_api::{AppState, AppStateInner, auth, qrcodes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrforge=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("QRFORGE_JWT_SECRET").unwrap_or_else(|_| {
        warn!("QRFORGE_JWT_SECRET not set, using a development secret");
        "dev-secret-change-me".into()
    });
    let db_path = std::env::var("QRFORGE_DB_PATH").unwrap_or_else(|_| "qrforge.db".into());
    let uploads_dir: PathBuf = std::env::var("QRFORGE_UPLOADS_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let host = std::env::var("QRFORGE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("QRFORGE_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;

    // Init database and artifact directory
    let db = qrforge_db::Database::open(&PathBuf::from(&db_path))?;
    tokio::fs::create_dir_all(&uploads_dir).await?;
    info!("Artifact directory: {}", uploads_dir.display());

    // SMTP is optional; without it the share endpoint reports a delivery error
    let mailer = match mailer_config_from_env() {
        Some(config) => Some(Mailer::new(config)?),
        None => {
            warn!("SMTP not configured, QR code sharing via email is disabled");
            None
        }
    };

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        uploads_dir: uploads_dir.clone(),
        mailer,
    });

    // Routes
    let public_routes = Router::new()
        .route("/", get(|| async { "QR Code System API" }))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/qrcodes", post(qrcodes::generate).get(qrcodes::list))
        .route("/api/qrcodes/share", post(qrcodes::share))
        .route("/api/qrcodes/{id}", delete(qrcodes::delete))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("qrforge server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn mailer_config_from_env() -> Option<MailerConfig> {
    let host = std::env::var("QRFORGE_SMTP_HOST").ok()?;
    let username = std::env::var("QRFORGE_SMTP_USER").ok()?;
    let password = std::env::var("QRFORGE_SMTP_PASS").ok()?;
    let from = std::env::var("QRFORGE_SMTP_FROM").unwrap_or_else(|_| username.clone());
    Some(MailerConfig {
        host,
        username,
        password,
        from,
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
