use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use tubechat_api::config::AppConfig;
use tubechat_api::credentials::TokenIssuer;
use tubechat_api::routes::router;
use tubechat_api::users::UserService;
use tubechat_api::youtube::YouTubeSource;
use tubechat_api::{AppState, AppStateInner};
use tubechat_db::Database;
use tubechat_llm::LlmDispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubechat=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;

    if let Some(admin) = &config.admin {
        UserService::new(&db)
            .seed_admin(&admin.email, &admin.password, &admin.name)
            .context("seeding admin user")?;
    }

    let llm = LlmDispatcher::new(&config.llm)?;
    let transcripts = YouTubeSource::new(config.transcript_timeout)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl),
        llm: Arc::new(llm),
        transcripts: Arc::new(transcripts),
        transcript_languages: config.transcript_languages.clone(),
    });

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("TubeChat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
