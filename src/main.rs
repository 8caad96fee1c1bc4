use emoheal::{app, config::settings::Settings, AppState};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("emoheal=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(
        ollama = %settings.ollama_base_url,
        hosted_fallback = settings.huggingface_token.is_some(),
        idle_ttl_secs = settings.store_limits.idle_ttl.as_secs(),
        "starting companion service"
    );

    let state = AppState::from_settings(&settings);
    state.conversations.spawn_sweeper();
    let router = app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await?;
    Ok(())
}
