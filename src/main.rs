use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pages_pipeline::config::Config;
use pages_pipeline::generate::{OpenAiModel, SiteGenerator};
use pages_pipeline::http::{HttpTimeouts, ReqwestHttp};
use pages_pipeline::notify::Notifier;
use pages_pipeline::publish::{GitHubPublisher, GitRemote, OctocrabHost};
use pages_pipeline::server::{AppState, build_router};
use pages_pipeline::worker::{TaskProcessor, TaskQueue, Worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pages_pipeline=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;
    info!(?config, "Configuration loaded");

    tokio::fs::create_dir_all(&config.workspace_root)
        .await
        .with_context(|| format!("creating workspace {}", config.workspace_root.display()))?;

    let client = reqwest::Client::new();
    let http = ReqwestHttp::new(client.clone(), HttpTimeouts::default());

    let model = OpenAiModel::new(client, config.openai_api_key.clone())
        .with_base_url(config.openai_base_url.clone())
        .with_model(config.openai_model.clone());

    let host = OctocrabHost::from_token(config.github_token.clone())
        .context("building GitHub client")?;
    let publisher = GitHubPublisher::new(
        host,
        http.clone(),
        config.github_owner.clone(),
        GitRemote::github(config.github_token.clone()),
    )
    .with_identity(config.commit_identity.clone())
    .with_liveness(config.liveness);

    let processor = TaskProcessor::new(
        config.workspace_root.clone(),
        config.github_owner.clone(),
        SiteGenerator::new(model).with_model_readme(),
        publisher,
        http.clone(),
    )
    .with_notifier(
        Notifier::with_default_policy(http).with_max_attempts(config.notify_max_attempts),
    );

    let (queue, receiver) = TaskQueue::new();
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(Worker::new(receiver, Arc::new(processor)).run(shutdown.clone()));

    let app = build_router(AppState::new(queue, config.secret.clone()));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, shutting down");
        })
        .await
        .context("serving HTTP")?;

    // Stop taking tasks; an in-flight task still runs to completion.
    shutdown.cancel();
    let stats = worker.await.context("joining worker")?;
    info!(processed = stats.processed, failed = stats.failed, "Shutdown complete");

    Ok(())
}
