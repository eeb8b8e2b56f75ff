use std::sync::Arc;

use churnlens::api::router::create_router;
use churnlens::classifier::{ModelHandle, TypeRegistry};
use churnlens::config::AppConfig;
use churnlens::delivery::ReportMailer;
use churnlens::narrative::NarrativeClient;
use churnlens::scoring::ScoringPipeline;
use churnlens::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = churnlens::metrics::init_metrics()?;

    // --- Model: legacy type names are registered once, here ---
    let registry = Arc::new(TypeRegistry::with_legacy_aliases());
    let model_path = config.resolved_model_path();
    let model = Arc::new(ModelHandle::from_artifact(model_path.clone(), registry));
    let pipeline = Arc::new(ScoringPipeline::new(Arc::clone(&model)));

    if config.preload_model {
        // A failed warm-up is not fatal; requests retry the load and report
        // the cause until the artifact is fixed.
        if let Err(e) = model.get().await {
            tracing::error!(
                path = %model_path.display(),
                error = %e,
                "Model warm-up failed — predictions will be unavailable until it loads"
            );
        }
    } else {
        tracing::info!("Model preload disabled (PRELOAD_MODEL=false)");
    }

    // --- Narrative backend ---
    let narrator = match &config.genai_api_key {
        Some(key) => {
            let client = NarrativeClient::new(
                reqwest::Client::new(),
                key.clone(),
                config.genai_model.clone(),
            )
            .with_base_url(config.genai_base_url.clone());
            tracing::info!(model = %client.model(), "Narrative backend configured");
            Some(client)
        }
        None => {
            tracing::warn!("GENAI_API_KEY not set, chat and report endpoints will return fallback text");
            None
        }
    };

    // --- Report delivery ---
    let mailer = ReportMailer::from_config(&config)?.map(Arc::new);
    match &mailer {
        Some(m) => tracing::info!(transport = m.describe(), "Report delivery configured"),
        None => tracing::warn!("Neither SMTP_HOST nor EMAIL_OUTBOX_DIR set, /send_report will not deliver"),
    }

    let state = AppState {
        config,
        pipeline,
        metrics_handle,
        narrator,
        mailer,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
