use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay_api::{
    auth::HeaderAuthProvider,
    build_router,
    config::{Config, StorageBackend},
    state::AppState,
};
use relay_llm::{AssistantClient, ChatClient, OpenAIClient};
use relay_persist::{InMemoryMessageStore, MessageStore};
use relay_runtime::{LlmTitleGenerator, Relay, TitleGenerator, ToolRegistry, TruncatingTitleGenerator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting relay API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let openai = Arc::new(OpenAIClient::new(config.openai_api_key.clone())?);

    let store = connect_store(&config).await?;

    let titles: Arc<dyn TitleGenerator> = if config.assistant.llm_titles {
        tracing::info!(model = %config.assistant.title_model, "Generating chat titles with a completion");
        Arc::new(LlmTitleGenerator::new(
            openai.clone() as Arc<dyn ChatClient>,
            config.assistant.title_model.clone(),
        ))
    } else {
        Arc::new(TruncatingTitleGenerator)
    };

    let tools = ToolRegistry::with_builtins();
    tracing::info!(tools = ?tools.names(), "Tool registry ready");

    let relay = Relay::builder()
        .client(openai as Arc<dyn AssistantClient>)
        .assistant_id(config.assistant_id.clone())
        .store(store)
        .tools(tools)
        .titles(titles)
        .config(config.relay_config())
        .build()?;

    // Unhandled tools only degrade to error outputs, so startup continues
    if let Err(e) = relay.lint_tools().await {
        tracing::warn!("Could not check assistant tools against the registry: {}", e);
    }

    let auth = Arc::new(HeaderAuthProvider::new(config.auth.user_header.clone()));
    let state = Arc::new(AppState::new(config.clone(), relay, auth));

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn MessageStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; chats are lost on restart");
            Ok(Arc::new(InMemoryMessageStore::new()))
        }
        StorageBackend::Mongodb => connect_mongodb(config).await,
    }
}

#[cfg(feature = "mongodb")]
async fn connect_mongodb(config: &Config) -> anyhow::Result<Arc<dyn MessageStore>> {
    let uri = config
        .mongodb_uri
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("MONGODB_URI environment variable is required"))?;

    tracing::info!("Connecting to MongoDB");
    let store = relay_persist::MongoMessageStore::connect(uri, &config.mongodb.database).await?;
    tracing::info!(database = %config.mongodb.database, "MongoDB connected");

    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongodb(_config: &Config) -> anyhow::Result<Arc<dyn MessageStore>> {
    anyhow::bail!("storage.backend = \"mongodb\" requires building with the `mongodb` feature")
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
