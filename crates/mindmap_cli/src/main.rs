use clap::Parser;
use mindmap_core::{FieldCipher, MindmapConfig, UnlockNotifier};
use mindmap_gateway::{serve, AppState};
use mindmap_insight::{build_client, CompletionParams};
use mindmap_store::SqliteStore;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "mindmap.toml")]
    config: String,

    /// Path to the journal database (overrides config)
    #[arg(long)]
    db: Option<String>,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut config = MindmapConfig::load_or_default(&args.config);
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let cipher = match &config.crypto.field_key {
        Some(key) => FieldCipher::from_base64(key)?,
        None => {
            warn!("no field key configured; sealed journal fields will not survive a restart");
            FieldCipher::generate().0
        }
    };

    info!("Opening store at {}...", config.database.path);
    let store = SqliteStore::new(&config.database.path, cipher).await?;
    store.seed_defaults().await?;

    info!(
        "Using {} provider with model {}",
        config.llm.provider, config.llm.model
    );
    let llm = build_client(&config.llm)?;
    let params = CompletionParams::from_config(&config.llm);

    let notifier = UnlockNotifier::default();
    let mut unlock_rx = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match unlock_rx.recv().await {
                Ok(event) => {
                    info!(user = %event.user_uid, badge = %event.name, "badge unlocked")
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("unlock event logger lagged, {missed} events missed")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let state = AppState::new(store, llm, params, notifier);
    serve(state, &config.server.host, config.server.port).await
}
