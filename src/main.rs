/*****************************************************************************************
 *
 *  Signup Service – signup collection microservice in Rust
 *  --------------------------------------------------------
 *
 *  Unique emails + approximate counter + best-effort welcome email
 *
 *****************************************************************************************/

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task;
use axum::serve;

use tracing_subscriber::FmtSubscriber;
use tracing::level_filters::LevelFilter;

use signup_service::app;
use signup_service::config::{AppConfig, Backend};
use signup_service::errors::ConfigError;
use signup_service::persistence::{autosave_loop, load_snapshot, save_snapshot};
use signup_service::services::mailer::WelcomeMailer;
use signup_service::state::app::AppState;
use signup_service::state::kv::{KvStore, MemoryStore};

#[tokio::main]
async fn main() {
    //
    // ────────────────────────────────────────────────────────
    //  Locate config.json (EXE folder or project root)
    // ────────────────────────────────────────────────────────
    //
    let exe_path = std::env::current_exe().expect("Cannot get executable path");
    let exe_dir = exe_path.parent().expect("Cannot get executable directory");

    let mut config_path: PathBuf = exe_dir.join("config.json");

    if !config_path.exists() {
        let fallback = exe_dir.join("..").join("config.json");
        if fallback.exists() {
            config_path = fallback;
        } else {
            panic!(
                "config.json not found in:\n  {}\n  {}\nCopy config.json to one of these paths.",
                exe_dir.join("config.json").display(),
                fallback.display()
            );
        }
    }

    //
    // ────────────────────────────────────────────────────────
    //  Load configuration
    // ────────────────────────────────────────────────────────
    //
    let cfg = AppConfig::load_from_file(&config_path.to_string_lossy())
        .expect("Failed to load config.json");

    //
    // ────────────────────────────────────────────────────────
    //  Configure logging
    // ────────────────────────────────────────────────────────
    //
    let level = match cfg.log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info"  => LevelFilter::INFO,
        "warn"  => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    tracing::info!("Loaded config.json from {}", config_path.display());
    tracing::info!("Starting signup service…");

    //
    // ────────────────────────────────────────────────────────
    //  Open the key-value store (memory + snapshot, or redis)
    // ────────────────────────────────────────────────────────
    //
    let (store, memory) = open_store(&cfg).await.expect("Failed to open store");

    if let Some(memory) = memory.clone() {
        let path = cfg.store.snapshot_path.clone();
        let interval = cfg.store.snapshot_interval;

        task::spawn(async move {
            autosave_loop(path, memory, interval).await;
        });
    }

    //
    // ────────────────────────────────────────────────────────
    //  Welcome mailer (disabled without an API key)
    // ────────────────────────────────────────────────────────
    //
    let mailer = WelcomeMailer::new(&cfg.email);
    if !mailer.is_enabled() {
        tracing::info!("No email API key configured; welcome emails disabled");
    }

    //
    // ────────────────────────────────────────────────────────
    //  Build Axum app and start listening
    // ────────────────────────────────────────────────────────
    //
    let app = app::build_app(AppState::new(store, mailer), cfg.clone());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    tracing::info!("Listening on http://{}", addr);

    serve(listener, app)
        .with_graceful_shutdown(shutdown(memory, cfg.store.snapshot_path.clone()))
        .await
        .expect("Server error");
}

async fn open_store(
    cfg: &AppConfig,
) -> Result<(Arc<dyn KvStore>, Option<MemoryStore>), ConfigError> {
    match cfg.store.backend {
        Backend::Memory => {
            let store = MemoryStore::new();
            load_snapshot(&cfg.store.snapshot_path, &store).await;
            Ok((Arc::new(store.clone()), Some(store)))
        }
        Backend::Redis => open_redis(cfg).await.map(|store| (store, None)),
    }
}

#[cfg(feature = "redis_store")]
async fn open_redis(cfg: &AppConfig) -> Result<Arc<dyn KvStore>, ConfigError> {
    use signup_service::errors::StoreError;
    use signup_service::state::redis::RedisStore;

    let url = cfg
        .store
        .redis_url
        .as_deref()
        .unwrap_or("redis://127.0.0.1/");

    tracing::info!("Connecting to redis at {}", url);
    let store = RedisStore::new(url)
        .await
        .map_err(StoreError::from)?;

    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis_store"))]
async fn open_redis(_cfg: &AppConfig) -> Result<Arc<dyn KvStore>, ConfigError> {
    Err(ConfigError::UnsupportedBackend("redis".to_string()))
}

//
// ─────────────────────────────────────────────────────────────
//  Graceful shutdown handler
// ─────────────────────────────────────────────────────────────
//
async fn shutdown(memory: Option<MemoryStore>, path: String) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    match memory {
        Some(store) => {
            tracing::warn!("CTRL+C received — saving snapshot…");
            save_snapshot(&path, &store).await;
            tracing::info!("Snapshot saved. Goodbye.");
        }
        None => tracing::warn!("CTRL+C received — shutting down"),
    }
}
