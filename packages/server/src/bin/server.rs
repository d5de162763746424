//! Streamhub presence and notification server.
//!
//! Run with:
//! ```not_rust
//! JWT_SECRET=dev-secret cargo run --bin streamhub-server
//! cargo run --bin streamhub-server -- --port 3000 --redis-url redis://127.0.0.1:6379 --jwt-secret dev-secret
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use streamhub_server::{
    infrastructure::{
        auth::JwtTokenVerifier,
        kv::{InMemoryKeyValueStore, KeyValueStore, RedisKeyValueStore},
        message_pusher::WebSocketMessagePusher,
        repository::{
            InMemoryChatMessageRepository, InMemoryNotificationRepository,
            InMemoryStreamRepository, InMemorySubscriptionRepository, KvConnectionRepository,
            KvRoomRepository, SeedData,
        },
    },
    ui::{AppState, Collaborators, Server},
};
use streamhub_shared::logger::{LogFormat, setup_logger};

#[derive(Parser, Debug)]
#[command(name = "streamhub-server")]
#[command(about = "Realtime presence and notification server for livestreams", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Redis URL of the shared store (in-memory store when omitted, single process only)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Shared secret of the HS256 access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Lifetime of presence records in the shared store, in seconds
    #[arg(long, env = "STATE_TTL_SECS", default_value = "86400")]
    state_ttl_secs: u64,

    /// JSON file with streams, subscriptions and users for the in-memory repositories
    #[arg(long = "seed", env = "SEED_FILE")]
    seed_file: Option<PathBuf>,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level, args.log_format);

    // Initialize dependencies in order:
    // 1. Shared store
    // 2. Repositories
    // 3. MessagePusher / TokenVerifier
    // 4. AppState (UseCases)
    // 5. Server

    // 1. Shared store (Redis, or in-memory for a single process)
    let store: Arc<dyn KeyValueStore> = match &args.redis_url {
        Some(url) => match RedisKeyValueStore::connect(url).await {
            Ok(store) => {
                tracing::info!("Using Redis shared store");
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("Failed to connect to Redis: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("REDIS_URL is not set, presence state is kept in this process only");
            Arc::new(InMemoryKeyValueStore::new())
        }
    };
    let ttl = Duration::from_secs(args.state_ttl_secs.max(1));

    // 2. Repositories
    let seed = match &args.seed_file {
        Some(path) => match SeedData::load(path) {
            Ok(seed) => {
                tracing::info!(
                    "Loaded {} streams, {} subscriptions and {} users from {}",
                    seed.streams.len(),
                    seed.subscriptions.len(),
                    seed.users.len(),
                    path.display()
                );
                seed
            }
            Err(e) => {
                tracing::error!("Failed to load seed file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SeedData::default(),
    };
    let authors = seed.authors();

    // 3. MessagePusher / TokenVerifier
    let collaborators = Collaborators {
        connections: Arc::new(KvConnectionRepository::new(store.clone(), ttl)),
        rooms: Arc::new(KvRoomRepository::new(store, ttl)),
        streams: Arc::new(InMemoryStreamRepository::new(seed.streams)),
        subscriptions: Arc::new(InMemorySubscriptionRepository::new(seed.subscriptions)),
        notifications: Arc::new(InMemoryNotificationRepository::new()),
        chat_messages: Arc::new(InMemoryChatMessageRepository::new(authors)),
        message_pusher: Arc::new(WebSocketMessagePusher::new()),
        token_verifier: Arc::new(JwtTokenVerifier::new(args.jwt_secret.as_bytes())),
        state_ttl: ttl,
    };

    // 4. / 5. Create and run the server
    let server = Server::new(AppState::new(collaborators));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
