use std::{net::SocketAddr, sync::Arc};

use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use nowa_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    api::handlers::health::init_start_time();

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(api::events::EventSender::new(event_tx));
    let change_feed = Arc::new(api::events::ChangeFeed::new());
    tokio::spawn(api::events::process_events(event_rx, change_feed.clone()));

    let cart_store: Arc<dyn api::services::commerce::CartStore> = Arc::new(
        api::services::commerce::FileCartStore::new(cfg.cart_storage_dir.clone()),
    );
    let services =
        api::handlers::AppServices::new(db_arc.clone(), event_sender.clone(), cart_store, &cfg);

    info!(
        policy = %cfg.materialize_policy,
        enforce_status_transitions = cfg.enforce_status_transitions,
        "Order write path configured"
    );

    let auth = Arc::new(api::auth::AuthService::new(&cfg.jwt_secret));
    let cfg = Arc::new(cfg);
    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        auth,
        event_sender,
        change_feed,
        services,
    };

    let app = api::app(app_state);

    // Bind and serve
    let addr: SocketAddr = cfg.bind_address().parse()?;
    info!("nowa-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
