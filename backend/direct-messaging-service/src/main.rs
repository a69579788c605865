use actix_web::{middleware::Logger, web, App, HttpServer};
use direct_messaging_service::{
    clock::{Clock, SystemClock},
    config::{self, StoreBackend},
    db, error,
    logging,
    middleware::JwtVerifier,
    repository::{ChatStore, InMemoryChatStore, PgChatStore},
    routes,
    services::ChatServices,
    state::AppState,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;
    tracing::debug!(config = ?cfg, "configuration loaded");

    let store: Arc<dyn ChatStore> = match cfg.store {
        StoreBackend::Postgres => {
            let database_url = cfg
                .database_url
                .as_deref()
                .ok_or_else(|| error::AppError::Config("DATABASE_URL missing".into()))?;
            let pool = db::init_pool(database_url)
                .await
                .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
            Arc::new(PgChatStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory chat store; data is lost on restart");
            Arc::new(InMemoryChatStore::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState {
        services: ChatServices::new(store, clock, cfg.ledger_settings()),
    };
    let verifier = web::Data::new(JwtVerifier::new(&cfg.jwt_secret));

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting direct-messaging-service");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(verifier.clone())
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind REST: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("REST server: {e}")))
}
