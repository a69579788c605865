use db_pool::PoolSettings;
use sqlx::migrate::Migrator;
use sqlx::PgPool;

const SERVICE_NAME: &str = "direct-messaging-service";

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Pool on the URL resolved by `Config`, migrated before it is handed out.
/// Only pool tuning comes from the `DB_*` environment.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let settings = PoolSettings::from_env();
    let pool = db_pool::connect(SERVICE_NAME, database_url, &settings).await?;
    MIGRATOR.run(&pool).await?;
    tracing::info!(service = SERVICE_NAME, "migrations applied");
    Ok(pool)
}
