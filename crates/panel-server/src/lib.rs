//! Ядро панели управления relay-узлами.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod store;
pub mod tls;


use api::AppState;
use config::ServerConfig;
use panel_migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use store::SeaOrmStore;
use tokio::sync::watch;
use tracing::info;

/// Запустить сервер панели.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    // 1. Подключение к БД
    info!("Подключение к базе данных: {}", config.db_url);
    let db: DatabaseConnection = Database::connect(&config.db_url).await?;

    // 2. Автоматические миграции
    info!("Выполнение миграций...");
    Migrator::up(&db, None).await?;

    // 3. Состояние приложения
    let state = AppState {
        db: db.clone(),
        store: SeaOrmStore::new(db.clone()),
        jwt_secret: config.jwt_secret.clone(),
        admin_email: config.admin_email.clone(),
        admin_password_hash: config.admin_password_hash.clone(),
        rate_limiter: api::rate_limit::RateLimiter::new(60, 60),
    };

    let app = api::build_router(state);

    // 4. Фоновая проверка heartbeat узлов
    let db_bg = db.clone();
    tokio::spawn(async move {
        services::cleanup_service::run_cleanup_loop(db_bg).await;
    });

    // 5. Graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Получен сигнал завершения, останавливаю панель...");
        let _ = shutdown_tx.send(true);
    });

    info!("Панель запущена");
    tls::serve(&config, app, shutdown_rx).await?;

    info!("Панель остановлена");
    Ok(())
}
