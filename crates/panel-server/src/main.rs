//! Точка входа сервера панели.

use clap::Parser;
use panel_server::config::{hash_password, ServerConfig, TlsMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "panel-server",
    about = "Панель управления relay-узлами: кластеры, подписки, импорт"
)]
struct Cli {
    /// Адрес для прослушивания (host:port)
    #[arg(long, default_value = "0.0.0.0:3001")]
    listen: String,

    /// URL базы данных
    #[arg(long, default_value = "sqlite:./panel.db?mode=rwc", env = "DATABASE_URL")]
    db_url: String,

    /// Режим TLS: none, self-signed, cert
    #[arg(long, default_value = "none")]
    tls_mode: String,

    /// Домен для SAN самоподписанного сертификата
    #[arg(long, default_value = "localhost")]
    domain: String,

    /// Путь к PEM-сертификату (режим cert)
    #[arg(long, default_value = "/etc/panel/tls/fullchain.pem")]
    tls_cert: String,

    /// Путь к PEM-ключу (режим cert)
    #[arg(long, default_value = "/etc/panel/tls/privkey.pem")]
    tls_key: String,

    /// Секрет JWT (случайный если не задан)
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Email администратора
    #[arg(long, default_value = "admin@panelvpn.com", env = "ADMIN_EMAIL")]
    admin_email: String,

    /// Пароль администратора
    #[arg(long, env = "ADMIN_PASSWORD")]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let tls_mode: TlsMode = cli
        .tls_mode
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    // JWT secret: из аргумента или случайный на время жизни процесса
    let jwt_secret = match cli.jwt_secret {
        Some(secret) => secret,
        None => {
            let mut buf = [0u8; 32];
            getrandom::fill(&mut buf)
                .map_err(|e| anyhow::anyhow!("Ошибка генерации JWT secret: {e}"))?;
            hex::encode(buf)
        }
    };

    let admin_password = cli.admin_password.unwrap_or_else(|| {
        tracing::warn!("Пароль администратора не задан, используется 'admin' (небезопасно!)");
        "admin".to_string()
    });

    let config = ServerConfig {
        listen: cli.listen,
        db_url: cli.db_url,
        tls_mode,
        domain: cli.domain,
        tls_cert: cli.tls_cert,
        tls_key: cli.tls_key,
        jwt_secret,
        admin_email: cli.admin_email,
        admin_password_hash: hash_password(&admin_password),
    };

    panel_server::run(config).await
}
