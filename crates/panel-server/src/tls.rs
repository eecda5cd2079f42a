//! Запуск HTTP(S): без TLS, самоподписанный сертификат или PEM из файлов.

use crate::config::{ServerConfig, TlsMode};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::info;

/// Время на завершение активных запросов при остановке.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Интервал перечитывания PEM-файлов.
const CERT_RELOAD_INTERVAL: Duration = Duration::from_secs(12 * 3600);

/// Запустить сервер в нужном TLS-режиме.
pub async fn serve(
    config: &ServerConfig,
    app: Router,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = config.listen.parse()?;
    match &config.tls_mode {
        TlsMode::None => serve_plain(addr, app, shutdown_rx).await,
        TlsMode::SelfSigned => {
            info!("HTTPS на {addr} (самоподписанный сертификат для {})", config.domain);
            let rustls = self_signed_config(&config.domain).await?;
            serve_tls(addr, app, rustls, shutdown_rx).await
        }
        TlsMode::Cert => {
            info!(
                "HTTPS на {addr} (сертификат: {}, ключ: {})",
                config.tls_cert, config.tls_key
            );
            let rustls = RustlsConfig::from_pem_file(&config.tls_cert, &config.tls_key).await?;
            spawn_cert_reload(rustls.clone(), config.tls_cert.clone(), config.tls_key.clone());
            serve_tls(addr, app, rustls, shutdown_rx).await
        }
    }
}

async fn wait_shutdown(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow_and_update() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
}

async fn serve_plain(
    addr: SocketAddr,
    app: Router,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!("HTTP на {addr} (без TLS)");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_shutdown(shutdown_rx))
    .await?;
    Ok(())
}

async fn self_signed_config(domain: &str) -> anyhow::Result<RustlsConfig> {
    let names = vec![domain.to_string(), "localhost".to_string()];
    let certified = rcgen::generate_simple_self_signed(names)
        .map_err(|e| anyhow::anyhow!("Ошибка генерации сертификата: {e}"))?;

    let cert_pem = certified.cert.pem();
    let key_pem = certified.signing_key.serialize_pem();
    Ok(RustlsConfig::from_pem(cert_pem.into_bytes(), key_pem.into_bytes()).await?)
}

/// Перечитывать сертификаты, обновлённые acme.sh/certbot, без рестарта.
fn spawn_cert_reload(rustls: RustlsConfig, cert: String, key: String) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CERT_RELOAD_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            match rustls.reload_from_pem_file(&cert, &key).await {
                Ok(()) => tracing::info!("TLS сертификаты перезагружены"),
                Err(e) => tracing::error!("Ошибка перезагрузки TLS сертификатов: {e}"),
            }
        }
    });
}

async fn serve_tls(
    addr: SocketAddr,
    app: Router,
    rustls: RustlsConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let handle = Handle::new();
    let handle_shutdown = handle.clone();
    tokio::spawn(async move {
        wait_shutdown(shutdown_rx).await;
        handle_shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;
    Ok(())
}
