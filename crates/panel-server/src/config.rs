//! Конфигурация сервера панели.

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Адрес для прослушивания (например "0.0.0.0:3001")
    pub listen: String,

    /// URL подключения к БД (sqlite или postgres)
    pub db_url: String,

    pub tls_mode: TlsMode,

    /// Домен для SAN самоподписанного сертификата
    pub domain: String,

    /// PEM-сертификат для режима cert
    pub tls_cert: String,

    /// PEM-ключ для режима cert
    pub tls_key: String,

    /// Секрет JWT (генерируется случайно если не задан)
    pub jwt_secret: String,

    /// Email администратора для входа в панель
    pub admin_email: String,

    /// Хэш пароля администратора (SHA-256 hex)
    pub admin_password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    None,
    SelfSigned,
    /// Сертификаты из файлов (acme.sh, certbot)
    Cert,
}

impl std::str::FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TlsMode::None),
            "self-signed" | "selfsigned" => Ok(TlsMode::SelfSigned),
            "cert" => Ok(TlsMode::Cert),
            other => Err(format!(
                "Неизвестный режим TLS: {other}. Допустимые: none, self-signed, cert"
            )),
        }
    }
}

impl std::fmt::Display for TlsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsMode::None => write!(f, "none"),
            TlsMode::SelfSigned => write!(f, "self-signed"),
            TlsMode::Cert => write!(f, "cert"),
        }
    }
}

/// Хэшировать пароль (SHA-256 hex).
pub fn hash_password(password: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Проверить пароль по хэшу за постоянное время.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use subtle::ConstantTimeEq;
    hash_password(password).as_bytes().ct_eq(hash.as_bytes()).into()
}
