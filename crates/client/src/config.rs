//! Defines the configuration parameters for the KAS clients that need to be supplied externally by
//! the user.

use std::{fmt, fs, io, path::Path};

use format_serde_error::SerdeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The configuration for the wallet service and node clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the custodial wallet service.
    pub wallet_url: String,

    /// URL of the chain node's JSON-RPC endpoint.
    pub node_url: String,

    /// The chain the accounts live on.
    pub chain_id: u64,

    /// Credentials for the wallet service.
    pub credentials: CredentialsConfig,
}

impl ClientConfig {
    /// Parse the config at the given path and produce the [`ClientConfig`].
    pub fn load_from_path(path: impl AsRef<Path>) -> InitResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str::<ClientConfig>(contents.as_str())
            .map_err(|e| SerdeError::new(contents, e))?;

        Ok(config)
    }
}

/// The access key pair issued by the wallet service.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// The access key id.
    pub access_key_id: String,

    /// The secret access key.
    secret_access_key: String,
}

impl CredentialsConfig {
    /// Create a new [`CredentialsConfig`].
    pub fn new(access_key_id: String, secret_access_key: String) -> Self {
        Self {
            access_key_id,
            secret_access_key,
        }
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Error during initialization.
#[derive(Debug, Error)]
pub enum InitError {
    /// I/O related error while reading config.
    #[error("error loading config file: {0}")]
    Io(#[from] io::Error),

    /// Error while parsing the provided config.
    #[error("invalid config data: {0}")]
    MalformedConfig(#[from] SerdeError),
}

/// Result of parsing the config file which may produce an [`InitError`].
pub type InitResult<T> = Result<T, InitError>;

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
        writeln!(
            file,
            r#"
wallet_url = "https://wallet-api.klaytnapi.com"
node_url = "https://node-api.klaytnapi.com/v1/klaytn"
chain_id = 1001

[credentials]
access_key_id = "KASK1234"
secret_access_key = "hunter2"
"#
        )
        .expect("should write config");

        let config = ClientConfig::load_from_path(file.path()).expect("config should parse");
        assert_eq!(config.chain_id, 1001);
        assert_eq!(config.credentials.access_key_id, "KASK1234");
        assert_eq!(config.credentials.secret_access_key(), "hunter2");

        let debug = format!("{:?}", config);
        assert!(
            !debug.contains("hunter2"),
            "debug output must not leak the secret: {debug}"
        );
    }

    #[test]
    fn test_malformed_config() {
        let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
        writeln!(file, "wallet_url = 42").expect("should write config");

        let err = ClientConfig::load_from_path(file.path()).unwrap_err();
        assert!(
            matches!(err, InitError::MalformedConfig(_)),
            "expected malformed config error, got {err}"
        );

        let err = ClientConfig::load_from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, InitError::Io(_)));
    }
}
