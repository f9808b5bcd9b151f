use crate::models::{KeySyncError, KeySyncResult};
use crate::utils::{validate_hostname, validate_user, SshConfigParser};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    10
}

/// Connection parameters for one remote host. Read-only for the provisioning code.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Explicit private key used to log in. Its `.pub` sibling, when present,
    /// is taken as the local public key.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
    #[serde(default)]
    pub private_key_passphrase: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub accept_unknown_hosts: bool,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: user.into(),
            password: None,
            private_key_file: None,
            private_key_passphrase: None,
            connect_timeout_secs: default_connect_timeout(),
            accept_unknown_hosts: false,
        }
    }

    /// Build a config for `alias` from OpenSSH client config text.
    ///
    /// The user must come from the config (`User`) or from `default_user`.
    pub fn from_ssh_config(
        alias: &str,
        content: &str,
        home: Option<&Path>,
        default_user: &str,
    ) -> KeySyncResult<Self> {
        let hosts = SshConfigParser::parse(content, home);
        let resolved = SshConfigParser::resolve(&hosts, alias);

        let mut config = Self::new(
            resolved.hostname(),
            resolved.user.as_deref().unwrap_or(default_user),
        );
        config.port = resolved.port();
        config.private_key_file = resolved.identity_file;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KeySyncResult<()> {
        validate_hostname(&self.host)?;
        validate_user(&self.user)?;
        if self.port == 0 {
            return Err(KeySyncError::InvalidConfig {
                message: "Port cannot be 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `<private key>.pub`, if an explicit private key is configured.
    pub fn public_key_sibling(&self) -> Option<PathBuf> {
        let private_key = self.private_key_file.as_ref()?;
        let mut name = private_key.file_name()?.to_os_string();
        name.push(".pub");
        Some(private_key.with_file_name(name))
    }
}
