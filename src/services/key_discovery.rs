use crate::models::{
    KeyMaterial, KeySyncError, KeySyncResult, LocalKeyFile, RemoteKeyFile, SessionConfig,
};
use crate::services::remote::{policy, read_text, RemoteSession};
use crate::utils::join_remote;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const PUBLIC_KEY_NAME: &str = "id_rsa.pub";
pub const AUTHORIZED_KEYS_NAME: &str = "authorized_keys";

/// Where to look for the local public key: the configured private key's
/// `.pub` sibling if that file exists, otherwise `<ssh_dir>/id_rsa.pub`.
pub fn local_public_key_path(config: Option<&SessionConfig>, ssh_dir: &Path) -> PathBuf {
    if let Some(sibling) = config.and_then(SessionConfig::public_key_sibling) {
        if sibling.exists() {
            return sibling;
        }
        log::debug!(
            "[key_discovery] {} does not exist, using default key",
            sibling.display()
        );
    }
    ssh_dir.join(PUBLIC_KEY_NAME)
}

/// Outcome of reading the local public key. Never an error: a missing local
/// key is the normal "no key yet" state.
#[derive(Debug, Default, PartialEq)]
pub struct LocalDiscovery {
    pub key: Option<LocalKeyFile>,
    /// Set when the file exists but could not be read
    pub error: Option<String>,
}

pub async fn load_local_key(path: &Path) -> LocalDiscovery {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("[key_discovery] No local public key at {}", path.display());
            return LocalDiscovery::default();
        }
        Err(e) => {
            log::warn!(
                "[key_discovery] Cannot read local public key {}: {}",
                path.display(),
                e
            );
            return LocalDiscovery {
                key: None,
                error: Some(format!("{}: {}", path.display(), e)),
            };
        }
    };

    match String::from_utf8(bytes) {
        Ok(content) => LocalDiscovery {
            key: Some(LocalKeyFile {
                path: path.to_path_buf(),
                content,
            }),
            error: None,
        },
        Err(e) => {
            log::warn!(
                "[key_discovery] Local public key {} is not UTF-8",
                path.display()
            );
            LocalDiscovery {
                key: None,
                error: Some(format!("{}: {}", path.display(), e)),
            }
        }
    }
}

/// Apply a local discovery result to `material`, replacing the local fields.
pub fn apply_local(material: &mut KeyMaterial, local: LocalDiscovery) {
    material.local_public_key = local.key;
    material.local_read_error = local.error;
}

/// A remote key file is never recorded without content, whatever the read policy.
fn require_content(path: &str, content: Option<String>) -> KeySyncResult<String> {
    content.ok_or_else(|| KeySyncError::RemoteFileNotFound {
        path: path.to_string(),
    })
}

/// Read the remote public key (required) and authorized_keys (optional)
/// over an already-open session.
pub async fn load_remote_keys(
    session: &mut dyn RemoteSession,
    material: &mut KeyMaterial,
) -> KeySyncResult<()> {
    let home = session.home().await?;
    let ssh_dir = join_remote(&home, ".ssh");

    let public_key_path = join_remote(&ssh_dir, PUBLIC_KEY_NAME);
    let content = require_content(
        &public_key_path,
        read_text(session, &public_key_path, policy::REMOTE_PUBLIC_KEY_READ).await?,
    )?;
    log::info!("[key_discovery] Read remote public key {}", public_key_path);

    let authorized_keys_path = join_remote(&ssh_dir, AUTHORIZED_KEYS_NAME);
    let authorized_keys =
        read_text(session, &authorized_keys_path, policy::AUTHORIZED_KEYS_READ).await?;
    if authorized_keys.is_none() {
        log::info!("[key_discovery] Remote has no {}", authorized_keys_path);
    }

    material.remote_public_key = Some(RemoteKeyFile {
        path: public_key_path,
        content,
    });
    material.remote_authorized_keys = authorized_keys;
    Ok(())
}
