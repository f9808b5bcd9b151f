use serde::{Deserialize, Serialize};
use ssh_key::{HashAlg, PublicKey};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
    Rsa,
    Ecdsa,
    Dsa,
    Unknown,
}

impl From<&str> for KeyType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ed25519" | "ssh-ed25519" => KeyType::Ed25519,
            "rsa" | "ssh-rsa" => KeyType::Rsa,
            "ecdsa" | "ecdsa-sha2-nistp256" | "ecdsa-sha2-nistp384" | "ecdsa-sha2-nistp521" => {
                KeyType::Ecdsa
            }
            "dsa" | "ssh-dss" => KeyType::Dsa,
            _ => KeyType::Unknown,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyType::Ed25519 => write!(f, "ed25519"),
            KeyType::Rsa => write!(f, "rsa"),
            KeyType::Ecdsa => write!(f, "ecdsa"),
            KeyType::Dsa => write!(f, "dsa"),
            KeyType::Unknown => write!(f, "unknown"),
        }
    }
}

/// A public key read from the local disk, together with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalKeyFile {
    pub path: PathBuf,
    pub content: String,
}

/// A file read from the remote host. `path` is a remote (unix) path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteKeyFile {
    pub path: String,
    pub content: String,
}

impl LocalKeyFile {
    pub fn fingerprint(&self) -> Option<String> {
        fingerprint_of(&self.content)
    }

    pub fn key_type(&self) -> KeyType {
        key_type_of(&self.content)
    }
}

impl RemoteKeyFile {
    pub fn fingerprint(&self) -> Option<String> {
        fingerprint_of(&self.content)
    }

    pub fn key_type(&self) -> KeyType {
        key_type_of(&self.content)
    }
}

/// Key material known for one provisioning session, local and remote.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyMaterial {
    pub local_public_key: Option<LocalKeyFile>,
    pub remote_public_key: Option<RemoteKeyFile>,
    pub remote_authorized_keys: Option<String>,
    /// Set when the local public key existed but could not be read
    /// (permissions, encoding). The key itself is still reported absent.
    pub local_read_error: Option<String>,
}

impl KeyMaterial {
    pub fn has_local_key(&self) -> bool {
        self.local_public_key.is_some()
    }

    pub fn has_remote_key(&self) -> bool {
        self.remote_public_key.is_some()
    }

    /// Returns the current remote authorized_keys content with `key` appended
    /// on its own line, unless an identical entry is already present.
    ///
    /// `install` never merges by itself; this is for callers that want to.
    pub fn authorized_keys_with(&self, key: &str) -> String {
        let key = key.trim();
        let mut content = self.remote_authorized_keys.clone().unwrap_or_default();

        if key.is_empty() || content.lines().any(|line| line.trim() == key) {
            return content;
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(key);
        content.push('\n');
        content
    }
}

fn fingerprint_of(content: &str) -> Option<String> {
    PublicKey::from_openssh(content.trim())
        .ok()
        .map(|key| key.fingerprint(HashAlg::Sha256).to_string())
}

fn key_type_of(content: &str) -> KeyType {
    content
        .split_whitespace()
        .next()
        .map(KeyType::from)
        .unwrap_or(KeyType::Unknown)
}
