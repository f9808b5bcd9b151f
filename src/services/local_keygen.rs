use crate::models::{KeyMaterial, KeySyncError, KeySyncResult};
use crate::services::key_discovery::{apply_local, load_local_key, PUBLIC_KEY_NAME};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use ssh_key::private::RsaKeypair;
use ssh_key::{LineEnding, PrivateKey};
use std::path::{Path, PathBuf};
use tokio::fs;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub const PRIVATE_KEY_NAME: &str = "id_rsa";
pub const DEFAULT_RSA_BITS: usize = 4096;
/// Smallest modulus `ssh-key` accepts for RSA
pub const MIN_RSA_BITS: usize = 2048;

/// The local `~/.ssh` directory and the canonical key pair inside it.
#[derive(Debug, Clone)]
pub struct LocalKeyStore {
    ssh_dir: PathBuf,
    rsa_bits: usize,
}

impl LocalKeyStore {
    pub fn new() -> KeySyncResult<Self> {
        let home = dirs::home_dir().ok_or(KeySyncError::HomeDirNotFound)?;
        Ok(Self::with_ssh_dir(home.join(".ssh")))
    }

    pub fn with_ssh_dir(ssh_dir: impl Into<PathBuf>) -> Self {
        Self {
            ssh_dir: ssh_dir.into(),
            rsa_bits: DEFAULT_RSA_BITS,
        }
    }

    pub fn with_rsa_bits(mut self, bits: usize) -> Self {
        self.rsa_bits = bits.max(MIN_RSA_BITS);
        self
    }

    pub fn ssh_dir(&self) -> &Path {
        &self.ssh_dir
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.ssh_dir.join(PRIVATE_KEY_NAME)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.ssh_dir.join(PUBLIC_KEY_NAME)
    }

    /// Generate a new RSA pair at the canonical paths, overwriting any
    /// existing one, and return the local key material read back from disk.
    ///
    /// An empty passphrase leaves the private key unencrypted.
    pub async fn generate(&self, passphrase: &str) -> KeySyncResult<KeyMaterial> {
        self.ensure_ssh_dir().await?;

        let comment = format!("{}@localcomputer", whoami::username());
        let private_key = self.generate_private_key(&comment)?;

        let private_key_pem = if passphrase.is_empty() {
            private_key.to_openssh(LineEnding::LF)?
        } else {
            private_key
                .encrypt(&mut OsRng, passphrase)
                .map_err(|e| KeySyncError::KeyGeneration {
                    message: format!("Failed to encrypt key: {}", e),
                })?
                .to_openssh(LineEnding::LF)?
        };

        // comment 已設定在私鑰上，公鑰序列化時會帶出
        let public_key_openssh = private_key.public_key().to_openssh()?;

        let private_key_path = self.private_key_path();
        let public_key_path = self.public_key_path();

        write_with_mode(&private_key_path, private_key_pem.as_bytes(), 0o600).await?;
        write_with_mode(
            &public_key_path,
            format!("{}\n", public_key_openssh).as_bytes(),
            0o644,
        )
        .await?;

        log::info!(
            "[local_keygen] Generated {}-bit RSA key at {} (encrypted: {})",
            self.rsa_bits,
            private_key_path.display(),
            !passphrase.is_empty()
        );

        let mut material = KeyMaterial::default();
        apply_local(&mut material, load_local_key(&public_key_path).await);
        if material.local_public_key.is_none() {
            return Err(KeySyncError::KeyGeneration {
                message: format!(
                    "Generated public key could not be read back from {}",
                    public_key_path.display()
                ),
            });
        }
        Ok(material)
    }

    fn generate_private_key(&self, comment: &str) -> KeySyncResult<PrivateKey> {
        let rsa_private = RsaPrivateKey::new(&mut OsRng, self.rsa_bits).map_err(|e| {
            KeySyncError::KeyGeneration {
                message: format!("Failed to generate RSA key: {}", e),
            }
        })?;

        let rsa_keypair =
            RsaKeypair::try_from(rsa_private).map_err(|e| KeySyncError::KeyGeneration {
                message: format!("Failed to convert RSA key: {}", e),
            })?;

        let mut private_key = PrivateKey::from(rsa_keypair);
        private_key.set_comment(comment);
        Ok(private_key)
    }

    async fn ensure_ssh_dir(&self) -> KeySyncResult<()> {
        if self.ssh_dir.exists() {
            return Ok(());
        }

        fs::create_dir_all(&self.ssh_dir)
            .await
            .map_err(|e| KeySyncError::local_io(&self.ssh_dir, e))?;
        #[cfg(unix)]
        {
            let perms = std::fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.ssh_dir, perms)
                .await
                .map_err(|e| KeySyncError::local_io(&self.ssh_dir, e))?;
        }
        log::info!("[local_keygen] Created {}", self.ssh_dir.display());
        Ok(())
    }
}

async fn write_with_mode(path: &Path, data: &[u8], mode: u32) -> KeySyncResult<()> {
    fs::write(path, data)
        .await
        .map_err(|e| KeySyncError::local_io(path, e))?;

    #[cfg(unix)]
    {
        let perms = std::fs::Permissions::from_mode(mode);
        fs::set_permissions(path, perms)
            .await
            .map_err(|e| KeySyncError::local_io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
