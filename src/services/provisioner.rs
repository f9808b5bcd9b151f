use crate::models::{CancelFlag, KeyMaterial, KeySyncError, KeySyncResult, SessionConfig};
use crate::services::authorized_keys::write_authorized_keys;
use crate::services::key_discovery::{
    apply_local, load_local_key, load_remote_keys, local_public_key_path,
};
use crate::services::local_keygen::LocalKeyStore;
use crate::services::remote::{RemoteConnector, RemoteSession};
use crate::services::remote_keygen::regenerate_remote_keys;
use serde::{Deserialize, Serialize};

/// Which side a key pair is generated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLocation {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    Generated,
    /// The user declined to overwrite or cancelled the passphrase prompt
    Declined,
}

/// User decisions needed before generating keys (dialog, CLI prompt, ...).
pub trait ConfirmationGate {
    /// Called only when a local key already exists, for either location.
    fn confirm_overwrite(&self, location: KeyLocation, material: &KeyMaterial) -> bool;

    /// `None` aborts; `Some("")` means no passphrase.
    fn passphrase(&self, location: KeyLocation) -> Option<String>;
}

/// Discovers, generates and installs key material for one remote host.
pub struct KeyProvisioner<C: RemoteConnector> {
    connector: C,
    local: LocalKeyStore,
}

impl<C: RemoteConnector> KeyProvisioner<C> {
    pub fn new(connector: C, local: LocalKeyStore) -> Self {
        Self { connector, local }
    }

    pub fn local_store(&self) -> &LocalKeyStore {
        &self.local
    }

    /// Read local and remote key material.
    ///
    /// A missing or unreadable local key is not an error. A missing remote
    /// `id_rsa.pub` is; a missing `authorized_keys` is not. The cancel flag
    /// is not consulted.
    pub async fn discover(
        &self,
        config: &SessionConfig,
        _cancel: &CancelFlag,
    ) -> KeySyncResult<KeyMaterial> {
        let mut material = KeyMaterial::default();

        let local_path = local_public_key_path(Some(config), self.local.ssh_dir());
        apply_local(&mut material, load_local_key(&local_path).await);

        let mut session = self.connect(config).await?;
        let result = load_remote_keys(session.as_mut(), &mut material).await;
        session.close().await;
        result?;

        log::info!(
            "[provisioner] Discovery for {}: local key {}, authorized_keys {}",
            config.host,
            if material.has_local_key() { "present" } else { "absent" },
            if material.remote_authorized_keys.is_some() { "present" } else { "absent" }
        );
        Ok(material)
    }

    /// Overwrite the local `id_rsa` pair. Returns material with only the local fields set.
    pub async fn generate_local(&self, passphrase: &str) -> KeySyncResult<KeyMaterial> {
        self.local.generate(passphrase).await
    }

    /// Overwrite the remote `id_rsa` pair. Returns material with only the remote fields set.
    pub async fn generate_remote(
        &self,
        config: &SessionConfig,
        cancel: &CancelFlag,
        passphrase: &str,
    ) -> KeySyncResult<KeyMaterial> {
        check_cancel(cancel)?;

        let mut session = self.connect(config).await?;
        let result = regenerate_remote_keys(session.as_mut(), cancel, passphrase).await;
        session.close().await;

        match &result {
            Err(e) if e.is_cancelled() => {
                log::info!("[provisioner] Remote key generation on {} cancelled", config.host)
            }
            Err(e) => log::error!(
                "[provisioner] Remote key generation on {} failed: {}",
                config.host,
                e
            ),
            Ok(_) => log::info!("[provisioner] Generated remote key pair on {}", config.host),
        }
        result
    }

    /// Replace the remote authorized_keys file with `content`.
    pub async fn install(&self, content: &str, config: &SessionConfig) -> KeySyncResult<()> {
        let mut session = self.connect(config).await?;
        let result = write_authorized_keys(session.as_mut(), content).await;
        session.close().await;
        result
    }

    /// Generate keys at `location` after asking `gate`, updating `material`
    /// in place. Nothing is touched when the user declines.
    ///
    /// The overwrite question is asked whenever a local key exists, for either
    /// location.
    pub async fn generate_keys(
        &self,
        material: &mut KeyMaterial,
        config: &SessionConfig,
        cancel: &CancelFlag,
        location: KeyLocation,
        gate: &dyn ConfirmationGate,
    ) -> KeySyncResult<GenerateOutcome> {
        if material.has_local_key() && !gate.confirm_overwrite(location, material) {
            log::info!("[provisioner] Key generation ({:?}) declined", location);
            return Ok(GenerateOutcome::Declined);
        }

        let Some(passphrase) = gate.passphrase(location) else {
            log::info!("[provisioner] Passphrase prompt cancelled");
            return Ok(GenerateOutcome::Declined);
        };

        match location {
            KeyLocation::Local => {
                let generated = self.generate_local(&passphrase).await?;
                material.local_public_key = generated.local_public_key;
                material.local_read_error = generated.local_read_error;
            }
            KeyLocation::Remote => {
                let generated = self.generate_remote(config, cancel, &passphrase).await?;
                material.remote_public_key = generated.remote_public_key;
                material.remote_authorized_keys = generated.remote_authorized_keys;
            }
        }

        Ok(GenerateOutcome::Generated)
    }

    async fn connect(&self, config: &SessionConfig) -> KeySyncResult<Box<dyn RemoteSession>> {
        log::info!(
            "[provisioner] Connecting to {}@{}:{}",
            config.user,
            config.host,
            config.port
        );
        self.connector.connect(config).await
    }
}

fn check_cancel(cancel: &CancelFlag) -> KeySyncResult<()> {
    if cancel.is_cancelled() {
        return Err(KeySyncError::Cancelled);
    }
    Ok(())
}
