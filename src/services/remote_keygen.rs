use crate::models::{CancelFlag, KeyMaterial, KeySyncError, KeySyncResult};
use crate::services::key_discovery::{load_remote_keys, PUBLIC_KEY_NAME};
use crate::services::local_keygen::PRIVATE_KEY_NAME;
use crate::services::remote::{policy, remove_file, RemoteSession};
use crate::utils::{join_remote, shell_quote};

/// `ssh-keygen` invocation that writes a new RSA pair to `private_key_path`.
///
/// ssh-keygen prompts instead of overwriting, so the old pair must be gone first.
pub fn keygen_command(private_key_path: &str, passphrase: &str) -> KeySyncResult<String> {
    Ok(format!(
        "ssh-keygen -q -t rsa -N {} -f {}",
        shell_quote(passphrase)?,
        shell_quote(private_key_path)?
    ))
}

/// Replace the remote key pair over an open session and read it back.
///
/// The caller owns the session and closes it; cancellation is checked by the
/// caller before connecting and by `execute` while the command runs.
pub async fn regenerate_remote_keys(
    session: &mut dyn RemoteSession,
    cancel: &CancelFlag,
    passphrase: &str,
) -> KeySyncResult<KeyMaterial> {
    let home = session.home().await?;
    let ssh_dir = join_remote(&home, ".ssh");
    let private_key_path = join_remote(&ssh_dir, PRIVATE_KEY_NAME);
    let public_key_path = join_remote(&ssh_dir, PUBLIC_KEY_NAME);

    if remove_file(session, &private_key_path, policy::STALE_KEY_REMOVAL).await? {
        log::info!("[remote_keygen] Removed {}", private_key_path);
    }
    if remove_file(session, &public_key_path, policy::STALE_KEY_REMOVAL).await? {
        log::info!("[remote_keygen] Removed {}", public_key_path);
    }

    let command = keygen_command(&private_key_path, passphrase)?;
    log::info!(
        "[remote_keygen] Running ssh-keygen for {} (encrypted: {})",
        private_key_path,
        !passphrase.is_empty()
    );
    let result = session.execute(&command, cancel).await?;

    if !result.success {
        log::warn!(
            "[remote_keygen] ssh-keygen failed with status {:?}",
            result.exit_status
        );
        return Err(KeySyncError::CommandFailed {
            exit_status: result.exit_status,
            output: result.output,
        });
    }

    let mut material = KeyMaterial::default();
    load_remote_keys(session, &mut material).await?;

    let empty = material
        .remote_public_key
        .as_ref()
        .map_or(true, |key| key.content.trim().is_empty());
    if empty {
        return Err(KeySyncError::KeyGeneration {
            message: format!("ssh-keygen produced an empty {}", public_key_path),
        });
    }

    Ok(material)
}
