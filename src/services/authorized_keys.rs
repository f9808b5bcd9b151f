use crate::models::KeySyncResult;
use crate::services::key_discovery::AUTHORIZED_KEYS_NAME;
use crate::services::remote::RemoteSession;
use crate::utils::join_remote;

/// Replace the remote `~/.ssh/authorized_keys` with `content`.
///
/// Creates `~/.ssh` when it cannot be listed. Whatever the file held before
/// is discarded; merging is up to the caller.
pub async fn write_authorized_keys(
    session: &mut dyn RemoteSession,
    content: &str,
) -> KeySyncResult<()> {
    let home = session.home().await?;
    let ssh_dir = join_remote(&home, ".ssh");

    let dir_exists = match session.list_entries(&ssh_dir).await {
        Ok(entries) => {
            log::debug!("[authorized_keys] {} has {} entries", ssh_dir, entries.len());
            true
        }
        Err(e) => {
            log::info!("[authorized_keys] Cannot list {} ({}), creating it", ssh_dir, e);
            false
        }
    };

    if !dir_exists {
        session.make_dir(&ssh_dir).await?;
    }

    let path = join_remote(&ssh_dir, AUTHORIZED_KEYS_NAME);
    session.write(&path, content.as_bytes()).await?;
    log::info!(
        "[authorized_keys] Wrote {} ({} bytes)",
        path,
        content.len()
    );
    Ok(())
}
