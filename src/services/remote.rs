//! Boundary to the remote host: file primitives, command execution, and the
//! policy that decides which "file not found" answers are acceptable.

use crate::models::{CancelFlag, KeySyncError, KeySyncResult, SessionConfig};
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a remote primitive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("No such file: {path}")]
    NotFound { path: String },

    #[error("{operation} {path}: {message}")]
    Transport {
        operation: &'static str,
        path: String,
        message: String,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<RemoteError> for KeySyncError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotFound { path } => KeySyncError::RemoteFileNotFound { path },
            RemoteError::Transport {
                operation,
                path,
                message,
            } => KeySyncError::Transport {
                operation: operation.to_string(),
                path,
                message,
            },
            RemoteError::Cancelled => KeySyncError::Cancelled,
        }
    }
}

/// Result of a remote command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_status: Option<u32>,
    /// stdout and stderr, interleaved as received
    pub output: String,
}

/// An open, authenticated session to one remote host.
///
/// Paths are absolute remote paths. Implementations must report a missing
/// target as [`RemoteError::NotFound`] so callers can apply [`Absence`].
#[async_trait]
pub trait RemoteSession: Send {
    async fn home(&mut self) -> Result<String, RemoteError>;

    async fn read(&mut self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Create or truncate `path` and write `data` in full.
    async fn write(&mut self, path: &str, data: &[u8]) -> Result<(), RemoteError>;

    async fn remove(&mut self, path: &str) -> Result<(), RemoteError>;

    async fn list_entries(&mut self, path: &str) -> Result<Vec<String>, RemoteError>;

    async fn make_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Run `command`, aborting the remote process once `cancel` is raised.
    async fn execute(
        &mut self,
        command: &str,
        cancel: &CancelFlag,
    ) -> Result<CommandOutput, RemoteError>;

    /// Release the session. Called once on every exit path the operation
    /// reaches; if the caller drops the operation's future instead, the
    /// session is only dropped, so implementations must release on `Drop` too.
    async fn close(&mut self);
}

/// Opens sessions. Every top-level operation opens its own.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, config: &SessionConfig) -> KeySyncResult<Box<dyn RemoteSession>>;
}

/// What a missing target means for a particular call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    Tolerate,
    Fatal,
}

/// Absence handling for every remote call the provisioning code makes.
pub mod policy {
    use super::Absence;

    pub const REMOTE_PUBLIC_KEY_READ: Absence = Absence::Fatal;
    pub const AUTHORIZED_KEYS_READ: Absence = Absence::Tolerate;
    pub const STALE_KEY_REMOVAL: Absence = Absence::Tolerate;
}

/// Read a remote file as UTF-8. `Ok(None)` only for a tolerated absence.
pub async fn read_text(
    session: &mut dyn RemoteSession,
    path: &str,
    absence: Absence,
) -> KeySyncResult<Option<String>> {
    match session.read(path).await {
        Ok(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| KeySyncError::Transport {
                operation: "read".to_string(),
                path: path.to_string(),
                message: format!("not valid UTF-8: {}", e),
            }),
        Err(RemoteError::NotFound { .. }) if absence == Absence::Tolerate => {
            log::debug!("[remote] {} not present, tolerated", path);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a remote file. Returns whether something was removed.
pub async fn remove_file(
    session: &mut dyn RemoteSession,
    path: &str,
    absence: Absence,
) -> KeySyncResult<bool> {
    match session.remove(path).await {
        Ok(()) => Ok(true),
        Err(RemoteError::NotFound { .. }) if absence == Absence::Tolerate => {
            log::debug!("[remote] {} already absent, tolerated", path);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
