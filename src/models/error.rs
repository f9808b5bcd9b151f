use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeySyncError {
    // 遠端檔案錯誤
    #[error("Remote file not found: {path}")]
    RemoteFileNotFound { path: String },

    #[error("Operation cancelled")]
    Cancelled,

    // 連線錯誤
    #[error("Remote {operation} failed for {path}: {message}")]
    Transport {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Authentication failed for user: {user}")]
    AuthenticationFailed { user: String },

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Host key rejected: {host}")]
    HostKeyRejected { host: String },

    #[error("Remote command failed (exit status {exit_status:?}): {output}")]
    CommandFailed {
        exit_status: Option<u32>,
        output: String,
    },

    // 本機錯誤
    #[error("Local IO error at {path}: {message}")]
    LocalIo { path: String, message: String },

    #[error("Key generation failed: {message}")]
    KeyGeneration { message: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl From<std::io::Error> for KeySyncError {
    fn from(e: std::io::Error) -> Self {
        KeySyncError::LocalIo {
            path: String::new(),
            message: e.to_string(),
        }
    }
}

impl From<ssh_key::Error> for KeySyncError {
    fn from(e: ssh_key::Error) -> Self {
        KeySyncError::KeyGeneration {
            message: e.to_string(),
        }
    }
}

pub type KeySyncResult<T> = Result<T, KeySyncError>;

// 序列化為 { type, message } 供 UI 層顯示
impl serde::Serialize for KeySyncError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("KeySyncError", 2)?;
        state.serialize_field("type", &self.error_type())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl KeySyncError {
    /// Build a `LocalIo` error that remembers which path was involved.
    pub fn local_io(path: &std::path::Path, e: std::io::Error) -> Self {
        KeySyncError::LocalIo {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }

    /// True for user-initiated aborts, which callers usually do not report as failures.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KeySyncError::Cancelled)
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            KeySyncError::RemoteFileNotFound { .. } => "RemoteFileNotFound",
            KeySyncError::Cancelled => "Cancelled",
            KeySyncError::Transport { .. } => "Transport",
            KeySyncError::AuthenticationFailed { .. } => "AuthenticationFailed",
            KeySyncError::ConnectionTimeout => "ConnectionTimeout",
            KeySyncError::HostKeyRejected { .. } => "HostKeyRejected",
            KeySyncError::CommandFailed { .. } => "CommandFailed",
            KeySyncError::LocalIo { .. } => "LocalIo",
            KeySyncError::KeyGeneration { .. } => "KeyGeneration",
            KeySyncError::HomeDirNotFound => "HomeDirNotFound",
            KeySyncError::InvalidConfig { .. } => "InvalidConfig",
        }
    }
}
