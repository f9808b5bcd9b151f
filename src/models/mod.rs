pub mod cancel;
pub mod error;
pub mod key_material;
pub mod session_config;

pub use cancel::CancelFlag;
pub use error::{KeySyncError, KeySyncResult};
pub use key_material::{KeyMaterial, KeyType, LocalKeyFile, RemoteKeyFile};
pub use session_config::SessionConfig;
