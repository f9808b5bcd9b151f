//! SSH key provisioning between the local machine and one remote host.
//!
//! [`KeyProvisioner`] ties the pieces together: discovery of existing key
//! material, local or remote key pair generation, and replacing the remote
//! `authorized_keys`. Remote access goes through [`RemoteConnector`], with
//! [`RusshConnector`] as the bundled implementation.

pub mod models;
pub mod services;
pub mod utils;

pub use models::{
    CancelFlag, KeyMaterial, KeySyncError, KeySyncResult, KeyType, LocalKeyFile, RemoteKeyFile,
    SessionConfig,
};
pub use services::{
    policy, Absence, CommandOutput, ConfirmationGate, GenerateOutcome, KeyLocation,
    KeyProvisioner, LocalKeyStore, RemoteConnector, RemoteError, RemoteSession, RusshConnector,
    RusshSession,
};
