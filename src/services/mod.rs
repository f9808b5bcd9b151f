pub mod authorized_keys;
pub mod key_discovery;
pub mod local_keygen;
pub mod provisioner;
pub mod remote;
pub mod remote_keygen;
pub mod russh_session;

pub use local_keygen::LocalKeyStore;
pub use provisioner::{ConfirmationGate, GenerateOutcome, KeyLocation, KeyProvisioner};
pub use remote::{
    policy, read_text, remove_file, Absence, CommandOutput, RemoteConnector, RemoteError,
    RemoteSession,
};
pub use russh_session::{RusshConnector, RusshSession};
