pub mod path_validator;
pub mod remote_path;
pub mod ssh_config;

pub use path_validator::{validate_hostname, validate_user};
pub use remote_path::{join_remote, shell_quote};
pub use ssh_config::{HostEntry, ResolvedHost, SshConfigParser};
