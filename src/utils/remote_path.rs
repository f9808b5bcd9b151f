use crate::models::{KeySyncError, KeySyncResult};

/// Join remote (unix) path segments with exactly one `/` between them.
pub fn join_remote(base: &str, child: &str) -> String {
    let child = child.trim_start_matches('/');
    if base.is_empty() {
        return format!("/{}", child);
    }
    format!("{}/{}", base.trim_end_matches('/'), child)
}

/// Quote a single argument for a POSIX shell.
pub fn shell_quote(arg: &str) -> KeySyncResult<String> {
    shlex::try_quote(arg)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| KeySyncError::InvalidConfig {
            message: format!("Cannot quote shell argument: {}", e),
        })
}
