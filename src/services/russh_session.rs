//! [`RemoteSession`] over a russh client connection.
//!
//! File primitives run as small shell snippets on exec channels, so any
//! POSIX host with a regular sshd works without an SFTP subsystem.

use crate::models::{CancelFlag, KeySyncError, KeySyncResult, SessionConfig};
use crate::services::remote::{CommandOutput, RemoteConnector, RemoteError, RemoteSession};
use crate::utils::shell_quote;
use async_trait::async_trait;
use russh::keys::key::PublicKey;
use russh::{client, ChannelMsg, Disconnect, Sig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Exit status the file snippets use for "no such file"
const NOT_FOUND_STATUS: u32 = 44;
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Host key verification against the user's known_hosts
struct HostKeyCheck {
    host: String,
    port: u16,
    accept_unknown: bool,
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => Ok(true),
            Ok(false) if self.accept_unknown => {
                log::warn!(
                    "[russh_session] Accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                Ok(true)
            }
            Ok(false) => {
                log::warn!("[russh_session] Host key unknown for {}", self.host);
                Ok(false)
            }
            Err(e) => {
                log::warn!(
                    "[russh_session] Host key check failed for {}: {}",
                    self.host,
                    e
                );
                Ok(false)
            }
        }
    }
}

/// Raw result of one exec channel
struct RawOutput {
    exit_status: Option<u32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl RawOutput {
    /// Map the exit status of a file snippet onto [`RemoteError`].
    fn check(self, operation: &'static str, path: &str) -> Result<RawOutput, RemoteError> {
        match self.exit_status {
            Some(0) => Ok(self),
            Some(NOT_FOUND_STATUS) => Err(RemoteError::NotFound {
                path: path.to_string(),
            }),
            status => {
                let stderr = String::from_utf8_lossy(&self.stderr).trim().to_string();
                Err(RemoteError::Transport {
                    operation,
                    path: path.to_string(),
                    message: if stderr.is_empty() {
                        format!("exit status {:?}", status)
                    } else {
                        stderr
                    },
                })
            }
        }
    }
}

pub struct RusshSession {
    handle: client::Handle<HostKeyCheck>,
    closed: bool,
}

impl RusshSession {
    /// Connect and authenticate with the configured private key, or the password.
    pub async fn connect(config: &SessionConfig) -> KeySyncResult<Self> {
        config.validate()?;

        let addr = format!("{}:{}", config.host, config.port);
        let handler = HostKeyCheck {
            host: config.host.clone(),
            port: config.port,
            accept_unknown: config.accept_unknown_hosts,
        };
        let client_config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(300)),
            ..Default::default()
        });

        let mut handle = timeout(
            config.connect_timeout(),
            client::connect(client_config, addr.as_str(), handler),
        )
        .await
        .map_err(|_| KeySyncError::ConnectionTimeout)?
        .map_err(|e| match e {
            russh::Error::UnknownKey => KeySyncError::HostKeyRejected {
                host: config.host.clone(),
            },
            other => KeySyncError::Transport {
                operation: "connect".to_string(),
                path: addr.clone(),
                message: other.to_string(),
            },
        })?;

        let auth_result = if let Some(key_path) = &config.private_key_file {
            let key_pair =
                russh_keys::load_secret_key(key_path, config.private_key_passphrase.as_deref())
                    .map_err(|e| KeySyncError::InvalidConfig {
                        message: format!(
                            "Cannot load private key {}: {}",
                            key_path.display(),
                            e
                        ),
                    })?;
            handle
                .authenticate_publickey(config.user.as_str(), Arc::new(key_pair))
                .await
        } else if let Some(password) = &config.password {
            handle
                .authenticate_password(config.user.as_str(), password.as_str())
                .await
        } else {
            return Err(KeySyncError::InvalidConfig {
                message: "Neither a private key nor a password is configured".to_string(),
            });
        };

        match auth_result {
            Ok(true) => {
                log::info!("[russh_session] Authenticated as {} on {}", config.user, addr);
                Ok(Self {
                    handle,
                    closed: false,
                })
            }
            Ok(false) => Err(KeySyncError::AuthenticationFailed {
                user: config.user.clone(),
            }),
            Err(e) => Err(KeySyncError::Transport {
                operation: "authenticate".to_string(),
                path: addr,
                message: e.to_string(),
            }),
        }
    }

    async fn run(
        &mut self,
        command: &str,
        stdin: Option<&[u8]>,
        cancel: Option<&CancelFlag>,
    ) -> Result<RawOutput, RemoteError> {
        let transport = |e: russh::Error| RemoteError::Transport {
            operation: "exec",
            path: String::new(),
            message: e.to_string(),
        };

        let mut channel = self.handle.channel_open_session().await.map_err(transport)?;
        channel.exec(true, command).await.map_err(transport)?;

        if let Some(data) = stdin {
            channel.data(data).await.map_err(transport)?;
            channel.eof().await.map_err(transport)?;
        }

        let mut output = RawOutput {
            exit_status: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let mut ticker = tokio::time::interval(CANCEL_POLL_INTERVAL);

        loop {
            tokio::select! {
                msg = channel.wait() => match msg {
                    Some(ChannelMsg::Data { data }) => output.stdout.extend_from_slice(&data),
                    Some(ChannelMsg::ExtendedData { data, .. }) => {
                        output.stderr.extend_from_slice(&data)
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        output.exit_status = Some(exit_status)
                    }
                    Some(ChannelMsg::Close) | None => break,
                    Some(_) => {}
                },
                _ = ticker.tick(), if cancel.is_some() => {
                    if cancel.map_or(false, CancelFlag::is_cancelled) {
                        log::info!(
                            "[russh_session] Cancellation requested, terminating remote command"
                        );
                        let _ = channel.signal(Sig::TERM).await;
                        let _ = channel.close().await;
                        return Err(RemoteError::Cancelled);
                    }
                }
            }
        }

        Ok(output)
    }

    async fn run_file_op(
        &mut self,
        operation: &'static str,
        path: &str,
        script: String,
        stdin: Option<&[u8]>,
    ) -> Result<RawOutput, RemoteError> {
        let output = self.run(&script, stdin, None).await.map_err(|e| match e {
            RemoteError::Transport { message, .. } => RemoteError::Transport {
                operation,
                path: path.to_string(),
                message,
            },
            other => other,
        })?;
        output.check(operation, path)
    }
}

fn quote(operation: &'static str, path: &str) -> Result<String, RemoteError> {
    shell_quote(path).map_err(|e| RemoteError::Transport {
        operation,
        path: path.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl RemoteSession for RusshSession {
    async fn home(&mut self) -> Result<String, RemoteError> {
        let output = self
            .run_file_op("home", "$HOME", "printf '%s' \"$HOME\"".to_string(), None)
            .await?;
        let home = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if home.is_empty() {
            return Err(RemoteError::Transport {
                operation: "home",
                path: "$HOME".to_string(),
                message: "remote $HOME is empty".to_string(),
            });
        }
        Ok(home)
    }

    async fn read(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let p = quote("read", path)?;
        let script = format!("[ -e {p} ] || exit {NOT_FOUND_STATUS}; cat -- {p}");
        Ok(self.run_file_op("read", path, script, None).await?.stdout)
    }

    async fn write(&mut self, path: &str, data: &[u8]) -> Result<(), RemoteError> {
        let p = quote("write", path)?;
        let script = format!("cat > {p}");
        self.run_file_op("write", path, script, Some(data)).await?;
        Ok(())
    }

    async fn remove(&mut self, path: &str) -> Result<(), RemoteError> {
        let p = quote("remove", path)?;
        let script = format!("[ -e {p} ] || [ -L {p} ] || exit {NOT_FOUND_STATUS}; rm -f -- {p}");
        self.run_file_op("remove", path, script, None).await?;
        Ok(())
    }

    async fn list_entries(&mut self, path: &str) -> Result<Vec<String>, RemoteError> {
        let p = quote("list", path)?;
        let script = format!("[ -d {p} ] || exit {NOT_FOUND_STATUS}; ls -A1 -- {p}");
        let output = self.run_file_op("list", path, script, None).await?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let p = quote("mkdir", path)?;
        let script = format!("mkdir -m 700 -- {p}");
        self.run_file_op("mkdir", path, script, None).await?;
        Ok(())
    }

    async fn execute(
        &mut self,
        command: &str,
        cancel: &CancelFlag,
    ) -> Result<CommandOutput, RemoteError> {
        let raw = self.run(command, None, Some(cancel)).await?;
        let mut output = String::from_utf8_lossy(&raw.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&raw.stderr));
        Ok(CommandOutput {
            success: raw.exit_status == Some(0),
            exit_status: raw.exit_status,
            output,
        })
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            log::debug!("[russh_session] Disconnect failed: {}", e);
        }
    }
}

// A session dropped mid-operation (its future was dropped) skips `close`;
// dropping the handle ends russh's session task, which closes the socket.
impl Drop for RusshSession {
    fn drop(&mut self) {
        if !self.closed {
            log::debug!("[russh_session] Session dropped without close, releasing connection");
        }
    }
}

/// Opens a fresh [`RusshSession`] per operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RusshConnector;

#[async_trait]
impl RemoteConnector for RusshConnector {
    async fn connect(&self, config: &SessionConfig) -> KeySyncResult<Box<dyn RemoteSession>> {
        Ok(Box::new(RusshSession::connect(config).await?))
    }
}
