use std::path::{Path, PathBuf};

/// One `Host` block from an OpenSSH client config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostEntry {
    /// Patterns from the `Host` line (`*` wildcards, `!` negation)
    pub patterns: Vec<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub identity_file: Option<PathBuf>,
}

/// Settings that apply to a single alias after all matching blocks are combined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedHost {
    pub alias: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub identity_file: Option<PathBuf>,
}

impl ResolvedHost {
    /// Actual hostname (falls back to the alias if not set)
    pub fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.alias)
    }

    /// Port number (defaults to 22)
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(22)
    }
}

/// SSH Config parser
pub struct SshConfigParser;

impl SshConfigParser {
    /// Parse config text. `home` is used to expand `~/` in IdentityFile.
    pub fn parse(content: &str, home: Option<&Path>) -> Vec<HostEntry> {
        let mut hosts = Vec::new();
        let mut current: Option<HostEntry> = None;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // key = value or key value
            let (key, value) = if let Some((k, v)) = line.split_once('=') {
                (k.trim().to_lowercase(), v.trim())
            } else if let Some((k, v)) = line.split_once(char::is_whitespace) {
                (k.trim().to_lowercase(), v.trim())
            } else {
                continue;
            };
            let value = value.trim_matches('"');

            if key == "host" {
                if let Some(host) = current.take() {
                    hosts.push(host);
                }
                current = Some(HostEntry {
                    patterns: value.split_whitespace().map(str::to_string).collect(),
                    ..Default::default()
                });
                continue;
            }

            // Options before the first Host line are ignored
            let Some(host) = current.as_mut() else {
                continue;
            };

            match key.as_str() {
                "hostname" => host.hostname = Some(value.to_string()),
                "port" => host.port = value.parse().ok(),
                "user" => host.user = Some(value.to_string()),
                "identityfile" => host.identity_file = Some(expand_home(value, home)),
                _ => {}
            }
        }

        if let Some(host) = current {
            hosts.push(host);
        }

        hosts
    }

    /// Combine every block matching `alias`. Like ssh(1), the first value
    /// seen for an option wins, so specific blocks must precede `Host *`.
    pub fn resolve(hosts: &[HostEntry], alias: &str) -> ResolvedHost {
        let mut resolved = ResolvedHost {
            alias: alias.to_string(),
            ..Default::default()
        };

        for host in hosts.iter().filter(|h| Self::matches(h, alias)) {
            if resolved.hostname.is_none() {
                resolved.hostname = host.hostname.clone();
            }
            if resolved.port.is_none() {
                resolved.port = host.port;
            }
            if resolved.user.is_none() {
                resolved.user = host.user.clone();
            }
            if resolved.identity_file.is_none() {
                resolved.identity_file = host.identity_file.clone();
            }
        }

        resolved
    }

    fn matches(host: &HostEntry, alias: &str) -> bool {
        let mut matched = false;
        for pattern in &host.patterns {
            if let Some(negated) = pattern.strip_prefix('!') {
                if Self::match_pattern(negated, alias) {
                    return false;
                }
            } else if Self::match_pattern(pattern, alias) {
                matched = true;
            }
        }
        matched
    }

    /// Match host pattern (supports * and ? wildcards)
    fn match_pattern(pattern: &str, alias: &str) -> bool {
        fn inner(p: &[char], a: &[char]) -> bool {
            match (p.first(), a.first()) {
                (None, None) => true,
                (Some('*'), _) => inner(&p[1..], a) || (!a.is_empty() && inner(p, &a[1..])),
                (Some('?'), Some(_)) => inner(&p[1..], &a[1..]),
                (Some(pc), Some(ac)) => pc.eq_ignore_ascii_case(ac) && inner(&p[1..], &a[1..]),
                _ => false,
            }
        }

        let p: Vec<char> = pattern.chars().collect();
        let a: Vec<char> = alias.chars().collect();
        inner(&p, &a)
    }
}

fn expand_home(value: &str, home: Option<&Path>) -> PathBuf {
    match (value.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
# personal boxes
Host build build-*
    HostName build.internal
    User deploy
    IdentityFile ~/.ssh/deploy_rsa

Host legacy
    HostName = 10.0.0.7
    Port 2222

Host * !legacy
    User fallback
    Port 22
"#;

    #[test]
    fn test_parse_basic_config() {
        let hosts = SshConfigParser::parse(CONFIG, Some(Path::new("/home/alice")));
        assert_eq!(hosts.len(), 3);

        let build = &hosts[0];
        assert_eq!(build.patterns, vec!["build", "build-*"]);
        assert_eq!(build.hostname.as_deref(), Some("build.internal"));
        assert_eq!(
            build.identity_file.as_deref(),
            Some(Path::new("/home/alice/.ssh/deploy_rsa"))
        );
        assert_eq!(hosts[1].port, Some(2222));
    }

    #[test]
    fn test_first_value_wins() {
        let hosts = SshConfigParser::parse(CONFIG, None);
        let resolved = SshConfigParser::resolve(&hosts, "build-02");
        assert_eq!(resolved.hostname(), "build.internal");
        assert_eq!(resolved.user.as_deref(), Some("deploy"));
        assert_eq!(resolved.port(), 22);
    }

    #[test]
    fn test_negated_pattern_excludes_host() {
        let hosts = SshConfigParser::parse(CONFIG, None);
        let resolved = SshConfigParser::resolve(&hosts, "legacy");
        assert_eq!(resolved.hostname(), "10.0.0.7");
        assert_eq!(resolved.port(), 2222);
        assert_eq!(resolved.user, None);
    }

    #[test]
    fn test_unknown_alias_uses_wildcard_defaults() {
        let hosts = SshConfigParser::parse(CONFIG, None);
        let resolved = SshConfigParser::resolve(&hosts, "example.com");
        assert_eq!(resolved.hostname(), "example.com");
        assert_eq!(resolved.user.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_wildcard_pattern() {
        assert!(SshConfigParser::match_pattern("*", "anything"));
        assert!(SshConfigParser::match_pattern("*.example.com", "test.example.com"));
        assert!(!SshConfigParser::match_pattern("*.example.com", "test.other.com"));
        assert!(SshConfigParser::match_pattern("web-?", "web-1"));
        assert!(!SshConfigParser::match_pattern("web-?", "web-10"));
    }
}
