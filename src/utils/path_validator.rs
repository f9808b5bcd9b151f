use crate::models::{KeySyncError, KeySyncResult};

/// 驗證主機名，防止命令注入
pub fn validate_hostname(hostname: &str) -> KeySyncResult<()> {
    if hostname.is_empty() {
        return Err(KeySyncError::InvalidConfig {
            message: "Hostname cannot be empty".to_string(),
        });
    }

    if hostname.len() > 255 {
        return Err(KeySyncError::InvalidConfig {
            message: "Hostname too long".to_string(),
        });
    }

    // 只允許安全字符：字母、數字、點、連字符、下劃線、冒號（IPv6）、方括號（IPv6）
    let is_valid = hostname.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || c == '.'
            || c == '-'
            || c == '_'
            || c == ':'
            || c == '['
            || c == ']'
    });

    if !is_valid {
        return Err(KeySyncError::InvalidConfig {
            message: format!("Hostname contains invalid characters: {}", hostname),
        });
    }

    Ok(())
}

/// 驗證使用者名稱
pub fn validate_user(user: &str) -> KeySyncResult<()> {
    if user.is_empty() {
        return Err(KeySyncError::InvalidConfig {
            message: "User cannot be empty".to_string(),
        });
    }

    if user.len() > 255 || user.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(KeySyncError::InvalidConfig {
            message: format!("Invalid user name: {}", user),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hostname_valid() {
        assert!(validate_hostname("example.com").is_ok());
        assert!(validate_hostname("192.168.1.1").is_ok());
        assert!(validate_hostname("my-server").is_ok());
        assert!(validate_hostname("[::1]").is_ok());
    }

    #[test]
    fn test_validate_hostname_invalid() {
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("host; rm -rf /").is_err());
        assert!(validate_hostname("host`whoami`").is_err());
    }

    #[test]
    fn test_validate_user() {
        assert!(validate_user("alice").is_ok());
        assert!(validate_user("").is_err());
        assert!(validate_user("al ice").is_err());
        assert!(validate_user("bob\n").is_err());
    }
}
