use std::time::Duration;

/// Predefined configuration presets for common use cases.
///
/// These presets provide sensible defaults for different deployment
/// scenarios, balancing security and usability of the verification flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Production-ready configuration.
    ///
    /// - Code TTL: 30 minutes
    /// - Resend cooldown: 30 seconds
    /// - Session TTL: 24 hours
    Production,

    /// Development-friendly configuration.
    ///
    /// Relaxed settings for easier testing and debugging:
    /// - Code TTL: 1 hour
    /// - Resend cooldown: 1 second
    /// - Sessions never expire
    Development,

    /// High-security configuration.
    ///
    /// - Code TTL: 5 minutes
    /// - Resend cooldown: 60 seconds
    /// - Session TTL: 1 hour
    HighSecurity,

    /// Load configuration from environment variables.
    ///
    /// Reads configuration from:
    /// - `OTP_AUTH_CODE_TTL`: code validity in seconds (default: 1800)
    /// - `OTP_AUTH_RESEND_COOLDOWN`: cooldown in seconds (default: 30)
    /// - `OTP_AUTH_SESSION_TTL`: session validity in seconds, 0 meaning
    ///   sessions never expire (default: 86400)
    /// - `OTP_AUTH_NOTIFY_TIMEOUT`: notification dispatch timeout in
    ///   seconds (default: 10)
    FromEnv,
}

/// Configuration for the verification flows.
///
/// # Example
///
/// ```rust
/// use otp_auth::AuthConfig;
/// use std::time::Duration;
///
/// // Use default configuration
/// let config = AuthConfig::default();
///
/// // Create custom configuration
/// let config = AuthConfig {
///     code_ttl: Duration::from_secs(600),
///     resend_cooldown: Duration::from_secs(60),
///     ..AuthConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Validity window of an issued passcode.
    pub code_ttl: Duration,
    /// Minimum interval between issuances per (identity, purpose).
    pub resend_cooldown: Duration,
    /// Lifetime of issued sessions, or `None` for non-expiring sessions.
    pub session_ttl: Option<Duration>,
    /// Upper bound on a single notification dispatch attempt.
    pub notify_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let session_ttl_secs = std::env::var("OTP_AUTH_SESSION_TTL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(86400);
        Self {
            code_ttl: Duration::from_secs(
                std::env::var("OTP_AUTH_CODE_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            resend_cooldown: Duration::from_secs(
                std::env::var("OTP_AUTH_RESEND_COOLDOWN")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            session_ttl: (session_ttl_secs > 0).then(|| Duration::from_secs(session_ttl_secs)),
            notify_timeout: Duration::from_secs(
                std::env::var("OTP_AUTH_NOTIFY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.code_ttl.as_secs() < 60 {
            warnings.push("Very short code TTL (< 1 minute) may lock users out".to_string());
        }
        if self.code_ttl.as_secs() > 3600 {
            warnings
                .push("Long code TTL (> 1 hour) widens the account takeover window".to_string());
        }

        if self.resend_cooldown.as_secs() == 0 {
            warnings.push("Zero resend cooldown allows notification flooding".to_string());
        }
        if self.resend_cooldown >= self.code_ttl {
            warnings.push(
                "Resend cooldown of at least the code TTL can strand users with an expired code"
                    .to_string(),
            );
        }

        if let Some(session_ttl) = self.session_ttl {
            if session_ttl.as_secs() < 300 {
                warnings
                    .push("Very short session TTL (< 5 minutes) forces constant re-login".to_string());
            }
        } else {
            warnings.push("Non-expiring sessions are only advisable for development".to_string());
        }

        warnings
    }

    /// Returns a summary of the current configuration.
    pub fn summary(&self) -> String {
        format!(
            "AuthConfig {{ Code TTL: {}s, Resend cooldown: {}s, Session TTL: {}, Notify timeout: {}s }}",
            self.code_ttl.as_secs(),
            self.resend_cooldown.as_secs(),
            match self.session_ttl {
                Some(ttl) => format!("{}s", ttl.as_secs()),
                None => "none".to_string(),
            },
            self.notify_timeout.as_secs(),
        )
    }
}

impl From<ConfigPreset> for AuthConfig {
    fn from(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Production => Self {
                code_ttl: Duration::from_secs(1800),
                resend_cooldown: Duration::from_secs(30),
                session_ttl: Some(Duration::from_secs(86400)),
                notify_timeout: Duration::from_secs(10),
            },
            ConfigPreset::Development => Self {
                code_ttl: Duration::from_secs(3600),
                resend_cooldown: Duration::from_secs(1),
                session_ttl: None,
                notify_timeout: Duration::from_secs(10),
            },
            ConfigPreset::HighSecurity => Self {
                code_ttl: Duration::from_secs(300),
                resend_cooldown: Duration::from_secs(60),
                session_ttl: Some(Duration::from_secs(3600)),
                notify_timeout: Duration::from_secs(5),
            },
            ConfigPreset::FromEnv => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env_vars() {
        unsafe {
            std::env::remove_var("OTP_AUTH_CODE_TTL");
            std::env::remove_var("OTP_AUTH_RESEND_COOLDOWN");
            std::env::remove_var("OTP_AUTH_SESSION_TTL");
            std::env::remove_var("OTP_AUTH_NOTIFY_TIMEOUT");
        }
    }

    #[test]
    fn test_production_preset() {
        let config = AuthConfig::from(ConfigPreset::Production);
        assert_eq!(config.code_ttl.as_secs(), 1800);
        assert_eq!(config.resend_cooldown.as_secs(), 30);
        assert_eq!(config.session_ttl, Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_development_preset() {
        let config = AuthConfig::from(ConfigPreset::Development);
        assert_eq!(config.code_ttl.as_secs(), 3600);
        assert_eq!(config.session_ttl, None);
    }

    #[test]
    fn test_high_security_preset() {
        let config = AuthConfig::from(ConfigPreset::HighSecurity);
        assert_eq!(config.code_ttl.as_secs(), 300);
        assert_eq!(config.resend_cooldown.as_secs(), 60);
        assert_eq!(config.session_ttl, Some(Duration::from_secs(3600)));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env_vars();

        unsafe {
            std::env::set_var("OTP_AUTH_CODE_TTL", "900");
            std::env::set_var("OTP_AUTH_RESEND_COOLDOWN", "45");
            std::env::set_var("OTP_AUTH_SESSION_TTL", "0");
        }

        let config = AuthConfig::from(ConfigPreset::FromEnv);
        assert_eq!(config.code_ttl.as_secs(), 900);
        assert_eq!(config.resend_cooldown.as_secs(), 45);
        assert_eq!(config.session_ttl, None);

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_env_defaults() {
        clear_env_vars();

        let config = AuthConfig::from(ConfigPreset::FromEnv);
        assert_eq!(config.code_ttl.as_secs(), 1800);
        assert_eq!(config.resend_cooldown.as_secs(), 30);
        assert_eq!(config.session_ttl, Some(Duration::from_secs(86400)));
        assert_eq!(config.notify_timeout.as_secs(), 10);
    }

    #[test]
    fn test_validation_valid_config() {
        let config = AuthConfig::from(ConfigPreset::Production);
        let warnings = config.validate();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_validation_code_ttl_warnings() {
        let config = AuthConfig {
            code_ttl: Duration::from_secs(30),
            ..AuthConfig::from(ConfigPreset::Production)
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("Very short code TTL")));

        let config = AuthConfig {
            code_ttl: Duration::from_secs(7200),
            ..AuthConfig::from(ConfigPreset::Production)
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("Long code TTL")));
    }

    #[test]
    fn test_validation_cooldown_warnings() {
        let config = AuthConfig {
            resend_cooldown: Duration::from_secs(0),
            ..AuthConfig::from(ConfigPreset::Production)
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("Zero resend cooldown")));

        let config = AuthConfig {
            code_ttl: Duration::from_secs(300),
            resend_cooldown: Duration::from_secs(300),
            ..AuthConfig::from(ConfigPreset::Production)
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("strand users")));
    }

    #[test]
    fn test_validation_session_warnings() {
        let config = AuthConfig {
            session_ttl: Some(Duration::from_secs(60)),
            ..AuthConfig::from(ConfigPreset::Production)
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("Very short session TTL")));

        let config = AuthConfig {
            session_ttl: None,
            ..AuthConfig::from(ConfigPreset::Production)
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("Non-expiring sessions")));
    }

    #[test]
    fn test_summary() {
        let summary = AuthConfig::from(ConfigPreset::Production).summary();
        assert!(summary.contains("1800"));
        assert!(summary.contains("30"));
    }
}
