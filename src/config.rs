//! Configuration file structures and loading.
//!
//! The bot reads a YAML configuration file; every value can be overridden
//! with a `PIGEON_`-prefixed environment variable using `__` as the section
//! separator.
//!
//! # Configuration file format
//!
//! ```yaml
//! matrix:
//!   # Fully qualified Matrix user ID of the bot account
//!   user_id: "@pigeon:example.com"
//!
//!   # Matrix account password
//!   password: "secret-password"
//!
//!   # E2EE recovery passphrase
//!   passphrase: "recovery-passphrase"
//!
//! relay:
//!   # Minimum seconds between two notes from the same user (default 60)
//!   cooldown_secs: 60
//! ```
//!
//! # Environment overrides
//!
//! ```bash
//! export PIGEON_MATRIX__PASSWORD="secret-from-env"
//! export PIGEON_RELAY__COOLDOWN_SECS="120"
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Root configuration structure for the bot.
#[derive(Deserialize)]
pub struct Config {
    /// Matrix account configuration
    pub matrix: Matrix,
    /// Relay behavior configuration, all optional
    #[serde(default)]
    pub relay: Relay,
}

/// Matrix account configuration.
#[derive(Deserialize)]
pub struct Matrix {
    /// Fully qualified Matrix user ID, e.g. `@pigeon:example.com`.
    pub user_id: String,

    /// Matrix account password.
    ///
    /// Used for the initial login. Once a session is persisted the bot
    /// restores it without re-authenticating.
    pub password: String,

    /// E2EE recovery passphrase.
    ///
    /// Decrypts cross-signing keys and secret storage so the bot can take
    /// part in encrypted rooms.
    pub passphrase: String,
}

/// Relay behavior configuration.
#[derive(Deserialize)]
pub struct Relay {
    /// Minimum time in seconds between two notes from the same user.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for Relay {
    fn default() -> Self {
        Relay {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    60
}

impl Config {
    /// Loads the configuration from a YAML file, applying `PIGEON_`
    /// environment overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value fails to
    /// deserialize.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("PIGEON_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const BASE_CONFIG: &str = r#"
matrix:
  user_id: "@pigeon:example.com"
  password: "password"
  passphrase: "passphrase"
"#;

    #[test]
    #[serial]
    fn test_load_minimal_config() {
        let file = write_config_file(BASE_CONFIG);

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.matrix.user_id, "@pigeon:example.com");
        assert_eq!(config.matrix.password, "password");
        assert_eq!(config.matrix.passphrase, "passphrase");
        // The relay section is optional and defaults to one minute
        assert_eq!(config.relay.cooldown_secs, 60);
    }

    #[test]
    #[serial]
    fn test_load_config_with_relay_section() {
        let file = write_config_file(&format!("{}relay:\n  cooldown_secs: 120\n", BASE_CONFIG));

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.relay.cooldown_secs, 120);
    }

    #[test]
    #[serial]
    fn test_env_variable_overrides_file_value() {
        let file = write_config_file(BASE_CONFIG);

        unsafe {
            std::env::set_var("PIGEON_MATRIX__PASSWORD", "from-env");
            std::env::set_var("PIGEON_RELAY__COOLDOWN_SECS", "30");
        }
        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        unsafe {
            std::env::remove_var("PIGEON_MATRIX__PASSWORD");
            std::env::remove_var("PIGEON_RELAY__COOLDOWN_SECS");
        }

        assert_eq!(config.matrix.password, "from-env");
        assert_eq!(config.relay.cooldown_secs, 30);
    }

    #[test]
    #[serial]
    fn test_load_missing_matrix_section_fails() {
        let file = write_config_file("relay:\n  cooldown_secs: 10\n");

        let result = Config::load(file.path().to_str().unwrap());
        assert!(result.is_err());
    }
}
