// Copyright (C) 2013-2020 Blockstack PBC, a public benefit corporation
// Copyright (C) 2020-2024 Stacks Open Internet Foundation
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::env;
use std::fs;
use std::path::PathBuf;

use crate::crypto::backend::CipherAlgorithm;
use crate::crypto::ecies::CipherTextEncoding;

/// Environment variable naming a TOML file to load the crypto config from
pub const CRYPTO_CONFIG_ENV: &str = "STACKS_CRYPTO_CONFIG";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// An error occurred parsing the provided configuration
pub enum ConfigError {
    /// Error occurred reading config file
    #[error("{0}")]
    InvalidConfig(String),
    /// An error occurred parsing the TOML data
    #[error("{0}")]
    ParseError(String),
    /// A field was malformed
    #[error("identifier={0}, value={1}")]
    BadField(String, String),
}

define_named_enum!(BackendPreference {
    Auto("auto"),
    Native("native"),
    Software("software"),
});

/// Which cipher/KDF implementations to use, and the defaults for ECIES
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoConfig {
    pub cipher_backend: BackendPreference,
    pub kdf_backend: BackendPreference,
    pub default_cipher: CipherAlgorithm,
    pub default_cipher_text_encoding: CipherTextEncoding,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        CryptoConfig {
            cipher_backend: BackendPreference::Auto,
            kdf_backend: BackendPreference::Auto,
            default_cipher: CipherAlgorithm::Aes256Cbc,
            default_cipher_text_encoding: CipherTextEncoding::Hex,
        }
    }
}

/// The config file as written on disk. Every field is optional.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct RawCryptoConfigFile {
    pub cipher_backend: Option<String>,
    pub kdf_backend: Option<String>,
    pub default_cipher: Option<String>,
    pub default_cipher_text_encoding: Option<String>,
}

impl RawCryptoConfigFile {
    /// load the config from a string
    pub fn load_from_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(data).map_err(|e| ConfigError::ParseError(format!("{e:?}")))?;
        Ok(config)
    }
}

impl TryFrom<&PathBuf> for RawCryptoConfigFile {
    type Error = ConfigError;

    fn try_from(path: &PathBuf) -> Result<Self, Self::Error> {
        Self::load_from_str(&fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidConfig(format!("failed to read config file: {e:?}"))
        })?)
    }
}

fn parse_field<T>(
    name: &str,
    raw: Option<String>,
    default: T,
    lookup: fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => lookup(&value).ok_or(ConfigError::BadField(name.to_string(), value)),
    }
}

impl TryFrom<RawCryptoConfigFile> for CryptoConfig {
    type Error = ConfigError;

    fn try_from(raw_data: RawCryptoConfigFile) -> Result<Self, Self::Error> {
        let default = CryptoConfig::default();
        Ok(CryptoConfig {
            cipher_backend: parse_field(
                "cipher_backend",
                raw_data.cipher_backend,
                default.cipher_backend,
                BackendPreference::lookup_by_name,
            )?,
            kdf_backend: parse_field(
                "kdf_backend",
                raw_data.kdf_backend,
                default.kdf_backend,
                BackendPreference::lookup_by_name,
            )?,
            default_cipher: parse_field(
                "default_cipher",
                raw_data.default_cipher,
                default.default_cipher,
                CipherAlgorithm::lookup_by_name,
            )?,
            default_cipher_text_encoding: parse_field(
                "default_cipher_text_encoding",
                raw_data.default_cipher_text_encoding,
                default.default_cipher_text_encoding,
                CipherTextEncoding::lookup_by_name,
            )?,
        })
    }
}

impl TryFrom<&PathBuf> for CryptoConfig {
    type Error = ConfigError;
    fn try_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let config_file = RawCryptoConfigFile::try_from(path)?;
        Self::try_from(config_file)
    }
}

impl CryptoConfig {
    /// load the config from a string and parse it
    pub fn load_from_str(data: &str) -> Result<Self, ConfigError> {
        RawCryptoConfigFile::load_from_str(data)?.try_into()
    }

    /// load the config from a file and parse it
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::try_from(&PathBuf::from(path))
    }

    /// Load from the file named by `STACKS_CRYPTO_CONFIG`, if set.
    /// A missing variable gives the defaults. An unreadable or invalid file is
    /// logged and also gives the defaults.
    pub fn from_env_or_default() -> CryptoConfig {
        let path = match env::var(CRYPTO_CONFIG_ENV) {
            Ok(path) => path,
            Err(_) => return CryptoConfig::default(),
        };
        match CryptoConfig::load_from_file(&path) {
            Ok(config) => {
                debug!("Loaded crypto config"; "path" => %path, "config" => ?config);
                config
            }
            Err(e) => {
                warn!("Failed to load crypto config, using defaults";
                      "path" => %path,
                      "error" => %e);
                CryptoConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(CryptoConfig::load_from_str("").unwrap(), CryptoConfig::default());
        let config = CryptoConfig::default();
        assert_eq!(config.cipher_backend, BackendPreference::Auto);
        assert_eq!(config.default_cipher, CipherAlgorithm::Aes256Cbc);
        assert_eq!(config.default_cipher_text_encoding, CipherTextEncoding::Hex);
    }

    #[test]
    fn test_load_from_str() {
        let config = CryptoConfig::load_from_str(
            r#"
cipher_backend = "software"
kdf_backend = "native"
default_cipher = "aes-128-cbc"
default_cipher_text_encoding = "base64"
"#,
        )
        .unwrap();
        assert_eq!(config.cipher_backend, BackendPreference::Software);
        assert_eq!(config.kdf_backend, BackendPreference::Native);
        assert_eq!(config.default_cipher, CipherAlgorithm::Aes128Cbc);
        assert_eq!(config.default_cipher_text_encoding, CipherTextEncoding::Base64);
    }

    #[test]
    fn test_bad_config() {
        assert_eq!(
            CryptoConfig::load_from_str("cipher_backend = \"openssl\""),
            Err(ConfigError::BadField(
                "cipher_backend".to_string(),
                "openssl".to_string()
            ))
        );
        match CryptoConfig::load_from_str("unknown_field = 1") {
            Err(ConfigError::ParseError(_)) => {}
            x => panic!("expected parse error, got {:?}", x),
        }
        match CryptoConfig::load_from_file("/nonexistent/crypto.toml") {
            Err(ConfigError::InvalidConfig(_)) => {}
            x => panic!("expected read error, got {:?}", x),
        }
    }

    #[test]
    fn test_load_from_file() {
        let path = env::temp_dir().join(format!("crypto-config-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "kdf_backend = \"software\"").unwrap();
        drop(file);

        let config = CryptoConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.kdf_backend, BackendPreference::Software);
        assert_eq!(config.cipher_backend, BackendPreference::Auto);
        fs::remove_file(&path).unwrap();
    }
}
