//! Credential application for outgoing API requests
//!
//! Credentials are held in [`Secret`] values that are zeroized on drop and
//! redacted from `Debug` and serialized output.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Header name cannot be empty")]
    EmptyHeaderName,

    #[error("Header name contains invalid characters: {0}")]
    InvalidHeaderName(String),

    #[error("Credential contains line breaks")]
    LineBreak,
}

/// A credential value with automatic memory clearing
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("****")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Secret)
    }
}

/// Where an API key is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLocation {
    #[default]
    Header,
    Query,
}

/// Authentication applied to every call of an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    Bearer {
        token: Secret,
    },
    ApiKey {
        #[serde(default = "default_key_name")]
        key_name: String,
        key_value: Secret,
        #[serde(default)]
        key_location: KeyLocation,
    },
    Basic {
        username: String,
        password: Secret,
    },
}

fn default_key_name() -> String {
    "X-API-Key".to_string()
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        AuthConfig::Bearer {
            token: Secret::new(token),
        }
    }

    pub fn api_key(key_name: impl Into<String>, key_value: impl Into<String>) -> Self {
        AuthConfig::ApiKey {
            key_name: key_name.into(),
            key_value: Secret::new(key_value),
            key_location: KeyLocation::Header,
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthConfig::Basic {
            username: username.into(),
            password: Secret::new(password),
        }
    }

    /// Reject configurations that would produce malformed headers
    pub fn validate(&self) -> Result<(), AuthError> {
        let (name, secret) = match self {
            AuthConfig::Bearer { token } => ("Authorization", token),
            AuthConfig::ApiKey {
                key_name,
                key_value,
                ..
            } => (key_name.as_str(), key_value),
            AuthConfig::Basic { password, .. } => ("Authorization", password),
        };

        if name.is_empty() {
            return Err(AuthError::EmptyHeaderName);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AuthError::InvalidHeaderName(name.to_string()));
        }
        if secret.expose_secret().contains(['\r', '\n']) {
            return Err(AuthError::LineBreak);
        }
        Ok(())
    }

    /// Whether the credential is carried in a header
    pub fn is_attached(&self) -> bool {
        !matches!(
            self,
            AuthConfig::ApiKey {
                key_location: KeyLocation::Query,
                ..
            }
        )
    }

    /// The header carrying the credential, if any
    pub fn header(&self) -> Option<(String, String)> {
        match self {
            AuthConfig::Bearer { token } => Some((
                "Authorization".to_string(),
                format!("Bearer {}", token.expose_secret()),
            )),
            AuthConfig::ApiKey {
                key_name,
                key_value,
                key_location: KeyLocation::Header,
            } => Some((key_name.clone(), key_value.expose_secret().to_string())),
            AuthConfig::ApiKey { .. } => None,
            AuthConfig::Basic { username, password } => {
                let credentials =
                    STANDARD.encode(format!("{username}:{}", password.expose_secret()));
                Some(("Authorization".to_string(), format!("Basic {credentials}")))
            }
        }
    }
}
