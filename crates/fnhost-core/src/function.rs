//! Function definitions and persisted metadata.
//!
//! - [`FunctionDefinition`]: what a client submits for registration
//! - [`FunctionName`]: a validated name, safe as a path component and route
//! - [`FunctionMetadata`]: the registry record for a built function

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fnhost_common::RuntimeError;

/// Names that would shadow a built-in route.
pub const RESERVED_NAMES: &[&str] = &["register", "functions"];

/// Longest accepted function name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// A function submitted for registration.
///
/// `code` travels as a base64 string in JSON, which is how byte arrays are
/// conventionally encoded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionDefinition {
    /// Requested function name.
    pub name: String,

    /// `"http"`, a 5-field cron expression, or empty.
    #[serde(default)]
    pub trigger: String,

    /// Raw source bytes.
    #[serde(default, with = "code_base64")]
    pub code: Vec<u8>,
}

impl FunctionDefinition {
    /// Create a new definition.
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        code: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            code: code.into(),
        }
    }
}

/// A validated function name.
///
/// Non-empty, at most [`MAX_NAME_LEN`] bytes, ASCII alphanumerics plus `-`
/// and `_`, starting with an alphanumeric, and not one of
/// [`RESERVED_NAMES`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionName(String);

impl FunctionName {
    /// Validate a raw name.
    pub fn parse(raw: &str) -> Result<Self, RuntimeError> {
        if raw.is_empty() {
            return Err(RuntimeError::validation("function name must not be empty"));
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(RuntimeError::validation(format!(
                "function name exceeds {MAX_NAME_LEN} bytes"
            )));
        }
        if !raw.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(RuntimeError::validation(format!(
                "function name '{raw}' must start with a letter or digit"
            )));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(RuntimeError::validation(format!(
                "function name '{raw}' contains invalid character {bad:?}"
            )));
        }
        if RESERVED_NAMES.contains(&raw) {
            return Err(RuntimeError::validation(format!(
                "function name '{raw}' is reserved"
            )));
        }

        Ok(Self(raw.to_string()))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// HTTP route the function is reachable on when HTTP-bound.
    pub fn route(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FunctionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Registry record for a successfully built function.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FunctionMetadata {
    /// Function name (registry key).
    pub name: String,

    /// Trigger string as submitted.
    pub trigger: String,

    /// Location of the built artifact.
    pub path: PathBuf,

    /// When the entry was last written.
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

impl FunctionMetadata {
    /// Create metadata stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            path: path.into(),
            registered_at: Utc::now(),
        }
    }
}

mod code_base64 {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(code: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(code))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("code is not valid base64: {e}")))
    }
}
