//! Which backend family the engine router is driving.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The engine mode: a model served on this machine, or a managed remote API.
///
/// `offline` / `online` are accepted as aliases so older config files keep
/// loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "offline")]
    Local,
    #[serde(alias = "online")]
    Remote,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Local => "local",
            Mode::Remote => "remote",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "offline" => Ok(Mode::Local),
            "remote" | "online" => Ok(Mode::Remote),
            other => Err(format!(
                "unknown mode '{other}' (expected 'local' or 'remote')"
            )),
        }
    }
}
