use std::fmt;

/// Directory-safe token naming one game.
///
/// Derived from the HEADER signature by keeping alphanumerics, `-` and `_`
/// and capping the length. Two signatures that sanitize to the same token
/// are treated as the same game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameIdentity(String);

impl GameIdentity {
    pub const FALLBACK: &'static str = "unknown";

    pub fn from_signature(signature: &str, max_len: usize) -> Self {
        let token: String = signature
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .take(max_len)
            .collect();

        if token.is_empty() {
            Self(Self::FALLBACK.to_string())
        } else {
            Self(token)
        }
    }

    /// Wrap a name read back from the replays directory.
    pub fn from_dir_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GameIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
