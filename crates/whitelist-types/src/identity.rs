use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// One whitelisted entity, as the raw bytes that get hashed into a leaf.
///
/// Text form: `0x`-prefixed strings are hex-decoded (an Ethereum address
/// becomes its 20 bytes), anything else is taken as UTF-8.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(Vec<u8>);

impl Identity {
    /// Build from raw bytes. Empty input is rejected.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, TypesError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TypesError::EmptyIdentity);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the identity prints as plain text rather than hex.
    fn is_plain_text(&self) -> bool {
        match std::str::from_utf8(&self.0) {
            Ok(s) => {
                !s.starts_with("0x")
                    && !s.starts_with("0X")
                    && s.trim() == s
                    && !s.chars().any(char::is_control)
            }
            Err(_) => false,
        }
    }
}

impl FromStr for Identity {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex_part) => Self::from_bytes(hex::decode(hex_part)?),
            None => Self::from_bytes(s.as_bytes()),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain_text() {
            f.write_str(&String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "0x{}", hex::encode(&self.0))
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
