use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Network address of the worker's admin listener in `host:port` form.
///
/// The worker writes it once to the side-channel file after binding its listener.
/// Bracketed IPv6 hosts (`[::1]:9901`) are accepted; an empty host means "all interfaces".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdminAddress {
    raw: String,
    host: String,
    port: u16,
}

impl AdminAddress {
    /// Host part without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The address exactly as the worker published it (minus surrounding whitespace).
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for AdminAddress {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |reason| ModelError::InvalidAdminAddress {
            input: raw.to_string(),
            reason,
        };

        let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
            let end = rest.find(']').ok_or_else(|| invalid("missing ']' in address"))?;
            let port = rest[end + 1..]
                .strip_prefix(':')
                .ok_or_else(|| invalid("missing port in address"))?;
            (&rest[..end], port)
        } else {
            let colon = raw.rfind(':').ok_or_else(|| invalid("missing port in address"))?;
            let host = &raw[..colon];
            if host.contains(':') {
                return Err(invalid("too many colons in address"));
            }
            if host.contains('[') || host.contains(']') {
                return Err(invalid("unexpected bracket in address"));
            }
            (host, &raw[colon + 1..])
        };

        let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
        Ok(Self {
            raw: raw.to_string(),
            host: host.to_string(),
            port,
        })
    }
}

impl TryFrom<String> for AdminAddress {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AdminAddress> for String {
    fn from(value: AdminAddress) -> Self {
        value.raw
    }
}

impl fmt::Display for AdminAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
