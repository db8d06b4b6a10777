//! DNS server address validation.
//!
//! Addresses end up interpolated into resolver files and external command
//! lines, so everything is checked here before any side effect happens.

use crate::error::{ChangerError, Result};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Raw server input as a caller supplies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServersInput {
    /// An ordered sequence of addresses.
    List(Vec<String>),
    /// A single whitespace-delimited string, e.g. `"1.1.1.1 1.0.0.1"`.
    Spaced(String),
}

impl From<Vec<String>> for ServersInput {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

impl From<&[&str]> for ServersInput {
    fn from(list: &[&str]) -> Self {
        Self::List(list.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ServersInput {
    fn from(list: [&str; N]) -> Self {
        Self::List(list.iter().map(|s| (*s).to_string()).collect())
    }
}

impl From<&str> for ServersInput {
    fn from(spaced: &str) -> Self {
        Self::Spaced(spaced.to_string())
    }
}

impl From<String> for ServersInput {
    fn from(spaced: String) -> Self {
        Self::Spaced(spaced)
    }
}

/// A single validated server address, kept as the caller wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsServer(String);

impl DnsServer {
    /// Validates one address.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Validation`] naming the entry if it is neither
    /// an IPv4 dotted quad nor an IPv6 literal.
    pub fn parse(entry: &str) -> Result<Self> {
        if is_ipv4(entry) || is_ipv6(entry) {
            Ok(Self(entry.to_string()))
        } else {
            Err(ChangerError::Validation(format!(
                "'{entry}' is not a valid IPv4 or IPv6 address"
            )))
        }
    }

    /// The address text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for IPv6 literals.
    #[must_use]
    pub fn is_ipv6(&self) -> bool {
        self.0.contains(':')
    }
}

impl fmt::Display for DnsServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exactly two validated servers, primary first.
///
/// # Example
///
/// ```
/// use dns_changer::DnsServerList;
///
/// let servers = DnsServerList::parse("1.1.1.1 1.0.0.1").unwrap();
/// assert_eq!(servers.primary().as_str(), "1.1.1.1");
/// assert_eq!(servers.secondary().as_str(), "1.0.0.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsServerList {
    primary: DnsServer,
    secondary: DnsServer,
}

impl DnsServerList {
    /// Validates caller input into a server pair.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Validation`] if a spaced string contains no
    /// whitespace, if there are not exactly two entries, or on the first
    /// malformed entry.
    pub fn parse(input: impl Into<ServersInput>) -> Result<Self> {
        let entries: Vec<String> = match input.into() {
            ServersInput::List(list) => list,
            ServersInput::Spaced(spaced) => {
                if !spaced.contains(char::is_whitespace) {
                    return Err(ChangerError::Validation(
                        "a server string must separate its addresses with whitespace".into(),
                    ));
                }
                spaced.split_whitespace().map(str::to_string).collect()
            }
        };

        let mut servers = entries
            .iter()
            .map(|entry| DnsServer::parse(entry))
            .collect::<Result<Vec<_>>>()?
            .into_iter();

        match (servers.next(), servers.next(), servers.next()) {
            (Some(primary), Some(secondary), None) => Ok(Self { primary, secondary }),
            (_, _, Some(_)) => Err(ChangerError::Validation(format!(
                "exactly two DNS servers are required, got {}",
                entries.len()
            ))),
            _ => Err(ChangerError::Validation(
                "two DNS server addresses are required (primary and secondary)".into(),
            )),
        }
    }

    /// The primary server.
    #[must_use]
    pub const fn primary(&self) -> &DnsServer {
        &self.primary
    }

    /// The secondary server.
    #[must_use]
    pub const fn secondary(&self) -> &DnsServer {
        &self.secondary
    }

    /// Both addresses, primary first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        vec![self.primary.0.clone(), self.secondary.0.clone()]
    }
}

impl FromStr for DnsServerList {
    type Err = ChangerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DnsServerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.primary, self.secondary)
    }
}

/// Dotted quad without leading zeros, first octet non-zero.
fn is_ipv4(entry: &str) -> bool {
    Ipv4Addr::from_str(entry).is_ok_and(|ip| ip.octets()[0] != 0)
}

/// IPv6 literal, optionally with `%zone` on link-local addresses.
fn is_ipv6(entry: &str) -> bool {
    let (addr, zone) = match entry.split_once('%') {
        Some((addr, zone)) => (addr, Some(zone)),
        None => (entry, None),
    };
    let Ok(ip) = Ipv6Addr::from_str(addr) else {
        return false;
    };
    match zone {
        None => true,
        Some(zone) => {
            let link_local = ip.segments()[0] & 0xffc0 == 0xfe80;
            link_local && !zone.is_empty() && zone.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}
