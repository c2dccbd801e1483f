//! Registry address parsing (`proto://addr`).

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
};

use super::error::{RegistryError, RegistryResult};

pub const PROTO_ZK: &str = "zk";
pub const PROTO_REDIS: &str = "redis";
pub const PROTO_LM: &str = "lm";
pub const PROTO_LMQ: &str = "lmq";

/// Parsed registry address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryAddress {
    pub proto: String,
    pub addr: String,
}

impl RegistryAddress {
    /// Parse an address of the form `proto://addr`.
    ///
    /// Network addresses (`ip`, `ip:port`, or a comma separated list of them)
    /// are kept verbatim. Anything else is treated as a registry root path and
    /// gets a leading `/` when missing.
    pub fn parse(address: &str) -> RegistryResult<Self> {
        let address = address.trim();
        let parts: Vec<&str> = address.split("://").collect();
        if parts.len() != 2 {
            return Err(RegistryError::InvalidAddress(format!(
                "{} (expected proto://addr)",
                address
            )));
        }
        let (proto, addr) = (parts[0], parts[1]);
        if proto.is_empty() {
            return Err(RegistryError::InvalidAddress(format!(
                "{} is missing the protocol",
                address
            )));
        }
        if addr.is_empty() {
            return Err(RegistryError::InvalidAddress(format!(
                "{} is missing the address",
                address
            )));
        }

        let addr = if addr.starts_with('/') || is_network_address(addr) {
            addr.to_string()
        } else {
            format!("/{}", addr)
        };
        Ok(Self {
            proto: proto.to_string(),
            addr,
        })
    }

    /// True if this address is served in-process.
    pub fn is_local(&self) -> bool {
        self.proto.eq_ignore_ascii_case(PROTO_LM) || self.proto.eq_ignore_ascii_case(PROTO_LMQ)
    }

    /// Returns the address part when the protocol is one of `protos`.
    pub fn addr_if_proto(&self, protos: &[&str]) -> Option<&str> {
        protos
            .iter()
            .any(|p| *p == self.proto)
            .then_some(self.addr.as_str())
    }
}

impl fmt::Display for RegistryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.proto, self.addr)
    }
}

fn is_network_address(addr: &str) -> bool {
    addr.split(',').all(|item| {
        let item = item.trim();
        item.parse::<IpAddr>().is_ok() || item.parse::<SocketAddr>().is_ok()
    })
}
