//! Server-side network identity lookup.
//!
//! The host identity is the first non-loopback interface carrying an IPv4
//! address. When there is none, both fields stay empty; that is not an error.

use crate::session::NetworkIdentity;

/// Source of the server network identity recorded on each session
#[derive(Debug, Clone, Default)]
pub enum IdentityProvider {
    /// Inspect the host's interfaces on every lookup
    #[default]
    Host,
    /// Always report the same identity
    Fixed(NetworkIdentity),
}

impl IdentityProvider {
    pub fn server_identity(&self) -> NetworkIdentity {
        match self {
            IdentityProvider::Host => host_identity(),
            IdentityProvider::Fixed(identity) => identity.clone(),
        }
    }
}

fn host_identity() -> NetworkIdentity {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            tracing::warn!("Failed to enumerate network interfaces: {}", e);
            return NetworkIdentity::default();
        }
    };

    let candidate = interfaces
        .iter()
        .find(|iface| !iface.is_loopback() && iface.ip().is_ipv4());

    let Some(iface) = candidate else {
        tracing::debug!("No external IPv4 interface found");
        return NetworkIdentity::default();
    };

    let mac_address = match mac_address::mac_address_by_name(&iface.name) {
        Ok(mac) => mac.map(|m| m.to_string()),
        Err(e) => {
            tracing::debug!("No MAC address for interface {}: {}", iface.name, e);
            None
        }
    };

    NetworkIdentity {
        mac_address,
        ip_address: Some(iface.ip().to_string()),
    }
}
