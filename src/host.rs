//! Best-effort host identity resolution
//!
//! Registrations carry the host name and address of the emitting process.
//! Neither is required for correctness, so every failure here degrades to
//! blank fields with a warning.

use crate::registration::HostInfo;
use std::net::UdpSocket;
use tracing::warn;

/// Resolve the local host name and address
///
/// Failures leave the corresponding field blank; this never errors.
pub fn resolve() -> HostInfo {
    HostInfo {
        name: host_name().unwrap_or_default(),
        addr: local_addr().unwrap_or_default(),
    }
}

fn host_name() -> Option<String> {
    match hostname::get() {
        Ok(name) => Some(name.to_string_lossy().into_owned()),
        Err(e) => {
            warn!("Could not resolve host name: {}", e);
            None
        }
    }
}

/// Routable local address via a connected UDP socket
///
/// `connect` on a UDP socket sends nothing; it only asks the OS which
/// local address would be used to reach the target.
fn local_addr() -> Option<String> {
    let probe = || -> std::io::Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:53")?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    match probe() {
        Ok(addr) => Some(addr),
        Err(e) => {
            warn!("Could not resolve host address: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_never_panics() {
        // Values are environment-dependent; only the shape is checkable.
        let host = resolve();
        let _ = (host.name, host.addr);
    }
}
