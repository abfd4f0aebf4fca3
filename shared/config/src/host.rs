use std::net::ToSocketAddrs;
use sysinfo::{System, SystemExt};

/// Network name of this machine, or `localhost` when DNS lookups are disabled.
pub fn host_name(dns_lookups_disabled: bool) -> String {
    if dns_lookups_disabled {
        return "localhost".to_string();
    }
    System::new()
        .host_name()
        .unwrap_or_else(|| "unknown".to_string())
}

/// Address of this machine, or `127.0.0.1` when DNS lookups are disabled.
pub fn host_address(dns_lookups_disabled: bool) -> String {
    if dns_lookups_disabled {
        return "127.0.0.1".to_string();
    }
    let name = host_name(false);
    (name.as_str(), 0)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
