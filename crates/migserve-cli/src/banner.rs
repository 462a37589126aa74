use std::net::SocketAddr;

/// Host to show in the startup line. Wildcard binds are shown as localhost.
fn display_host(addr: &SocketAddr) -> String {
    let ip = addr.ip();
    if ip.is_unspecified() || ip.is_loopback() {
        "localhost".to_string()
    } else if addr.is_ipv6() {
        format!("[{ip}]")
    } else {
        ip.to_string()
    }
}

pub fn startup_line(addr: &SocketAddr) -> String {
    format!(
        "Server is running at http://{}:{}",
        display_host(addr),
        addr.port()
    )
}

/// Announce the listening address on stdout, once per process.
pub fn print_startup(addr: &SocketAddr) {
    println!("{}", startup_line(addr));
}
