//! Network-join boundary: wait for a routable address, report link quality.
//!
//! Credential bootstrap happens outside this process (wpa_supplicant or
//! NetworkManager owns the association); all we do here is poll until the
//! kernel can route, the way the firmware polled its join status.

use std::net::{IpAddr, UdpSocket};
use std::time::Duration;

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub ip: IpAddr,
    pub signal_dbm: Option<i32>,
}

/// Poll once a second until a routable local address shows up, give up after
/// `max_wait`. `None` means the node keeps serving on the wildcard address
/// without a confirmed network.
pub async fn join(max_wait: Duration) -> Option<NetworkInfo> {
    let attempts = max_wait.as_secs().max(1);

    for attempt in 0..attempts {
        if let Some(ip) = local_ip() {
            let signal_dbm = wireless_signal_dbm();
            info!(ip = %ip, ?signal_dbm, "network joined");
            return Some(NetworkInfo { ip, signal_dbm });
        }
        if attempt == 0 {
            info!("waiting for network...");
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    warn!("no routable address after {}s", max_wait.as_secs());
    None
}

/// The address the kernel would source traffic from. Connecting a UDP socket
/// sends no packets; it only resolves the route.
fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() || ip.is_loopback() {
        return None;
    }
    Some(ip)
}

/// Link level in dBm from `/proc/net/wireless`, absent on wired links.
fn wireless_signal_dbm() -> Option<i32> {
    let table = std::fs::read_to_string("/proc/net/wireless").ok()?;

    // Two header lines, then one row per interface:
    //   wlan0: 0000   54.  -56.  -256        0 ...
    let row = table.lines().nth(2)?;
    let level = row.split_whitespace().nth(3)?;
    let dbm = level.trim_end_matches('.').parse::<f32>().ok()?;
    Some(dbm as i32)
}
