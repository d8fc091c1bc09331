//! Serial device discovery.
//!
//! A scan walks a bounded list of platform-specific device names and
//! probes each one with a transient open/close at the probe baud rate. A
//! successful probe only means a serial device accepted being opened; no
//! relay protocol traffic is sent.

use tracing::{debug, info, instrument, trace, warn};

use crate::protocol::constants::{PROBE_BAUD_RATE, SCAN_UPPER_BOUND};
use crate::transport::SerialTransport;

#[cfg(windows)]
fn candidate_name(n: u32) -> String {
    format!(r"\\.\COM{n}")
}

#[cfg(not(windows))]
fn candidate_name(n: u32) -> String {
    format!("/dev/ttyACM{}", n - 1)
}

/// Device names probed by [`scan`], in probe order.
pub fn candidate_ports() -> impl Iterator<Item = String> {
    (1..SCAN_UPPER_BOUND).map(candidate_name)
}

/// Probe every platform candidate and return the ones that opened.
#[instrument(skip(transport))]
pub fn scan<T: SerialTransport>(transport: &T) -> Vec<String> {
    scan_candidates(transport, candidate_ports())
}

/// Probe `candidates` in order and return the ones that opened.
///
/// Each probe is closed before the next candidate is tried.
pub fn scan_candidates<T, I, S>(transport: &T, candidates: I) -> Vec<String>
where
    T: SerialTransport,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut found = Vec::new();

    for candidate in candidates {
        let name: String = candidate.into();
        match transport.open(&name, PROBE_BAUD_RATE) {
            Ok(mut handle) => {
                if let Err(e) = transport.close(&mut handle) {
                    warn!(port = %name, error = %e, "Failed to close probe");
                }
                debug!(port = %name, "Device found");
                found.push(name);
            }
            Err(e) => trace!(port = %name, error = %e, "No device"),
        }
    }

    info!(count = found.len(), "Scan complete");
    found
}
