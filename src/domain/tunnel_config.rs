//! Client tunnel config rendering.

use crate::config::{TUNNEL_ALLOWED_IPS, TUNNEL_DNS};
use crate::errors::AppResult;

use super::{Gateway, TunnelAssignment};

/// Render the WireGuard client config for an assignment on `gateway`.
///
/// Output is deterministic for the same inputs and ends with one newline.
pub fn render(assignment: &TunnelAssignment, gateway: &Gateway, tunnel_port: u16) -> AppResult<String> {
    let host = gateway.public_host()?;

    Ok(format!(
        "[Interface]\n\
         PrivateKey = {private_key}\n\
         Address = {address}/32\n\
         DNS = {dns}\n\
         \n\
         [Peer]\n\
         PublicKey = {gateway_key}\n\
         Endpoint = {host}:{port}\n\
         AllowedIPs = {allowed}\n",
        private_key = assignment.private_key,
        address = assignment.address,
        dns = TUNNEL_DNS,
        gateway_key = gateway.public_key,
        host = host,
        port = tunnel_port,
        allowed = TUNNEL_ALLOWED_IPS,
    ))
}
