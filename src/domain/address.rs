//! Tunnel address selection inside a gateway subnet.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use rand::Rng;

/// First host offset handed to clients; offset 1 is the gateway itself.
const FIRST_CLIENT_OFFSET: u32 = 2;

/// Whether `addr` may be handed to a client on `subnet`.
///
/// Excludes the network address, the router (network + 1), the broadcast
/// address and anything whose last octet is 0 or 255.
pub fn is_assignable(subnet: &Ipv4Net, addr: Ipv4Addr) -> bool {
    if !subnet.contains(&addr) {
        return false;
    }
    let offset = u32::from(addr) - u32::from(subnet.network());
    let last_octet = addr.octets()[3];

    offset >= FIRST_CLIENT_OFFSET
        && addr != subnet.broadcast()
        && last_octet != 0
        && last_octet != 255
}

/// Pick a free client address.
///
/// Tries `attempts` random candidates first, then walks the subnet in order.
/// Returns `None` when every assignable address is in `taken`.
pub fn pick_host<R: Rng>(
    subnet: &Ipv4Net,
    taken: &HashSet<Ipv4Addr>,
    attempts: u32,
    rng: &mut R,
) -> Option<Ipv4Addr> {
    let base = u32::from(subnet.network());
    let size = host_span(subnet)?;
    // Offsets in [FIRST_CLIENT_OFFSET, size - 2]; size - 1 is broadcast
    let last = size - 2;
    let is_free = |addr: Ipv4Addr| is_assignable(subnet, addr) && !taken.contains(&addr);

    for _ in 0..attempts {
        let candidate = Ipv4Addr::from(base + rng.gen_range(FIRST_CLIENT_OFFSET..=last));
        if is_free(candidate) {
            return Some(candidate);
        }
    }

    (FIRST_CLIENT_OFFSET..=last)
        .map(|offset| Ipv4Addr::from(base + offset))
        .find(|addr| is_free(*addr))
}

/// Number of addresses in the subnet, `None` if too small for any client.
fn host_span(subnet: &Ipv4Net) -> Option<u32> {
    let host_bits = 32 - u32::from(subnet.prefix_len());
    if host_bits < 2 {
        return None;
    }
    // /0 would overflow; nobody runs a gateway that large
    1u32.checked_shl(host_bits)
}
