use crate::error::Error;
use std::net::{IpAddr, Ipv4Addr};

/// Resolves the default machine id: the low 16 bits of this host's first
/// non-loopback private IPv4 address (third and fourth octets, high octet
/// first).
///
/// Two hosts in the same /16 never collide; beyond that, uniqueness is the
/// deployment's responsibility.
///
/// # Errors
///
/// Returns [`Error::NoPrivateIpv4`] if no interface carries a private IPv4
/// address, or [`Error::MachineIdFailed`] if the interfaces could not be
/// enumerated at all.
pub fn lower_16_bit_private_ip() -> Result<u16, Error> {
    let ip = private_ipv4()?;
    let octets = ip.octets();
    Ok(u16::from_be_bytes([octets[2], octets[3]]))
}

fn private_ipv4() -> Result<Ipv4Addr, Error> {
    let interfaces = if_addrs::get_if_addrs().map_err(|e| Error::MachineIdFailed(e.into()))?;
    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(v4) if is_private_ipv4(v4) => Some(v4),
            _ => None,
        })
        .ok_or(Error::NoPrivateIpv4)
}

/// RFC 1918 ranges: 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16.
fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 10 || (a == 172 && (16..32).contains(&b)) || (a == 192 && b == 168)
}
