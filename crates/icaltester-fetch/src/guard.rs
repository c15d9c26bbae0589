//! Outbound URL validation.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. the input parses as an absolute URL
//! 2. no userinfo
//! 3. scheme is `https`, or `http` when allowed
//! 4. a host is present
//! 5. the host is not a numeric or obfuscated IPv4 form
//! 6. the host is not a local/internal name
//! 7. an IP literal is not loopback, private, link-local or reserved
//! 8. an explicit port is in the allowed set
//!
//! Only literals are checked; names are not resolved here.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::error::UrlRejection;
use crate::limits::UrlPolicy;

const LOCAL_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".lan"];

/// Validates `input` against `policy`, returning the parsed URL.
///
/// # Errors
///
/// Returns the first [`UrlRejection`] that applies.
pub fn validate_url(input: &str, policy: &UrlPolicy) -> Result<Url, UrlRejection> {
    let url = Url::parse(input.trim()).map_err(|e| UrlRejection::InvalidUrl(e.to_string()))?;

    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlRejection::CredentialsInUrl);
    }

    let scheme = url.scheme();
    if scheme != "https" && !(policy.allow_http && scheme == "http") {
        return Err(UrlRejection::SchemeNotAllowed(scheme.to_string()));
    }

    let host = url.host().ok_or(UrlRejection::MissingHost)?;
    let literal = authority_host(input.trim())
        .unwrap_or_else(|| url.host_str().unwrap_or_default().to_ascii_lowercase());

    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            if name.is_empty() {
                return Err(UrlRejection::MissingHost);
            }
            if is_numeric(&name) {
                return Err(UrlRejection::NumericHostname(name));
            }
            if is_local_name(&name) {
                return Err(UrlRejection::LocalHostname(name));
            }
        }
        Host::Ipv4(addr) => {
            let literal = literal.trim_end_matches('.');
            if literal != addr.to_string() {
                return Err(UrlRejection::NumericHostname(literal.to_string()));
            }
            if is_private_ipv4(addr) {
                return Err(UrlRejection::PrivateAddress(addr.to_string()));
            }
        }
        Host::Ipv6(addr) => {
            if is_private_ipv6(addr) {
                return Err(UrlRejection::PrivateAddress(addr.to_string()));
            }
        }
    }

    if let Some(port) = url.port() {
        if port == 0 {
            return Err(UrlRejection::InvalidPort);
        }
        if !policy.effective_ports().contains(&port) {
            return Err(UrlRejection::PortNotAllowed(port));
        }
    }

    Ok(url)
}

/// Extracts the host as written in the input, before any normalization.
///
/// Any run of slashes or backslashes after the scheme is accepted, as the
/// URL parser does for http and https.
fn authority_host(input: &str) -> Option<String> {
    let (_, rest) = input.split_once(':')?;
    let rest = rest.trim_start_matches(['/', '\\']);
    let authority = rest.split(['/', '?', '#', '\\']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    if host_port.starts_with('[') {
        return host_port
            .split_once(']')
            .map(|(h, _)| format!("{}]", h).to_ascii_lowercase());
    }
    let host = host_port.split(':').next()?;
    Some(host.to_ascii_lowercase())
}

fn is_numeric(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

fn is_local_name(name: &str) -> bool {
    name == "localhost" || LOCAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Loopback, private, link-local, CGNAT, multicast and reserved IPv4 ranges.
pub(crate) fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    let [a, b, _, _] = addr.octets();
    a == 0
        || a == 10
        || a == 127
        || (a == 169 && b == 254)
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || (a == 100 && (64..=127).contains(&b))
        || a >= 224
}

/// Loopback, unspecified, unique-local, link-local and documentation IPv6
/// ranges, plus IPv4-mapped addresses in a private IPv4 range.
pub(crate) fn is_private_ipv6(addr: Ipv6Addr) -> bool {
    if let Some(v4) = addr.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }
    let first = addr.segments()[0];
    let second = addr.segments()[1];
    addr.is_loopback()
        || addr.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first == 0x2001 && second == 0x0db8)
}
