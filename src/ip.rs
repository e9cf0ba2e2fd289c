//! Dotted-quad IPv4 validation.

/// Returns `true` if `s` is exactly four dot-separated decimal groups of
/// one to three digits, each in `0..=255`.
///
/// No surrounding whitespace, hostnames, IPv6 or trailing dots are accepted.
///
/// ```
/// use host_dns::ip::is_valid_ipv4;
///
/// assert!(is_valid_ipv4("8.8.8.8"));
/// assert!(!is_valid_ipv4("8.8.8.8."));
/// assert!(!is_valid_ipv4("256.1.1.1"));
/// ```
#[must_use]
pub fn is_valid_ipv4(s: &str) -> bool {
    let mut groups = 0;
    for part in s.split('.') {
        groups += 1;
        if groups > 4 || part.is_empty() || part.len() > 3 {
            return false;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        match part.parse::<u16>() {
            Ok(n) if n <= 255 => {}
            _ => return false,
        }
    }
    groups == 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_quads() {
        for ip in ["0.0.0.0", "8.8.8.8", "255.255.255.255", "192.168.1.1", "10.0.0.01"] {
            assert!(is_valid_ipv4(ip), "{ip}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for ip in [
            "",
            "1.1.1",
            "1.1.1.1.1",
            "1.1.1.1.",
            ".1.1.1.1",
            "256.0.0.1",
            "1.1.1.999",
            "a.b.c.d",
            "1.1.1.-1",
            "1.1.1.+1",
            " 1.1.1.1",
            "1.1.1.1 ",
            "::1",
            "dns.google",
            "1..1.1",
            "0001.1.1.1",
        ] {
            assert!(!is_valid_ipv4(ip), "{ip:?}");
        }
    }
}
