//! Subject alternative name extraction.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{GeneralName, ParsedExtension};

const SUBJECT_ALT_NAME_OID: &str = "2.5.29.17";

/// Collect the DNS and IP entries of every subjectAltName extension.
///
/// An extension that fails to decode is treated as absent. IP addresses are
/// rendered in their textual form so they compare equal to the names a TLS
/// layer asks for.
pub(crate) fn alt_names(cert: &X509Certificate<'_>) -> Vec<Vec<u8>> {
    let mut names = Vec::new();
    for extension in cert.extensions() {
        match extension.parsed_extension() {
            ParsedExtension::SubjectAlternativeName(san) => {
                for general_name in &san.general_names {
                    match general_name {
                        GeneralName::DNSName(dns) => names.push(dns.as_bytes().to_vec()),
                        GeneralName::IPAddress(octets) => {
                            if let Some(ip) = ip_from_octets(octets) {
                                names.push(ip.to_string().into_bytes());
                            }
                        }
                        _ => {}
                    }
                }
            }
            ParsedExtension::ParseError { .. }
                if extension.oid.to_id_string() == SUBJECT_ALT_NAME_OID =>
            {
                debug!("skipping undecodable subjectAltName extension");
            }
            _ => {}
        }
    }
    names
}

fn ip_from_octets(octets: &[u8]) -> Option<IpAddr> {
    match octets.len() {
        4 => {
            let mut v4 = [0u8; 4];
            v4.copy_from_slice(octets);
            Some(IpAddr::V4(Ipv4Addr::from(v4)))
        }
        16 => {
            let mut v6 = [0u8; 16];
            v6.copy_from_slice(octets);
            Some(IpAddr::V6(Ipv6Addr::from(v6)))
        }
        _ => None,
    }
}
