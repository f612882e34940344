//! Port bindings and Docker-style port string parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport protocol of a port binding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    /// Lenient parse: anything that is not `udp` counts as TCP.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("udp") {
            Protocol::Udp
        } else {
            Protocol::Tcp
        }
    }
}

/// A host→container port binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    /// Plain TCP binding, host and container port given.
    pub fn tcp(host_port: u16, container_port: u16) -> Self {
        PortMapping {
            host_port,
            container_port,
            ..PortMapping::default()
        }
    }

    /// Parse a Docker-style port string like `8080`, `8080:80`,
    /// `127.0.0.1:8080:80`, or `8080:80/udp`. The arrow notation produced by
    /// [`PortMapping::to_string`] is accepted as well, so parse/display
    /// round-trips. Returns `None` on malformed input.
    pub fn parse(s: &str) -> Option<Self> {
        let (ports, protocol) = match s.split_once('/') {
            Some((p, proto)) => (p, Protocol::from_str_lossy(proto)),
            None => (s, Protocol::Tcp),
        };

        let parts: Vec<&str> = ports.split(|c| c == ':' || c == '→').collect();
        match parts.as_slice() {
            [port] => {
                let port = port.trim().parse().ok()?;
                Some(PortMapping {
                    host_ip: None,
                    host_port: port,
                    container_port: port,
                    protocol,
                })
            }
            [host, container] => Some(PortMapping {
                host_ip: None,
                host_port: host.trim().parse().ok()?,
                container_port: container.trim().parse().ok()?,
                protocol,
            }),
            [ip, host, container] => Some(PortMapping {
                host_ip: Some(ip.trim().to_string()),
                host_port: host.trim().parse().ok()?,
                container_port: container.trim().parse().ok()?,
                protocol,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host_port == self.container_port {
            write!(f, "{}", self.host_port)?;
        } else {
            write!(f, "{}→{}", self.host_port, self.container_port)?;
        }
        if self.protocol != Protocol::Tcp {
            write!(f, "/{}", self.protocol.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_port() {
        assert_eq!(
            PortMapping::parse("8080"),
            Some(PortMapping::tcp(8080, 8080))
        );
    }

    #[test]
    fn test_parse_host_container() {
        assert_eq!(
            PortMapping::parse("8080:80"),
            Some(PortMapping::tcp(8080, 80))
        );
    }

    #[test]
    fn test_parse_with_host_ip() {
        assert_eq!(
            PortMapping::parse("127.0.0.1:8080:80"),
            Some(PortMapping {
                host_ip: Some("127.0.0.1".to_string()),
                host_port: 8080,
                container_port: 80,
                protocol: Protocol::Tcp,
            })
        );
    }

    #[test]
    fn test_parse_udp() {
        assert_eq!(
            PortMapping::parse("8080:80/udp"),
            Some(PortMapping {
                host_ip: None,
                host_port: 8080,
                container_port: 80,
                protocol: Protocol::Udp,
            })
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(PortMapping::parse("notaport"), None);
        assert_eq!(PortMapping::parse("80:80:80:80"), None);
        assert_eq!(PortMapping::parse("1:two"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(PortMapping::tcp(8080, 8080).to_string(), "8080");
        assert_eq!(PortMapping::tcp(8080, 80).to_string(), "8080→80");
        let udp = PortMapping {
            protocol: Protocol::Udp,
            ..PortMapping::tcp(8080, 80)
        };
        assert_eq!(udp.to_string(), "8080→80/udp");
    }

    #[test]
    fn test_parse_display_round_trip() {
        for input in ["8080", "8080:80", "8080:80/udp", "53:53/udp"] {
            let first = PortMapping::parse(input).unwrap();
            let second = PortMapping::parse(&first.to_string()).unwrap();
            assert_eq!(first.host_port, second.host_port);
            assert_eq!(first.container_port, second.container_port);
            assert_eq!(first.protocol, second.protocol);
        }
    }
}
