use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Binding {
    pub ip: String,
    pub port: u16,
}

impl Binding {
    pub fn new() -> Self {
        Binding {
            ip: "0.0.0.0".to_string(),
            port: 8080,
        }
    }

    pub fn sanitize(&mut self) {
        self.ip = self.ip.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.ip.is_empty() {
            errors.push("IP address cannot be empty".to_string());
        } else if self.ip.parse::<IpAddr>().is_err() {
            errors.push(format!("Invalid IP address: {}", self.ip));
        }

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn get_socket_addr(&self) -> Option<SocketAddr> {
        self.ip.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, self.port))
    }
}

impl Default for Binding {
    fn default() -> Self {
        Self::new()
    }
}
