//! Connected-server metadata parsed from the tool's status text.
//!
//! Parsing is field-by-field: a line that is missing or malformed leaves the
//! corresponding field untouched, so one odd line never blanks the rest.

use regex::Regex;
use serde::Serialize;

use crate::patterns::{
    RE_CITY, RE_COUNTRY, RE_CURRENT_SERVER, RE_PROTOCOL, RE_SERVER_IP, RE_TECHNOLOGY, RE_TRANSFER,
    RE_UPTIME,
};

/// Snapshot of the server the tool is connected to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server hostname or id (e.g. `fr812.nordvpn.com`).
    pub server: String,
    pub country: String,
    pub city: String,
    pub ip: String,
    pub technology: String,
    pub protocol: String,
    pub transfer_received: String,
    pub transfer_sent: String,
    pub uptime: String,
}

impl ServerInfo {
    /// Parses a fresh snapshot from status text.
    pub fn from_status(text: &str) -> Self {
        let mut info = Self::default();
        info.update_from_status(text);
        info
    }

    /// Overwrites every field that `text` provides; keeps the others.
    pub fn update_from_status(&mut self, text: &str) {
        if let Some(server) = capture(&RE_CURRENT_SERVER, text) {
            self.server = server;
        }
        if let Some(country) = capture(&RE_COUNTRY, text) {
            self.country = country;
        }
        if let Some(city) = capture(&RE_CITY, text) {
            self.city = city;
        }
        if let Some(ip) = capture(&RE_SERVER_IP, text) {
            self.ip = ip;
        }
        if let Some(technology) = capture(&RE_TECHNOLOGY, text) {
            self.technology = technology;
        }
        if let Some(protocol) = capture(&RE_PROTOCOL, text) {
            self.protocol = protocol;
        }
        if let Some(caps) = RE_TRANSFER.captures(text) {
            self.transfer_received = caps[1].trim().to_string();
            self.transfer_sent = caps[2].trim().to_string();
        }
        if let Some(uptime) = capture(&RE_UPTIME, text) {
            self.uptime = uptime;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Short server id: the hostname up to the first dot (`fr812`).
    pub fn server_id(&self) -> &str {
        self.server.split('.').next().unwrap_or_default()
    }

    /// One-line description for labels and logs.
    pub fn summary(&self) -> String {
        let place = match (self.country.is_empty(), self.city.is_empty()) {
            (false, false) => format!("{}, {}", self.country, self.city),
            (false, true) => self.country.clone(),
            (true, false) => self.city.clone(),
            (true, true) => String::new(),
        };
        match (self.server_id().is_empty(), place.is_empty()) {
            (true, _) => place,
            (false, true) => self.server_id().to_string(),
            (false, false) => format!("{} ({})", self.server_id(), place),
        }
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "\r-\r  \r\rStatus: Connected
Hostname: fr812.nordvpn.com
Current server: fr812.nordvpn.com
Country: France
City: Paris
Server IP: 185.93.2.10
Current technology: NORDLYNX
Current protocol: UDP
Transfer: 1.42 MiB received, 311.05 KiB sent
Uptime: 3 minutes 12 seconds
";

    #[test]
    fn test_parses_all_fields() {
        let info = ServerInfo::from_status(STATUS);
        assert_eq!(info.server, "fr812.nordvpn.com");
        assert_eq!(info.country, "France");
        assert_eq!(info.city, "Paris");
        assert_eq!(info.ip, "185.93.2.10");
        assert_eq!(info.technology, "NORDLYNX");
        assert_eq!(info.protocol, "UDP");
        assert_eq!(info.transfer_received, "1.42 MiB");
        assert_eq!(info.transfer_sent, "311.05 KiB");
        assert_eq!(info.uptime, "3 minutes 12 seconds");
    }

    #[test]
    fn test_malformed_lines_keep_previous_values() {
        let mut info = ServerInfo::from_status(STATUS);
        info.update_from_status("Transfer: garbage\nUptime: 4 minutes\n");
        assert_eq!(info.transfer_received, "1.42 MiB");
        assert_eq!(info.uptime, "4 minutes");
        assert_eq!(info.country, "France");
    }

    #[test]
    fn test_empty_text_yields_empty_info() {
        let info = ServerInfo::from_status("");
        assert!(info.is_empty());
        assert_eq!(info.summary(), "");
    }

    #[test]
    fn test_summary_uses_short_id_and_place() {
        let info = ServerInfo::from_status(STATUS);
        assert_eq!(info.server_id(), "fr812");
        assert_eq!(info.summary(), "fr812 (France, Paris)");
    }
}
