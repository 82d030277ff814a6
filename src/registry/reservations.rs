//! Static reservations file.
//!
//! One reservation per line, `mac,ip[,type]`. Blank lines and lines starting
//! with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use macaddr::MacAddr6;

use crate::domain::MachineType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub mac: MacAddr6,
    pub ip: Ipv4Addr,
    pub machine_type: MachineType,
}

/// Parse a single `mac,ip[,type]` line.
pub fn parse_reservation_line(line: &str) -> Result<Reservation> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(anyhow!("Invalid reservation line: {}", line));
    }

    let mac: MacAddr6 = parts[0]
        .parse()
        .map_err(|_| anyhow!("Invalid MAC address: {}", parts[0]))?;
    let ip: Ipv4Addr = parts[1]
        .parse()
        .with_context(|| format!("Invalid IP address: {}", parts[1]))?;
    if ip.is_unspecified() || ip.is_broadcast() {
        return Err(anyhow!("Unusable IP address: {}", ip));
    }
    let machine_type = match parts.get(2) {
        Some(t) => t
            .parse()
            .map_err(|t| anyhow!("Invalid machine type: {}", t))?,
        None => MachineType::Reserved,
    };

    Ok(Reservation {
        mac,
        ip,
        machine_type,
    })
}

/// Read all reservations from `path`, rejecting duplicate MACs or addresses.
pub fn load_reservations(path: &Path) -> Result<Vec<Reservation>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open reservations file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut reservations: Vec<Reservation> = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let reservation = parse_reservation_line(line)
            .with_context(|| format!("{}:{}", path.display(), number + 1))?;

        if reservations.iter().any(|r| r.mac == reservation.mac) {
            return Err(anyhow!("Duplicate reservation for {}", reservation.mac));
        }
        if reservations.iter().any(|r| r.ip == reservation.ip) {
            return Err(anyhow!("Address {} reserved twice", reservation.ip));
        }
        reservations.push(reservation);
    }

    Ok(reservations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    mod parse_line_tests {
        use super::*;

        #[test]
        fn valid_line() {
            let r = parse_reservation_line("aa:bb:cc:dd:ee:ff,10.0.0.5").unwrap();
            assert_eq!(r.mac, MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff));
            assert_eq!(r.ip, Ipv4Addr::new(10, 0, 0, 5));
            assert_eq!(r.machine_type, MachineType::Reserved);
        }

        #[test]
        fn valid_line_with_type_and_spaces() {
            let r = parse_reservation_line("AA:BB:CC:DD:EE:FF , 10.0.0.5 , dynamic").unwrap();
            assert_eq!(r.machine_type, MachineType::Dynamic);
        }

        #[test]
        fn invalid_mac() {
            assert!(parse_reservation_line("aa:bb:cc,10.0.0.5").is_err());
        }

        #[test]
        fn invalid_ip() {
            assert!(parse_reservation_line("aa:bb:cc:dd:ee:ff,10.0.0").is_err());
            assert!(parse_reservation_line("aa:bb:cc:dd:ee:ff,0.0.0.0").is_err());
        }

        #[test]
        fn invalid_field_count() {
            assert!(parse_reservation_line("aa:bb:cc:dd:ee:ff").is_err());
            assert!(parse_reservation_line("aa:bb:cc:dd:ee:ff,10.0.0.5,reserved,x").is_err());
        }

        #[test]
        fn invalid_type() {
            assert!(parse_reservation_line("aa:bb:cc:dd:ee:ff,10.0.0.5,static").is_err());
        }
    }

    mod load_tests {
        use super::*;

        fn write_file(content: &str) -> NamedTempFile {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(content.as_bytes()).unwrap();
            file
        }

        #[test]
        fn loads_entries_skipping_comments() {
            let file = write_file(
                "# rack 1\naa:bb:cc:dd:ee:01,10.0.0.11\n\naa:bb:cc:dd:ee:02,10.0.0.12,reserved\n",
            );
            let reservations = load_reservations(file.path()).unwrap();
            assert_eq!(reservations.len(), 2);
            assert_eq!(reservations[1].ip, Ipv4Addr::new(10, 0, 0, 12));
        }

        #[test]
        fn rejects_duplicate_mac() {
            let file = write_file("aa:bb:cc:dd:ee:01,10.0.0.11\naa:bb:cc:dd:ee:01,10.0.0.12\n");
            assert!(load_reservations(file.path()).is_err());
        }

        #[test]
        fn rejects_duplicate_ip() {
            let file = write_file("aa:bb:cc:dd:ee:01,10.0.0.11\naa:bb:cc:dd:ee:02,10.0.0.11\n");
            assert!(load_reservations(file.path()).is_err());
        }

        #[test]
        fn reports_line_number() {
            let file = write_file("aa:bb:cc:dd:ee:01,10.0.0.11\nbogus\n");
            let err = load_reservations(file.path()).unwrap_err();
            assert!(format!("{err:#}").contains(":2"));
        }

        #[test]
        fn missing_file() {
            assert!(load_reservations(Path::new("/nonexistent/reservations")).is_err());
        }
    }
}
