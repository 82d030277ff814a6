//! DHCP option codes produced or consumed by the responder.

use std::fmt;

/// Option codes from RFC 2132, RFC 3442 and RFC 4578.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionCode {
    SubnetMask,
    Router,
    DomainNameServer,
    HostName,
    VendorSpecificInformation,
    RequestedIpAddress,
    IpAddressLeaseTime,
    MessageType,
    ServerIdentifier,
    ParameterRequestList,
    VendorClassIdentifier,
    /// UUID/GUID-based client identifier (PXE)
    ClientMachineIdentifier,
    ClasslessStaticRoute,
    End,
}

impl OptionCode {
    pub const PAD: u8 = 0;

    pub fn as_u8(self) -> u8 {
        match self {
            Self::SubnetMask => 1,
            Self::Router => 3,
            Self::DomainNameServer => 6,
            Self::HostName => 12,
            Self::VendorSpecificInformation => 43,
            Self::RequestedIpAddress => 50,
            Self::IpAddressLeaseTime => 51,
            Self::MessageType => 53,
            Self::ServerIdentifier => 54,
            Self::ParameterRequestList => 55,
            Self::VendorClassIdentifier => 60,
            Self::ClientMachineIdentifier => 97,
            Self::ClasslessStaticRoute => 121,
            Self::End => 255,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::SubnetMask),
            3 => Some(Self::Router),
            6 => Some(Self::DomainNameServer),
            12 => Some(Self::HostName),
            43 => Some(Self::VendorSpecificInformation),
            50 => Some(Self::RequestedIpAddress),
            51 => Some(Self::IpAddressLeaseTime),
            53 => Some(Self::MessageType),
            54 => Some(Self::ServerIdentifier),
            55 => Some(Self::ParameterRequestList),
            60 => Some(Self::VendorClassIdentifier),
            97 => Some(Self::ClientMachineIdentifier),
            121 => Some(Self::ClasslessStaticRoute),
            255 => Some(Self::End),
            _ => None,
        }
    }
}

impl fmt::Display for OptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_u8() {
        for code in [
            OptionCode::SubnetMask,
            OptionCode::Router,
            OptionCode::DomainNameServer,
            OptionCode::HostName,
            OptionCode::VendorSpecificInformation,
            OptionCode::ClientMachineIdentifier,
            OptionCode::ClasslessStaticRoute,
        ] {
            assert_eq!(OptionCode::from_u8(code.as_u8()), Some(code));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(OptionCode::from_u8(200), None);
        assert_eq!(OptionCode::from_u8(OptionCode::PAD), None);
    }
}
