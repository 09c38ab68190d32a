// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The addressable EEPROM regions of an SFP module.

use crate::Error;
use serde::Deserialize;
use serde::Serialize;

/// One of the three memory regions exposed by an SFP module.
///
/// SFF-8472 defines two 2-wire serial addresses. `0xA0` holds the serial
/// interface ID data, which identifies the module and its capabilities.
/// `0xA2` holds the digital diagnostic monitoring data: alarm and warning
/// thresholds, external calibration constants, and the live sensor readings.
///
/// Copper modules with an integrated PHY additionally expose the PHY's
/// configuration registers at `0xAC`. That region is platform- and
/// PHY-specific, and is treated as opaque bytes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[cfg_attr(feature = "std", derive(clap::ValueEnum))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Serial interface ID memory, address `0xA0`.
    #[cfg_attr(feature = "std", value(alias = "a0"))]
    InterfaceId,
    /// Diagnostic monitoring memory, address `0xA2`.
    #[cfg_attr(feature = "std", value(alias = "a2"))]
    Diagnostic,
    /// Copper PHY configuration memory, address `0xAC`.
    #[cfg_attr(feature = "std", value(alias = "ac"))]
    CopperPhy,
}

impl Region {
    /// The size of the buffer held for each region.
    pub const PAGE_SIZE: usize = 128;

    /// All regions, in address order.
    pub const ALL: [Region; 3] = [Region::InterfaceId, Region::Diagnostic, Region::CopperPhy];

    /// Return the 2-wire serial address of the region.
    pub const fn address(&self) -> u8 {
        match self {
            Region::InterfaceId => 0xa0,
            Region::Diagnostic => 0xa2,
            Region::CopperPhy => 0xac,
        }
    }

    /// Return the number of bytes fetched from a module when refreshing the
    /// region.
    pub const fn read_len(&self) -> usize {
        match self {
            Region::InterfaceId | Region::Diagnostic => Self::PAGE_SIZE,
            Region::CopperPhy => Self::PAGE_SIZE / 2,
        }
    }
}

impl TryFrom<u8> for Region {
    type Error = Error;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            0xa0 => Ok(Region::InterfaceId),
            0xa2 => Ok(Region::Diagnostic),
            0xac => Ok(Region::CopperPhy),
            _ => Err(Error::InvalidRegion(x)),
        }
    }
}

impl From<Region> for u8 {
    fn from(r: Region) -> Self {
        r.address()
    }
}

impl core::fmt::Display for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let name = match self {
            Region::InterfaceId => "interface ID",
            Region::Diagnostic => "diagnostics",
            Region::CopperPhy => "copper PHY",
        };
        write!(f, "0x{:02X} ({name})", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::Region;
    use crate::Error;

    #[test]
    fn test_region_from_address() {
        for region in Region::ALL {
            assert_eq!(Region::try_from(region.address()).unwrap(), region);
            assert_eq!(u8::from(region), region.address());
        }
        assert_eq!(Region::try_from(0xff), Err(Error::InvalidRegion(0xff)));
        assert_eq!(Region::try_from(0xa1), Err(Error::InvalidRegion(0xa1)));
    }

    #[test]
    fn test_region_read_len() {
        assert_eq!(Region::InterfaceId.read_len(), 128);
        assert_eq!(Region::Diagnostic.read_len(), 128);
        assert_eq!(Region::CopperPhy.read_len(), 64);
    }

    #[test]
    fn test_region_serdes() {
        let s = "\"copper_phy\"";
        assert_eq!(serde_json::to_string(&Region::CopperPhy).unwrap(), s);
        assert_eq!(
            serde_json::from_str::<Region>(s).unwrap(),
            Region::CopperPhy
        );
    }

    #[test]
    fn test_region_value_enum_alias() {
        use clap::ValueEnum;
        assert_eq!(
            Region::from_str("a2", true).unwrap(),
            Region::Diagnostic
        );
        assert_eq!(
            Region::from_str("interface-id", true).unwrap(),
            Region::InterfaceId
        );
    }
}
