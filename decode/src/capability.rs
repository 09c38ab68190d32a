// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Classify the link speeds and medium a module supports.

use crate::ident::ComplianceCodes;
use crate::ident::InterfaceIdMap;
use crate::Error;
use sfp_types::Medium;
use sfp_types::Speed;
use sfp_types::SpeedCapabilities;

/// The 4B/5B bit of the encoding byte.
pub const ENCODING_4B5B: u8 = 0x02;

/// The lowest nominal bit rate, in units of 100 Mbit/s, of a 10G module.
pub const BIT_RATE_10G_MIN: u8 = 0x64;

/// The nominal bit rates of BASE-BX modules that run at 1G.
pub const BIT_RATE_BX_1G: [u8; 3] = [0x0a, 0x0c, 0x0d];

/// The nominal bit rate of 100M modules.
pub const BIT_RATE_100M: u8 = 0x01;

/// The known capabilities of a specific vendor part.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct CapabilityDescriptor {
    pub speeds: SpeedCapabilities,
    /// True if the part is a fibre module, false if copper.
    pub fiber: bool,
    /// The transmit wavelength in nm, or zero if not applicable.
    pub tx_wavelength_nm: u16,
    /// The receive wavelength in nm, or zero if not applicable.
    pub rx_wavelength_nm: u16,
}

impl CapabilityDescriptor {
    pub const fn medium(&self) -> Medium {
        if self.fiber {
            Medium::Fiber
        } else {
            Medium::Copper
        }
    }
}

/// A source of known vendor part capabilities.
///
/// Known parts override whatever their compliance codes claim, which lets
/// modules with missing or wrong codes be classified correctly.
pub trait VendorLookup {
    /// Look up a part by its exact, trimmed part number.
    fn lookup(&self, part_number: &str) -> Option<CapabilityDescriptor>;
}

impl<T: VendorLookup + ?Sized> VendorLookup for &T {
    fn lookup(&self, part_number: &str) -> Option<CapabilityDescriptor> {
        (**self).lookup(part_number)
    }
}

/// The result of classifying a module.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct Classification {
    pub speeds: SpeedCapabilities,
    pub medium: Medium,
    /// The vendor database entry that determined the result, if any.
    #[cfg_attr(
        any(feature = "api-traits", test),
        serde(skip_serializing_if = "Option::is_none", default)
    )]
    pub database_match: Option<CapabilityDescriptor>,
}

impl Classification {
    /// Return true if the vendor database determined the result.
    pub const fn matched(&self) -> bool {
        self.database_match.is_some()
    }
}

/// Derive the supported speeds and medium from raw compliance codes.
///
/// 10M is never derived here, since no compliance code describes it. It can
/// only come from a vendor database entry.
pub fn classify_compliance(
    codes: &ComplianceCodes,
    encoding: u8,
    bit_rate: u8,
) -> (SpeedCapabilities, Medium) {
    let mut speeds = SpeedCapabilities::empty();
    let mut medium = Medium::Fiber;
    let ethernet = codes.ethernet();
    let bx = ethernet & ComplianceCodes::ETH_BASE_BX10 != 0;

    if codes.ethernet_10g() & ComplianceCodes::ETH_10G_MASK != 0 || bit_rate >= BIT_RATE_10G_MIN {
        speeds |= SpeedCapabilities::from_speed(Speed::Speed10G);
    }

    if ethernet & (ComplianceCodes::ETH_1000BASE_SX | ComplianceCodes::ETH_1000BASE_LX) != 0
        || (bx && BIT_RATE_BX_1G.contains(&bit_rate))
    {
        speeds |= SpeedCapabilities::from_speed(Speed::Speed1G);
    }
    if ethernet & ComplianceCodes::ETH_1000BASE_T != 0 {
        speeds |= SpeedCapabilities::from_speed(Speed::Speed1G);
        medium = Medium::Copper;
    }

    if codes.sonet() & ComplianceCodes::SONET_OC3_MASK != 0
        || ethernet & (ComplianceCodes::ETH_100BASE_FX | ComplianceCodes::ETH_100BASE_LX) != 0
        || (bx && bit_rate == BIT_RATE_100M)
        || (encoding & ENCODING_4B5B != 0 && bit_rate == BIT_RATE_100M)
    {
        speeds |= SpeedCapabilities::from_speed(Speed::Speed100M);
    }

    (speeds, medium)
}

/// Classify a module from its interface ID memory.
///
/// A vendor database entry for the module's part number is authoritative.
/// Otherwise the compliance codes are used, and it is an error if they
/// describe no speed at all.
pub fn classify<L: VendorLookup + ?Sized>(
    map: &InterfaceIdMap<'_>,
    db: &L,
) -> Result<Classification, Error> {
    if let Some(entry) = db.lookup(&map.part_number()) {
        return Ok(Classification {
            speeds: entry.speeds,
            medium: entry.medium(),
            database_match: Some(entry),
        });
    }
    let (speeds, medium) = classify_compliance(
        &map.compliance_codes(),
        map.encoding_code(),
        map.nominal_bit_rate(),
    );
    if speeds.is_empty() {
        return Err(Error::NoCapabilityDetected);
    }
    Ok(Classification {
        speeds,
        medium,
        database_match: None,
    })
}

#[cfg(test)]
mod tests {
    use super::classify;
    use super::CapabilityDescriptor;
    use super::Classification;
    use super::VendorLookup;
    use crate::ident::InterfaceIdMap;
    use crate::Error;
    use crate::Page;
    use sfp_types::Medium;
    use sfp_types::Speed;
    use sfp_types::SpeedCapabilities;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct FakeDatabase(BTreeMap<String, CapabilityDescriptor>);

    impl VendorLookup for FakeDatabase {
        fn lookup(&self, part_number: &str) -> Option<CapabilityDescriptor> {
            self.0.get(part_number).copied()
        }
    }

    // Build a page with the Ethernet compliance bytes 3, 5 and 6, the
    // encoding and the nominal bit rate.
    fn page(byte3: u8, byte5: u8, byte6: u8, encoding: u8, bit_rate: u8) -> Page {
        let mut page = [0; 128];
        page[3] = byte3;
        page[5] = byte5;
        page[6] = byte6;
        page[11] = encoding;
        page[12] = bit_rate;
        page[40..56].copy_from_slice(b"TEST-PART       ");
        page
    }

    fn speeds_of(page: &Page) -> Result<Classification, Error> {
        classify(&InterfaceIdMap::new(page), &FakeDatabase::default())
    }

    #[test]
    fn test_10gbase_sr_is_10g_fiber() {
        let c = speeds_of(&page(0x10, 0, 0, 0, 0)).unwrap();
        assert_eq!(c.speeds, SpeedCapabilities::from_speed(Speed::Speed10G));
        assert_eq!(c.speeds.to_flags(), [false, false, false, true]);
        assert_eq!(c.medium, Medium::Fiber);
        assert!(!c.matched());
    }

    #[test]
    fn test_10g_from_bit_rate() {
        let c = speeds_of(&page(0, 0, 0, 0, 0x67)).unwrap();
        assert!(c.speeds.supports(Speed::Speed10G));
        assert!(speeds_of(&page(0, 0, 0, 0, 0x63)).is_err());
    }

    #[test]
    fn test_1000base_t_is_copper() {
        let c = speeds_of(&page(0, 0, 0x08, 0, 0x0c)).unwrap();
        assert_eq!(c.speeds, SpeedCapabilities::from_speed(Speed::Speed1G));
        assert_eq!(c.medium, Medium::Copper);
    }

    #[test]
    fn test_1g_fiber() {
        for byte6 in [0x01, 0x02] {
            let c = speeds_of(&page(0, 0, byte6, 0, 0)).unwrap();
            assert_eq!(c.speeds, SpeedCapabilities::from_speed(Speed::Speed1G));
            assert_eq!(c.medium, Medium::Fiber);
        }
    }

    #[test]
    fn test_bx_depends_on_bit_rate() {
        for rate in [0x0a, 0x0c, 0x0d] {
            let c = speeds_of(&page(0, 0, 0x40, 0, rate)).unwrap();
            assert_eq!(c.speeds, SpeedCapabilities::from_speed(Speed::Speed1G));
        }
        let c = speeds_of(&page(0, 0, 0x40, 0, 0x01)).unwrap();
        assert_eq!(c.speeds, SpeedCapabilities::from_speed(Speed::Speed100M));
        assert_eq!(
            speeds_of(&page(0, 0, 0x40, 0, 0x0b)),
            Err(Error::NoCapabilityDetected)
        );
    }

    #[test]
    fn test_100m_sources() {
        let expected = SpeedCapabilities::from_speed(Speed::Speed100M);
        // SONET OC-3.
        for byte5 in [0x01, 0x02, 0x04] {
            assert_eq!(speeds_of(&page(0, byte5, 0, 0, 0)).unwrap().speeds, expected);
        }
        // OC-12 is not classified.
        assert!(speeds_of(&page(0, 0x10, 0, 0, 0)).is_err());
        // 100BASE-FX and -LX.
        for byte6 in [0x20, 0x10] {
            assert_eq!(speeds_of(&page(0, 0, byte6, 0, 0)).unwrap().speeds, expected);
        }
        // 4B/5B encoding at 100 Mbit/s.
        assert_eq!(speeds_of(&page(0, 0, 0, 0x02, 0x01)).unwrap().speeds, expected);
        assert!(speeds_of(&page(0, 0, 0, 0x02, 0x02)).is_err());
    }

    #[test]
    fn test_multiple_speeds() {
        let c = speeds_of(&page(0x20, 0x01, 0x01, 0, 0)).unwrap();
        assert_eq!(
            c.speeds.speeds().collect::<Vec<_>>(),
            vec![Speed::Speed100M, Speed::Speed1G, Speed::Speed10G]
        );
    }

    #[test]
    fn test_no_capability_detected() {
        assert_eq!(
            speeds_of(&page(0, 0, 0, 0, 0)),
            Err(Error::NoCapabilityDetected)
        );
    }

    #[test]
    fn test_database_overrides_compliance_codes() {
        let entry = CapabilityDescriptor {
            speeds: SpeedCapabilities::SPEED_10M
                | SpeedCapabilities::SPEED_100M
                | SpeedCapabilities::SPEED_1G,
            fiber: false,
            tx_wavelength_nm: 0,
            rx_wavelength_nm: 0,
        };
        let mut db = FakeDatabase::default();
        db.0.insert(String::from("TEST-PART"), entry);

        let page = page(0x10, 0, 0, 0, 0);
        let c = classify(&InterfaceIdMap::new(&page), &db).unwrap();
        assert_eq!(c.speeds, entry.speeds);
        assert!(c.speeds.supports(Speed::Speed10M));
        assert_eq!(c.medium, Medium::Copper);
        assert_eq!(c.database_match, Some(entry));
    }

    #[test]
    fn test_database_match_with_no_speeds_succeeds() {
        let entry = CapabilityDescriptor {
            fiber: true,
            ..Default::default()
        };
        let mut db = FakeDatabase::default();
        db.0.insert(String::from("TEST-PART"), entry);
        let page = page(0, 0, 0, 0, 0);
        let c = classify(&InterfaceIdMap::new(&page), &db).unwrap();
        assert!(c.speeds.is_empty());
        assert!(c.matched());
    }

    #[test]
    fn test_classification_serdes() {
        let c = speeds_of(&page(0, 0, 0x08, 0, 0)).unwrap();
        let s = serde_json::to_string(&c).unwrap();
        assert!(!s.contains("database_match"));
        assert_eq!(serde_json::from_str::<Classification>(&s).unwrap(), c);
    }
}
