// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! A database of vendor parts with known capabilities.
//!
//! Some modules advertise no compliance codes, or the wrong ones: copper
//! modules without a built-in PHY, TDM-over-SFP adapters, or multi-rate parts.
//! Listing them here by part number overrides whatever their memory claims.

use crate::Error;
use sfp_decode::CapabilityDescriptor;
use sfp_decode::VendorLookup;
use sfp_types::SpeedCapabilities;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

const M10: SpeedCapabilities = SpeedCapabilities::SPEED_10M;
const M100: SpeedCapabilities = SpeedCapabilities::SPEED_100M;
const G1: SpeedCapabilities = SpeedCapabilities::SPEED_1G;
const ALL_SPEEDS: SpeedCapabilities = SpeedCapabilities::all();

const fn copper(speeds: SpeedCapabilities) -> CapabilityDescriptor {
    CapabilityDescriptor {
        speeds,
        fiber: false,
        tx_wavelength_nm: 0,
        rx_wavelength_nm: 0,
    }
}

const fn fiber(speeds: SpeedCapabilities, tx: u16, rx: u16) -> CapabilityDescriptor {
    CapabilityDescriptor {
        speeds,
        fiber: true,
        tx_wavelength_nm: tx,
        rx_wavelength_nm: rx,
    }
}

const KNOWN_MODULES: &[(&str, CapabilityDescriptor)] = &[
    // 1000BASE-T copper.
    ("HBCU-5710R", copper(G1)),
    ("AS-1TX", copper(G1)),
    ("FCLF8521P2BTL", copper(G1)),
    ("7SV-001", copper(G1)),
    ("7SV-000", copper(M10.union(M100).union(G1))),
    ("7SV-000-AS", copper(M10.union(M100).union(G1))),
    // CWDM.
    ("FWDM-16217D47", fiber(G1, 1470, 1470)),
    ("FWDM-16217D49", fiber(G1, 1490, 1490)),
    ("FWDM-16217D51", fiber(G1, 1510, 1510)),
    ("FWDM-16217D53", fiber(G1, 1530, 1530)),
    ("FWDM-16217D55", fiber(G1, 1550, 1550)),
    ("FWDM-16217D57", fiber(G1, 1570, 1570)),
    ("FWDM-16217D59", fiber(G1, 1590, 1590)),
    ("FWDM-16217D61", fiber(G1, 1610, 1610)),
    ("FWLF-1631-", fiber(G1, 0, 0)),
    ("FWLF163131-CY", fiber(G1, 1552, 1552)),
    // TDM over SFP.
    ("MiRICi-FE-T3", fiber(M100, 0, 0)),
    ("MiRICi-GE-T3", fiber(G1, 0, 0)),
    ("MiRIi-GET3", fiber(G1, 0, 0)),
    ("MiTOP-FE-T1", fiber(M100, 0, 0)),
    ("MiTOP-FE-E1", fiber(M100, 0, 0)),
    ("MiTOP-FE-T3", fiber(M100, 0, 0)),
    ("MiTOP-FE-E3", fiber(M100, 0, 0)),
    ("MiTOP-GE-T3", fiber(G1, 0, 0)),
    ("MiTOP-GE-E3", fiber(G1, 0, 0)),
    ("XCVR-TDM3GE", fiber(G1, 0, 0)),
    // Multi-mode, single-mode and bidirectional optics.
    ("7SM-000", fiber(G1, 850, 850)),
    ("7SN-000", fiber(G1, 1310, 1310)),
    ("7SZ-000", fiber(G1, 1490, 1310)),
    ("7SY-000", fiber(G1, 1310, 1490)),
    ("7SA-000", fiber(M100, 1310, 1310)),
    ("GLC-BX-D-C", fiber(G1, 1490, 1310)),
    ("GLC-BX-U-C", fiber(G1, 1310, 1490)),
    ("GLC-BX-D40+-SO", fiber(G1, 1490, 1310)),
    ("GLC-BX-U40+-SO", fiber(G1, 1310, 1490)),
    ("TRP148KL2I00040G", fiber(G1, 1531, 1531)),
    // Copper pigtails run at any rate. They have no PHY, and so are treated
    // like optics.
    ("SFPP30-01", fiber(ALL_SPEEDS, 256, 256)),
    ("SFPP30-001", fiber(ALL_SPEEDS, 256, 256)),
    ("SFPP30-002", fiber(ALL_SPEEDS, 256, 256)),
];

/// A read-mostly table of vendor parts, keyed by exact part number.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VendorDatabase {
    entries: BTreeMap<String, CapabilityDescriptor>,
}

impl VendorDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a database holding every part known to need an override.
    pub fn with_known_modules() -> Self {
        let entries = KNOWN_MODULES
            .iter()
            .map(|(part, desc)| (String::from(*part), *desc))
            .collect();
        Self { entries }
    }

    /// Insert a new part.
    ///
    /// Existing entries are never replaced. Inserting a part number which is
    /// already present is an error, and leaves the original entry in place.
    pub fn insert(
        &mut self,
        part_number: impl Into<String>,
        desc: CapabilityDescriptor,
    ) -> Result<(), Error> {
        match self.entries.entry(part_number.into()) {
            Entry::Occupied(e) => Err(Error::Config(format!(
                "part '{}' is already in the vendor database",
                e.key()
            ))),
            Entry::Vacant(e) => {
                e.insert(desc);
                Ok(())
            }
        }
    }

    /// Remove a part, returning true if it was present.
    pub fn remove(&mut self, part_number: &str) -> bool {
        self.entries.remove(part_number).is_some()
    }

    pub fn get(&self, part_number: &str) -> Option<&CapabilityDescriptor> {
        self.entries.get(part_number)
    }

    /// Iterate over all entries, ordered by part number.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CapabilityDescriptor)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VendorLookup for VendorDatabase {
    fn lookup(&self, part_number: &str) -> Option<CapabilityDescriptor> {
        self.get(part_number).copied()
    }
}
