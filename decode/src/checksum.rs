// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Validate the check codes of the SFF-8472 memory map.
//!
//! Each check code is the low 8 bits of the sum of a contiguous range of bytes,
//! stored in the byte immediately following that range. See SFF-8472 rev 12.4
//! sections 8.12 and 8.13 (CC_BASE and CC_EXT) and section 9.5 (CC_DMI).

use crate::Error;
use sfp_types::Region;
use std::fmt;
use std::ops::RangeInclusive;

/// One of the three check-coded areas of the memory map.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
#[cfg_attr(any(feature = "api-traits", test), serde(rename_all = "snake_case"))]
pub enum ChecksumRegion {
    /// The base ID fields, bytes 0-62 of `0xA0`.
    Base,
    /// The extended ID fields, bytes 64-94 of `0xA0`.
    Extended,
    /// The diagnostic thresholds and calibration constants, bytes 0-94 of
    /// `0xA2`.
    Diagnostic,
}

impl ChecksumRegion {
    /// Return the memory region holding the checked bytes.
    pub const fn region(&self) -> Region {
        match self {
            ChecksumRegion::Base | ChecksumRegion::Extended => Region::InterfaceId,
            ChecksumRegion::Diagnostic => Region::Diagnostic,
        }
    }

    /// Return the range of bytes that are summed.
    pub const fn range(&self) -> RangeInclusive<usize> {
        match self {
            ChecksumRegion::Base => 0..=62,
            ChecksumRegion::Extended => 64..=94,
            ChecksumRegion::Diagnostic => 0..=94,
        }
    }

    /// Return the offset of the byte holding the expected sum.
    pub const fn checksum_offset(&self) -> usize {
        match self {
            ChecksumRegion::Base => 63,
            ChecksumRegion::Extended | ChecksumRegion::Diagnostic => 95,
        }
    }

    /// Compute the check code over `buf`.
    ///
    /// The caller must ensure `buf` covers the summed range.
    fn compute(&self, buf: &[u8]) -> u8 {
        buf[self.range()]
            .iter()
            .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
    }

    /// Validate the check code of this area in `buf`.
    pub fn validate(&self, buf: &[u8]) -> Result<(), Error> {
        let needed = self.checksum_offset() + 1;
        if buf.len() < needed {
            return Err(Error::BufferTooShort {
                region: self.region(),
                len: buf.len(),
                needed,
            });
        }
        let expected = buf[self.checksum_offset()];
        let computed = self.compute(buf);
        if expected == computed {
            Ok(())
        } else {
            Err(Error::ChecksumMismatch {
                region: *self,
                expected,
                computed,
            })
        }
    }
}

impl fmt::Display for ChecksumRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChecksumRegion::Base => write!(f, "Base ID"),
            ChecksumRegion::Extended => write!(f, "Extended ID"),
            ChecksumRegion::Diagnostic => write!(f, "Diagnostic"),
        }
    }
}

/// Validate the base ID check code, bytes 0-62 against byte 63.
pub fn validate_base_region(buf: &[u8]) -> Result<(), Error> {
    ChecksumRegion::Base.validate(buf)
}

/// Validate the extended ID check code, bytes 64-94 against byte 95.
pub fn validate_extended_region(buf: &[u8]) -> Result<(), Error> {
    ChecksumRegion::Extended.validate(buf)
}

/// Validate the diagnostic check code, bytes 0-94 against byte 95.
pub fn validate_diagnostic_region(buf: &[u8]) -> Result<(), Error> {
    ChecksumRegion::Diagnostic.validate(buf)
}

/// Validate every check code covering `region`.
///
/// The copper PHY region carries no check code, and always passes.
pub fn validate_region(region: Region, buf: &[u8]) -> Result<(), Error> {
    match region {
        Region::InterfaceId => {
            validate_base_region(buf)?;
            validate_extended_region(buf)
        }
        Region::Diagnostic => validate_diagnostic_region(buf),
        Region::CopperPhy => Ok(()),
    }
}

/// Recompute and store every check code covering `region` in `buf`.
///
/// This is mostly useful for building memory images, e.g., for tests or for
/// replaying edited dumps.
pub fn fill_checksums(region: Region, buf: &mut [u8]) -> Result<(), Error> {
    let areas: &[ChecksumRegion] = match region {
        Region::InterfaceId => &[ChecksumRegion::Base, ChecksumRegion::Extended],
        Region::Diagnostic => &[ChecksumRegion::Diagnostic],
        Region::CopperPhy => &[],
    };
    for area in areas {
        let needed = area.checksum_offset() + 1;
        if buf.len() < needed {
            return Err(Error::BufferTooShort {
                region,
                len: buf.len(),
                needed,
            });
        }
        let sum = area.compute(buf);
        buf[area.checksum_offset()] = sum;
    }
    Ok(())
}
