// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Decode the SFF-8472 memory map of SFP transceiver modules.
//!
//! Everything here operates on fixed-size byte pages, with each field decoded
//! explicitly from its offset. Nothing here performs I/O, so the owner of the
//! raw bytes is free to fetch them however the platform requires.

pub mod calibration;
pub mod capability;
pub mod checksum;
pub mod diagnostics;
pub mod ident;
pub mod utils;

pub use calibration::Calibration;
pub use capability::classify;
pub use capability::CapabilityDescriptor;
pub use capability::Classification;
pub use capability::VendorLookup;
pub use checksum::ChecksumRegion;
pub use diagnostics::DiagnosticMap;
pub use diagnostics::Monitor;
pub use ident::InterfaceIdMap;

use sfp_types::Region;
use thiserror::Error;

/// A single page of module memory, as held by a device model.
pub type Page = [u8; Region::PAGE_SIZE];

/// An error related to decoding a transceiver memory map.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum Error {
    #[error(
        "{region} checksum mismatch: expected 0x{expected:02x}, \
        computed 0x{computed:02x}"
    )]
    ChecksumMismatch {
        region: ChecksumRegion,
        expected: u8,
        computed: u8,
    },

    #[error("Buffer for region {region} is too short: {len} bytes, need at least {needed}")]
    BufferTooShort {
        region: Region,
        len: usize,
        needed: usize,
    },

    #[error("No speed capability detected from compliance codes or vendor database")]
    NoCapabilityDetected,

    #[error("Invalid value")]
    Types(#[from] sfp_types::Error),
}

/// Return the minimum number of bytes that must be supplied when loading a
/// region.
///
/// The interface ID and diagnostic regions must cover their check codes, and
/// the diagnostic region must also include the live readings that follow it.
pub const fn required_len(region: Region) -> usize {
    match region {
        Region::InterfaceId => 96,
        Region::Diagnostic => diagnostics::READINGS_END,
        Region::CopperPhy => 0,
    }
}

/// Copy `buf` into a zero-filled page for `region`.
///
/// The buffer must be at least [`required_len`] bytes, and must fit in a
/// page.
pub fn to_page(region: Region, buf: &[u8]) -> Result<Page, Error> {
    let needed = required_len(region);
    if buf.len() < needed {
        return Err(Error::BufferTooShort {
            region,
            len: buf.len(),
            needed,
        });
    }
    if buf.len() > Region::PAGE_SIZE {
        return Err(sfp_types::Error::InvalidMemoryAccess {
            region,
            len: buf.len(),
        }
        .into());
    }
    let mut page = [0; Region::PAGE_SIZE];
    page[..buf.len()].copy_from_slice(buf);
    Ok(page)
}
