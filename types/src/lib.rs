// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]

//! Shared vocabulary for managing SFP transceiver modules.
//!
//! These types are used both by the decoding of the SFF-8472 memory map and
//! by the hardware abstraction that owns the modules' state.

pub mod port;
pub mod region;
pub mod speed;
pub mod threshold;

pub use port::PortMask;
pub use region::Region;
pub use speed::Medium;
pub use speed::Speed;
pub use speed::SpeedCapabilities;
pub use threshold::ThresholdKind;

use serde::Deserialize;
use serde::Serialize;

/// An error referencing an invalid enumerated value or access.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[cfg_attr(any(test, feature = "std"), derive(thiserror::Error))]
pub enum Error {
    /// A memory region tag that is not one of 0xA0, 0xA2 or 0xAC.
    InvalidRegion(u8),

    /// A threshold kind outside of the four alarm / warning levels.
    InvalidThresholdKind(u8),

    /// A speed outside of the supported set.
    InvalidSpeed(u8),

    /// An attempt to reference an invalid transceiver port.
    InvalidPort(u8),

    /// An access larger than the region it addresses.
    InvalidMemoryAccess { region: Region, len: usize },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::InvalidRegion(x) => write!(f, "Invalid memory region: 0x{x:02x}"),
            Error::InvalidThresholdKind(x) => write!(f, "Invalid threshold kind: {x}"),
            Error::InvalidSpeed(x) => write!(f, "Invalid speed: {x}"),
            Error::InvalidPort(x) => write!(f, "Invalid transceiver port: {x}"),
            Error::InvalidMemoryAccess { region, len } => {
                write!(f, "Invalid access of {len} bytes to region {region}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use super::Region;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidRegion(0xff).to_string(),
            "Invalid memory region: 0xff"
        );
        assert_eq!(
            Error::InvalidMemoryAccess {
                region: Region::Diagnostic,
                len: 300
            }
            .to_string(),
            "Invalid access of 300 bytes to region 0xA2 (diagnostics)"
        );
    }
}
