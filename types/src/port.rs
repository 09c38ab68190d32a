// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Types used to address the SFP cages of a platform.

use crate::Error;
use serde::Deserialize;
use serde::Serialize;

// The type used to address SFP cages.
//
// Ports are numbered from 1, as they are labeled on the front panel. Port `n`
// is at bit `n - 1` here.
type MaskType = u64;

/// A bitmask used to identify a set of SFP ports.
#[derive(Clone, Copy, Default, Deserialize, Eq, PartialEq, Serialize)]
#[repr(transparent)]
pub struct PortMask(pub MaskType);

impl core::fmt::Debug for PortMask {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "PortMask(0x{:0x})", self.0)
    }
}

impl PortMask {
    /// The largest port number that can be addressed.
    pub const MAX_PORT: u8 = (core::mem::size_of::<MaskType>() * 8) as _;

    const fn bit(port: u8) -> Result<MaskType, Error> {
        if port == 0 || port > Self::MAX_PORT {
            Err(Error::InvalidPort(port))
        } else {
            Ok(1 << (port - 1))
        }
    }

    /// Set the provided port. If it is out of range, an error is returned.
    pub fn set(&mut self, port: u8) -> Result<(), Error> {
        self.0 |= Self::bit(port)?;
        Ok(())
    }

    /// Construct a port bitmask from an iterator over port numbers.
    ///
    /// If any port is out of bounds, an error is returned.
    pub fn from_port_iter<I: Iterator<Item = u8>>(it: I) -> Result<Self, Error> {
        let mut out = 0;
        for port in it {
            out |= Self::bit(port)?;
        }
        Ok(Self(out))
    }

    /// Construct a port bitmask from a slice of port numbers.
    pub fn from_ports(ports: &[u8]) -> Result<Self, Error> {
        Self::from_port_iter(ports.iter().copied())
    }

    /// Return the port numbers identified by the bitmask, in increasing order.
    pub fn to_ports(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=Self::MAX_PORT).filter(move |port| self.contains(*port))
    }

    /// Return the number of ports addressed by `self`.
    pub const fn selected_port_count(&self) -> usize {
        self.0.count_ones() as _
    }

    /// Return true if the number of ports is zero.
    pub const fn is_empty(&self) -> bool {
        self.selected_port_count() == 0
    }

    /// Convenience function to address zero ports.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Return `true` if the provided port is contained in the set. Ports
    /// out of range are never contained.
    pub const fn contains(&self, port: u8) -> bool {
        match Self::bit(port) {
            Ok(bit) => (self.0 & bit) != 0,
            Err(_) => false,
        }
    }
}
