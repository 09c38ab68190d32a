// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Configuration of a managed SFP port.

use crate::Error;
use crate::Platform;
use sfp_types::Speed;
use std::time::Duration;

/// Return the default number of consecutive I/O failures reported before
/// further reports are suppressed.
pub const fn default_log_error_threshold() -> u32 {
    5
}

/// Return the default interval between refreshes of module data.
pub const fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

/// Configuration for a [`crate::SfpPort`].
///
/// The [`ConfigBuilder`] can be used to construct this with defaults that
/// match the platform.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The platform, which selects the register map and quirks.
    pub platform: Platform,

    /// The port number, starting from 1.
    pub port: u8,

    /// The speed the port runs at when nothing else is known.
    pub default_speed: Speed,

    /// The number of consecutive I/O failures logged as warnings. The failure
    /// reaching this count is logged as an error, and later ones only at
    /// debug level until an access succeeds or the module is removed.
    pub log_error_threshold: u32,

    /// The interval on which module data is refreshed.
    pub poll_interval: Duration,
}

/// A builder interface for generating port configuration.
#[derive(Debug)]
pub struct ConfigBuilder {
    platform: Platform,
    port: u8,
    default_speed: Option<Speed>,
    log_error_threshold: Option<u32>,
    poll_interval: Option<Duration>,
}

impl ConfigBuilder {
    /// Create a new builder for one port of a platform.
    pub fn new(platform: Platform, port: u8) -> Self {
        Self {
            platform,
            port,
            default_speed: None,
            log_error_threshold: None,
            poll_interval: None,
        }
    }

    /// Set the speed used when nothing else is known.
    pub fn default_speed(mut self, speed: Speed) -> Self {
        self.default_speed = Some(speed);
        self
    }

    /// Set the number of consecutive I/O failures after which reports are
    /// suppressed.
    pub fn log_error_threshold(mut self, threshold: u32) -> Self {
        self.log_error_threshold = Some(threshold);
        self
    }

    /// Set the interval on which module data is refreshed.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Build a `Config` from `self`.
    pub fn build(self) -> Result<Config, Error> {
        if !self.platform.is_valid_port(self.port) {
            return Err(Error::UnsupportedPort {
                platform: self.platform,
                port: self.port,
            });
        }
        let log_error_threshold = self
            .log_error_threshold
            .unwrap_or_else(default_log_error_threshold);
        if log_error_threshold == 0 {
            return Err(Error::Config(String::from(
                "log error threshold must be at least 1",
            )));
        }
        let poll_interval = self.poll_interval.unwrap_or_else(default_poll_interval);
        if poll_interval.is_zero() {
            return Err(Error::Config(String::from(
                "poll interval must be non-zero",
            )));
        }
        Ok(Config {
            platform: self.platform,
            port: self.port,
            default_speed: self
                .default_speed
                .unwrap_or_else(|| self.platform.default_speed()),
            log_error_threshold,
            poll_interval,
        })
    }
}
