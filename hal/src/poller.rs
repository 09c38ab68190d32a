// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Periodic refresh of a set of ports.

use crate::Error;
use crate::PresenceAndControl;
use crate::RawByteReader;
use crate::SfpPort;
use sfp_types::PortMask;
use slog::debug;
use slog::trace;
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

/// Refreshes every port in turn, on a fixed interval.
///
/// The ports are shared behind a lock, which is held for one whole refresh
/// cycle. Consumers may take it between cycles to query or control a port.
#[derive(Debug)]
pub struct Poller<C, R> {
    log: Logger,
    interval: Duration,
    ports: Arc<Mutex<Vec<SfpPort<C, R>>>>,
}

impl<C, R> Poller<C, R>
where
    C: PresenceAndControl + Send + 'static,
    R: RawByteReader + Send + 'static,
{
    pub fn new(log: &Logger, interval: Duration, ports: Vec<SfpPort<C, R>>) -> Self {
        Self {
            log: log.new(slog::o!("task" => "poller")),
            interval,
            ports: Arc::new(Mutex::new(ports)),
        }
    }

    /// Return a handle to the polled ports.
    pub fn ports(&self) -> Arc<Mutex<Vec<SfpPort<C, R>>>> {
        Arc::clone(&self.ports)
    }

    /// Power up the module in `port`, and wait for it to settle.
    ///
    /// The ports are only locked while the module is powered, so other ports
    /// keep being refreshed while this one settles.
    pub async fn enable(&self, port: u8) -> Result<(), Error> {
        let delay = {
            let mut ports = self.ports.lock().await;
            let p = ports
                .iter_mut()
                .find(|p| p.port() == port)
                .ok_or(sfp_types::Error::InvalidPort(port))?;
            p.enable()?
        };
        if let Some(delay) = delay {
            debug!(self.log, "waiting for module to settle"; "port" => port, "delay" => ?delay);
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Return the ports holding a module, as of their last refresh.
    pub async fn present_ports(&self) -> Result<PortMask, Error> {
        let ports = self.ports.lock().await;
        let present = ports
            .iter()
            .filter(|p| p.device().is_present())
            .map(|p| p.port());
        Ok(PortMask::from_port_iter(present)?)
    }

    /// Refresh every port once.
    ///
    /// A failure on one port never stops the others from being refreshed.
    /// Returns the number of ports which failed.
    pub async fn poll_once(&self) -> usize {
        let mut ports = self.ports.lock().await;
        let mut failures = 0;
        for port in ports.iter_mut() {
            if let Err(e) = port.poll() {
                failures += 1;
                debug!(
                    self.log,
                    "failed to refresh port";
                    "port" => port.port(),
                    "reason" => %e,
                );
            }
        }
        trace!(self.log, "refreshed ports"; "n_ports" => ports.len(), "failures" => failures);
        failures
    }

    /// Refresh the ports on the configured interval, until `shutdown` fires
    /// or its sender is dropped.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(self.log, "starting"; "interval" => ?self.interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!(self.log, "shutting down");
                    return;
                }
                _ = interval.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }
}
