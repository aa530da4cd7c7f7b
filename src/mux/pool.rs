// Copyright 2025 the muxssh developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Load-weighted selection across a host's master sockets.
//!
//! Selection is a spreading heuristic, not admission control: sshd enforces
//! the real channel limit, and a mis-estimate simply surfaces as a failed
//! connection attempt. Because independent callers probe concurrently, the
//! draw is randomized rather than picking the emptiest socket, so a burst of
//! simultaneous selections does not herd onto one "best" socket.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::probe::ChannelProber;
use super::socket::MasterSocket;
use crate::error::{Error, Result};

/// The set of master sockets configured for one host.
///
/// Holds no mutable state; every `select` probes the live channel counts.
pub struct SocketPool {
    host: String,
    sockets: Vec<MasterSocket>,
    connection_limit: u32,
    prober: Arc<dyn ChannelProber>,
}

impl fmt::Debug for SocketPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The prober is a trait object; everything else is plain data.
        f.debug_struct("SocketPool")
            .field("host", &self.host)
            .field("sockets", &self.sockets)
            .field("connection_limit", &self.connection_limit)
            .finish_non_exhaustive()
    }
}

/// Observed load of one socket at probe time, for reporting.
#[derive(Debug, Clone)]
pub struct SocketLoad {
    pub socket: MasterSocket,
    /// `None` when the probe failed; treated as zero spare for selection.
    pub open_channels: Option<u32>,
    pub spare: u32,
}

impl SocketPool {
    pub fn new(
        host: impl Into<String>,
        sockets: Vec<MasterSocket>,
        connection_limit: u32,
        prober: Arc<dyn ChannelProber>,
    ) -> Self {
        Self {
            host: host.into(),
            sockets,
            connection_limit,
            prober,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn sockets(&self) -> &[MasterSocket] {
        &self.sockets
    }

    /// Probe every socket and report observed load and spare capacity.
    pub async fn load_report(&self) -> Vec<SocketLoad> {
        let mut report = Vec::with_capacity(self.sockets.len());
        for socket in &self.sockets {
            let load = match self.prober.open_channels(socket).await {
                Ok(open) => SocketLoad {
                    socket: socket.clone(),
                    open_channels: Some(open),
                    spare: self.connection_limit.saturating_sub(open),
                },
                Err(e) => {
                    warn!("Probe failed for {}: {}", socket, e);
                    SocketLoad {
                        socket: socket.clone(),
                        open_channels: None,
                        spare: 0,
                    }
                }
            };
            report.push(load);
        }
        report
    }

    /// Pick a socket with free connections, weighted by spare capacity.
    pub async fn select(&self) -> Result<&MasterSocket> {
        self.select_with_rng(&mut fastrand::Rng::new()).await
    }

    /// Like [`select`](Self::select) with a caller-provided RNG, so tests
    /// can seed the draw.
    pub async fn select_with_rng(&self, rng: &mut fastrand::Rng) -> Result<&MasterSocket> {
        let report = self.load_report().await;
        let spare: Vec<u32> = report.iter().map(|l| l.spare).collect();

        debug!(
            "Master sockets for '{}': {:?}",
            self.host,
            report
                .iter()
                .map(|l| (l.socket.to_string(), l.open_channels, l.spare))
                .collect::<Vec<_>>()
        );

        let idx = pick_weighted(&spare, rng).ok_or_else(|| Error::CapacityExhausted {
            host: self.host.clone(),
        })?;

        Ok(&self.sockets[idx])
    }
}

/// Draw an index with probability proportional to its spare capacity.
///
/// Entries with zero spare carry zero weight and can never be drawn;
/// `None` when all weight is zero. Stateless over explicit inputs, per the
/// original selection formula (weights normalized over the spare-slot sum).
pub(crate) fn pick_weighted(spare: &[u32], rng: &mut fastrand::Rng) -> Option<usize> {
    let total: u64 = spare.iter().map(|&s| u64::from(s)).sum();
    if total == 0 {
        return None;
    }

    let mut draw = rng.u64(0..total);
    for (idx, &weight) in spare.iter().enumerate() {
        let weight = u64::from(weight);
        if draw < weight {
            return Some(idx);
        }
        draw -= weight;
    }
    None
}
