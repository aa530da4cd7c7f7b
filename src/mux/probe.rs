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

//! Open-channel probing for master sockets.
//!
//! Channels open and close outside this process (other pipeline workers use
//! the same sockets), so the count is never cached: every selection decision
//! probes again.

use async_trait::async_trait;
use tokio::process::Command;

use super::socket::MasterSocket;
use crate::error::{Error, Result};

/// Reports how many channels are currently multiplexed on a control socket.
///
/// The production implementation shells out to `lsof`; tests substitute
/// fixed-load fakes. Keeping this behind a trait also leaves room for a
/// native `/proc`-based probe without touching pool or executor code.
#[async_trait]
pub trait ChannelProber: Send + Sync {
    async fn open_channels(&self, socket: &MasterSocket) -> Result<u32>;
}

/// Probe via `lsof -U`: list unix domain sockets and count the lines that
/// reference the control socket path.
#[derive(Debug, Default, Clone, Copy)]
pub struct LsofProber;

#[async_trait]
impl ChannelProber for LsofProber {
    async fn open_channels(&self, socket: &MasterSocket) -> Result<u32> {
        let output = Command::new("lsof")
            .arg("-U")
            .output()
            .await
            .map_err(|e| Error::Probe {
                socket: socket.path.clone(),
                reason: format!("failed to run lsof: {e}"),
            })?;

        // lsof exits non-zero when it has nothing to report; only a failure
        // with no output at all means the probe itself broke.
        if !output.status.success() && output.stdout.is_empty() {
            return Err(Error::Probe {
                socket: socket.path.clone(),
                reason: format!(
                    "lsof exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(count_channel_lines(&listing, &socket.probe_needle()))
    }
}

/// Count listing lines that reference the socket. Split out from the
/// subprocess call so the parsing is testable without lsof.
pub(crate) fn count_channel_lines(listing: &str, needle: &str) -> u32 {
    listing.lines().filter(|line| line.contains(needle)).count() as u32
}
