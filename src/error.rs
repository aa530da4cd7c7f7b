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

//! Error types for socket selection and remote execution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by socket selection and remote operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No master socket exists under the configured base path for a host.
    ///
    /// Master sockets are provisioned out-of-band (`ssh -M -S <path>`); this
    /// crate only uses them and never creates them.
    #[error(
        "no master sockets available for '{host}' under {base:?}; they must be created manually"
    )]
    NoSockets { host: String, base: PathBuf },

    /// A required configuration field is missing or inconsistent.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Every configured master socket is at or above its channel limit.
    #[error("no master socket for '{host}' has free connections")]
    CapacityExhausted { host: String },

    /// The open-channel probe could not inspect a control socket.
    #[error("failed to probe open channels on {socket:?}: {reason}")]
    Probe { socket: PathBuf, reason: String },

    /// A remote command exited with non-zero status.
    #[error("remote command `{command}` on '{host}' exited with status {exit_code}")]
    RemoteCommand {
        host: String,
        command: String,
        exit_code: i32,
        /// Standard output captured before the command failed.
        output: Vec<u8>,
    },

    /// A file copy exited with non-zero status.
    #[error("copy from '{from}' to '{to}' via '{host}' exited with status {exit_code}")]
    RemoteCopy {
        host: String,
        from: String,
        to: String,
        exit_code: i32,
    },

    /// Spawning a local process (ssh, scp, the probe) failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the caller may reasonably retry after backing off.
    ///
    /// Only capacity exhaustion is retryable at this layer; everything else
    /// is either fatal configuration or a completed remote failure the
    /// caller has to interpret itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CapacityExhausted { .. })
    }
}
