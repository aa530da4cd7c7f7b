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

//! Master socket discovery.
//!
//! Sockets follow the fixed naming convention `<base>/<host>_<i>:<port>`
//! with `i` counting from 1. They are created out-of-band (`ssh -M -S`);
//! this module only finds the ones that exist.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One pre-established multiplexed connection, identified by its control
/// socket path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterSocket {
    pub path: PathBuf,
}

impl MasterSocket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The substring matched against `lsof -U` output when counting open
    /// channels: the socket path with its `:<port>` suffix stripped, since
    /// lsof truncates long unix socket names at the colon.
    pub fn probe_needle(&self) -> String {
        let path = self.path.to_string_lossy();
        match path.rfind(':') {
            Some(pos) if path[pos + 1..].chars().all(|c| c.is_ascii_digit()) => {
                path[..pos].to_string()
            }
            _ => path.into_owned(),
        }
    }
}

impl fmt::Display for MasterSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Find the master sockets configured for a host.
///
/// Missing sockets are logged and skipped; they cannot be created here. If
/// none of the expected paths exist the host is unusable and this fails
/// with [`Error::NoSockets`].
pub fn discover_sockets(
    base: &Path,
    host: &str,
    port: u16,
    nr_sockets: usize,
) -> Result<Vec<MasterSocket>> {
    let mut sockets = Vec::with_capacity(nr_sockets);

    for i in 1..=nr_sockets {
        let path = base.join(format!("{host}_{i}:{port}"));
        if path.exists() {
            sockets.push(MasterSocket::new(path));
        } else {
            tracing::error!(
                "Master socket missing at {:?}; it has to be created manually",
                path
            );
        }
    }

    if sockets.is_empty() {
        return Err(Error::NoSockets {
            host: host.to_string(),
            base: base.to_path_buf(),
        });
    }

    Ok(sockets)
}
