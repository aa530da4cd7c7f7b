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

//! Bounded concurrent remote execution over multiplexed SSH.
//!
//! Long-running pipeline tasks issue commands and file transfers to remote
//! hosts through pre-established SSH master sockets. Each socket carries a
//! limited number of multiplexed channels, so every operation first probes
//! the live channel count on each socket and picks one at random, weighted
//! by spare capacity. The weighting spreads load; the hard limit stays with
//! sshd itself.
//!
//! [`RemoteExecutor`] is the entry point: one handle per host, exposing
//! `run_command`, `upload` and `download`.

pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod mux;
pub mod node;
pub mod remote;
pub mod utils;

pub use config::{Config, MuxSettings};
pub use error::{Error, Result};
pub use exec::{CommandResult, CopyDirection, CopyRequest};
pub use mux::{ChannelProber, LsofProber, MasterSocket, SocketPool};
pub use node::Node;
pub use remote::RemoteExecutor;
