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

//! Master socket discovery, probing and load-weighted selection.

pub mod pool;
pub mod probe;
pub mod socket;

pub use pool::{SocketLoad, SocketPool};
pub use probe::{ChannelProber, LsofProber};
pub use socket::{discover_sockets, MasterSocket};
