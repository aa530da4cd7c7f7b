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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "muxssh",
    version,
    about = "Remote execution over pre-established multiplexed SSH master sockets",
    long_about = "muxssh runs commands and copies files over SSH master sockets shared by many\nconcurrent pipeline tasks. Each operation probes the open channel count on\nevery configured socket and picks one at random, weighted by spare capacity,\nso the per-socket channel limit is rarely hit even under heavy parallel load.\n\nMaster sockets must exist before use (ssh -M -S <base>/<host>_<n>:<port>);\nmuxssh never creates them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        default_value = "~/.config/muxssh/config.yaml",
        help = "Configuration file path"
    )]
    pub config: PathBuf,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command on a host and print its output
    Exec {
        /// Host alias from the config file, or [user@]host[:port]
        host: String,

        /// Command and arguments to run remotely
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Upload a local file or directory
    Upload {
        host: String,
        source: String,
        dest: String,

        #[arg(short = 'r', long, help = "Copy directories recursively")]
        recursive: bool,
    },

    /// Download a remote file or directory
    Download {
        host: String,
        source: String,
        dest: String,

        #[arg(short = 'r', long, help = "Copy directories recursively")]
        recursive: bool,
    },

    /// Show observed load and spare capacity of a host's master sockets
    Sockets { host: String },
}
