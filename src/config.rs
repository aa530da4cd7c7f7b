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

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::Error;

/// Top-level configuration file.
///
/// Loaded once at process start and never mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ssh: MuxSettings,

    #[serde(default)]
    pub hosts: HashMap<String, HostConfig>,
}

/// Process-wide multiplexing settings shared by every host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxSettings {
    /// Directory the pre-established master sockets live in. When absent,
    /// every connection runs with `ControlMaster=no` and no pooling.
    pub master_socket_base_path: Option<PathBuf>,

    /// Number of master sockets expected per host.
    #[serde(default = "default_nr_sockets")]
    pub nr_sockets: usize,

    /// Hard cap on channels multiplexed over one master socket. Enforced by
    /// sshd itself; this crate only steers load below it.
    #[serde(default = "default_connection_limit")]
    pub connection_limit_per_socket: u32,

    /// Lower bound of the pre-connection jitter sleep, in seconds.
    #[serde(default)]
    pub sleep_min: u64,

    /// Upper bound of the pre-connection jitter sleep, in seconds.
    #[serde(default)]
    pub sleep_max: u64,
}

fn default_nr_sockets() -> usize {
    1
}

fn default_connection_limit() -> u32 {
    10
}

impl Default for MuxSettings {
    fn default() -> Self {
        Self {
            master_socket_base_path: None,
            nr_sockets: default_nr_sockets(),
            connection_limit_per_socket: default_connection_limit(),
            sleep_min: 0,
            sleep_max: 0,
        }
    }
}

impl MuxSettings {
    /// Reject settings the selection and jitter code cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sleep_max < self.sleep_min {
            return Err(Error::Configuration(format!(
                "sleep_max ({}) must be >= sleep_min ({})",
                self.sleep_max, self.sleep_min
            )));
        }
        if self.master_socket_base_path.is_some() && self.nr_sockets == 0 {
            return Err(Error::Configuration(
                "nr_sockets must be at least 1 when master_socket_base_path is set".to_string(),
            ));
        }
        if self.master_socket_base_path.is_some() && self.connection_limit_per_socket == 0 {
            return Err(Error::Configuration(
                "connection_limit_per_socket must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-host connection options, keyed by the host alias.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    pub port: Option<u16>,
    pub username: Option<String>,
    pub key_file: Option<PathBuf>,
    #[serde(default)]
    pub sshpass: bool,
    #[serde(default)]
    pub no_host_key_check: bool,
    #[serde(default)]
    pub tty: bool,
    pub connect_timeout: Option<u64>,
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| format!("Failed to read configuration file at {expanded_path:?}. Please check file permissions and ensure the file is accessible."))?;

        let config: Config = serde_yaml::from_str(&content).with_context(|| {
            format!("Failed to parse YAML configuration file at {expanded_path:?}. Please check the YAML syntax is valid.")
        })?;

        config.ssh.validate()?;

        Ok(config)
    }

    /// Look up a `hosts:` entry by alias.
    pub fn host(&self, alias: &str) -> Option<&HostConfig> {
        self.hosts.get(alias)
    }
}

/// Expand a leading `~` to the current home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(stripped) = path_str.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
