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
use std::fmt;
use std::path::PathBuf;

use crate::config::HostConfig;

/// Identity of one remote endpoint plus the connection options every
/// operation against it shares.
///
/// Immutable once built; operations clone it freely.
#[derive(Debug, Clone)]
pub struct Node {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    /// Private key passed as `-i`; agent/default-key auth when absent.
    pub key_file: Option<PathBuf>,
    /// Relay the password from the environment via `sshpass -e` instead of
    /// key or agent auth. Mutually exclusive with batch mode.
    pub sshpass: bool,
    /// Disable strict host key checking (`UserKnownHostsFile=/dev/null`).
    pub no_host_key_check: bool,
    /// Force TTY allocation (`-t`) for every command.
    pub tty: bool,
    /// `ConnectTimeout` in seconds.
    pub connect_timeout: Option<u64>,
}

impl Node {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            username: None,
            key_file: None,
            sshpass: false,
            no_host_key_check: false,
            tty: false,
            connect_timeout: None,
        }
    }

    /// Parse `host`, `host:port`, `user@host` or `user@host:port`.
    pub fn parse(node_str: &str) -> Result<Self> {
        let (user_part, host_part) = if let Some(at_pos) = node_str.find('@') {
            (Some(&node_str[..at_pos]), &node_str[at_pos + 1..])
        } else {
            (None, node_str)
        };

        let (host, port) = if let Some(colon_pos) = host_part.rfind(':') {
            let host = &host_part[..colon_pos];
            let port_str = &host_part[colon_pos + 1..];
            let port = port_str.parse::<u16>().context("Invalid port number")?;
            (host, port)
        } else {
            (host_part, 22)
        };

        let mut node = Self::new(host.to_string(), port);
        node.username = user_part.map(String::from);
        Ok(node)
    }

    /// Build a node from a `hosts:` entry in the configuration file.
    pub fn from_config(alias: &str, config: &HostConfig) -> Self {
        Self {
            host: alias.to_string(),
            port: config.port.unwrap_or(22),
            username: config.username.clone(),
            key_file: config.key_file.clone(),
            sshpass: config.sshpass,
            no_host_key_check: config.no_host_key_check,
            tty: config.tty,
            connect_timeout: config.connect_timeout,
        }
    }

    /// The destination argument handed to ssh/scp: `user@host` or the bare
    /// host alias, leaving resolution to `~/.ssh/config`.
    pub fn target_ref(&self) -> String {
        match &self.username {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(user) => write!(f, "{}@{}:{}", user, self.host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_only() {
        let node = Node::parse("cluster-login").unwrap();
        assert_eq!(node.host, "cluster-login");
        assert_eq!(node.port, 22);
        assert_eq!(node.username, None);
    }

    #[test]
    fn test_parse_host_with_port() {
        let node = Node::parse("cluster-login:2222").unwrap();
        assert_eq!(node.host, "cluster-login");
        assert_eq!(node.port, 2222);
    }

    #[test]
    fn test_parse_user_and_host() {
        let node = Node::parse("fitter@cluster-login").unwrap();
        assert_eq!(node.username.as_deref(), Some("fitter"));
        assert_eq!(node.host, "cluster-login");
        assert_eq!(node.port, 22);
    }

    #[test]
    fn test_parse_full_format() {
        let node = Node::parse("fitter@cluster-login:2222").unwrap();
        assert_eq!(node.username.as_deref(), Some("fitter"));
        assert_eq!(node.host, "cluster-login");
        assert_eq!(node.port, 2222);
    }

    #[test]
    fn test_parse_invalid_port() {
        assert!(Node::parse("cluster-login:notaport").is_err());
    }

    #[test]
    fn test_target_ref() {
        let node = Node::parse("cluster-login").unwrap();
        assert_eq!(node.target_ref(), "cluster-login");

        let node = Node::parse("fitter@cluster-login").unwrap();
        assert_eq!(node.target_ref(), "fitter@cluster-login");
    }

    #[test]
    fn test_from_config_defaults() {
        let config = HostConfig::default();
        let node = Node::from_config("cluster-login", &config);
        assert_eq!(node.host, "cluster-login");
        assert_eq!(node.port, 22);
        assert!(!node.sshpass);
        assert!(!node.tty);
    }
}
