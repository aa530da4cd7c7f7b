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

//! The entry point workflow tasks use for remote operations.
//!
//! Each operation selects a master socket, then runs exactly one command or
//! copy over it. Errors propagate unchanged; retry and timeout policy belong
//! to the calling task.

use std::fmt;
use std::sync::Arc;

use crate::config::MuxSettings;
use crate::error::Result;
use crate::exec::{self, CommandResult, CopyRequest, JitterBounds};
use crate::mux::{discover_sockets, ChannelProber, LsofProber, MasterSocket, SocketPool};
use crate::node::Node;

/// Remote execution handle for one host.
///
/// Safe to share across concurrent tasks; it holds no mutable state and
/// every call probes socket load independently.
pub struct RemoteExecutor {
    node: Node,
    jitter: JitterBounds,
    pool: Option<SocketPool>,
}

impl fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("node", &self.node)
            .field("jitter", &self.jitter)
            .field("pool", &self.pool)
            .finish()
    }
}

impl RemoteExecutor {
    /// Build an executor using the production `lsof` prober.
    pub fn new(node: Node, settings: &MuxSettings) -> Result<Self> {
        Self::with_prober(node, settings, Arc::new(LsofProber))
    }

    /// Build an executor with an injected prober.
    ///
    /// When no `master_socket_base_path` is configured the executor runs
    /// with multiplexing disabled (`ControlMaster=no`) and no pool at all.
    pub fn with_prober(
        node: Node,
        settings: &MuxSettings,
        prober: Arc<dyn ChannelProber>,
    ) -> Result<Self> {
        settings.validate()?;

        let pool = match &settings.master_socket_base_path {
            Some(base) => {
                let sockets = discover_sockets(base, &node.host, node.port, settings.nr_sockets)?;
                Some(SocketPool::new(
                    node.host.clone(),
                    sockets,
                    settings.connection_limit_per_socket,
                    prober,
                ))
            }
            None => None,
        };

        Ok(Self {
            node,
            jitter: (settings.sleep_min, settings.sleep_max),
            pool,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The socket pool, when multiplexing is configured.
    pub fn pool(&self) -> Option<&SocketPool> {
        self.pool.as_ref()
    }

    async fn select_socket(&self) -> Result<Option<&MasterSocket>> {
        match &self.pool {
            Some(pool) => Ok(Some(pool.select().await?)),
            None => Ok(None),
        }
    }

    /// Run a command on the host, capturing its standard output.
    pub async fn run_command(&self, command: &[String]) -> Result<CommandResult> {
        let socket = self.select_socket().await?;
        exec::execute(&self.node, socket, self.jitter, command).await
    }

    /// Upload a local file or directory.
    pub async fn upload(&self, source: &str, dest: &str, recursive: bool) -> Result<()> {
        let request = CopyRequest::upload(source, dest).recursive(recursive);
        let socket = self.select_socket().await?;
        exec::copy(&self.node, socket, self.jitter, &request).await
    }

    /// Download a remote file or directory.
    pub async fn download(&self, source: &str, dest: &str, recursive: bool) -> Result<()> {
        let request = CopyRequest::download(source, dest).recursive(recursive);
        let socket = self.select_socket().await?;
        exec::copy(&self.node, socket, self.jitter, &request).await
    }
}
