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

//! Single remote command execution over ssh.

use std::process::Output;
use tracing::debug;

use super::{run_capture, sleep_jitter, JitterBounds};
use crate::error::{Error, Result};
use crate::mux::MasterSocket;
use crate::node::Node;

/// Captured outcome of one remote command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub host: String,
    /// Standard output, byte-exact.
    pub output: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: i32,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }

    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Assemble the ssh command line for `node`, bound to `socket` when one is
/// configured.
///
/// Option order follows the shape ssh itself documents: destination first,
/// then connection options, then the remote argv. `sshpass -e` and
/// `BatchMode=yes` are mutually exclusive; a password relay needs the prompt
/// that batch mode suppresses.
pub(crate) fn build_ssh_argv(
    node: &Node,
    socket: Option<&MasterSocket>,
    remote_command: &[String],
) -> Vec<String> {
    let mut argv: Vec<String> = Vec::new();

    if node.sshpass {
        argv.push("sshpass".to_string());
        argv.push("-e".to_string());
    }

    argv.push("ssh".to_string());
    argv.push(node.target_ref());

    match socket {
        Some(socket) => {
            argv.push("-S".to_string());
            argv.push(socket.path.to_string_lossy().into_owned());
        }
        None => {
            argv.push("-o".to_string());
            argv.push("ControlMaster=no".to_string());
        }
    }

    if !node.sshpass {
        argv.push("-o".to_string());
        argv.push("BatchMode=yes".to_string());
    }

    argv.push("-p".to_string());
    argv.push(node.port.to_string());

    if let Some(timeout) = node.connect_timeout {
        argv.push("-o".to_string());
        argv.push(format!("ConnectTimeout={timeout}"));
    }

    if node.no_host_key_check {
        argv.push("-o".to_string());
        argv.push("UserKnownHostsFile=/dev/null".to_string());
        argv.push("-o".to_string());
        argv.push("StrictHostKeyChecking=no".to_string());
    }

    if let Some(key) = &node.key_file {
        argv.push("-i".to_string());
        argv.push(key.to_string_lossy().into_owned());
    }

    if node.tty {
        argv.push("-t".to_string());
    }

    argv.extend_from_slice(remote_command);
    argv
}

/// Map a finished ssh child to a result, surfacing non-zero exit status as
/// [`Error::RemoteCommand`] with the captured output attached.
pub(crate) fn into_command_result(
    node: &Node,
    command: &[String],
    output: Output,
) -> Result<CommandResult> {
    let exit_status = output.status.code().unwrap_or(-1);

    if !output.status.success() {
        return Err(Error::RemoteCommand {
            host: node.host.clone(),
            command: command.join(" "),
            exit_code: exit_status,
            output: output.stdout,
        });
    }

    Ok(CommandResult {
        host: node.host.clone(),
        output: output.stdout,
        stderr: output.stderr,
        exit_status,
    })
}

/// Run one remote command: jitter sleep, connect over the selected socket,
/// capture stdout, then force channel teardown.
///
/// Exactly one attempt; retry policy belongs to the caller.
pub async fn execute(
    node: &Node,
    socket: Option<&MasterSocket>,
    jitter: JitterBounds,
    command: &[String],
) -> Result<CommandResult> {
    sleep_jitter(jitter).await;

    let argv = build_ssh_argv(node, socket, command);
    debug!("Executing on {}: {:?}", node, argv);

    let output = run_capture(&argv).await?;
    let result = into_command_result(node, command, output)?;

    // Multiplexed channels can linger half-open until the control connection
    // notices, inflating later probe counts. A no-op round-trip over the
    // same channel path forces clean teardown.
    teardown_channel(node, socket).await;

    Ok(result)
}

/// Best-effort `exit` round-trip over the same control socket. Failures are
/// logged and swallowed; the command already completed.
async fn teardown_channel(node: &Node, socket: Option<&MasterSocket>) {
    let argv = build_ssh_argv(node, socket, &["exit".to_string()]);
    match run_capture(&argv).await {
        Ok(output) if output.status.success() => {}
        Ok(output) => debug!(
            "Channel teardown on {} exited with {}",
            node, output.status
        ),
        Err(e) => debug!("Channel teardown on {} failed: {}", node, e),
    }
}
