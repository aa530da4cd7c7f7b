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

//! File and directory copy over scp, reusing the selected master socket.

use std::path::Path;
use std::process::Output;
use tracing::debug;

use super::{run_capture, sleep_jitter, JitterBounds};
use crate::error::{Error, Result};
use crate::mux::MasterSocket;
use crate::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    /// Local source to remote destination.
    Upload,
    /// Remote source to local destination.
    Download,
}

/// One copy operation. Completes or fails as a unit; a failed copy is never
/// reported as success with a partial destination.
#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub source: String,
    pub dest: String,
    pub direction: CopyDirection,
    pub recursive: bool,
}

impl CopyRequest {
    pub fn upload(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            direction: CopyDirection::Upload,
            recursive: false,
        }
    }

    pub fn download(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            direction: CopyDirection::Download,
            recursive: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Recursive when asked for explicitly, or when uploading a local
    /// directory.
    fn needs_recursive(&self) -> bool {
        self.recursive
            || (self.direction == CopyDirection::Upload && Path::new(&self.source).is_dir())
    }
}

/// Assemble the scp command line. Same auth, host-key and control-socket
/// fields as the command path, spelled in scp's dialect (`ControlPath`
/// option, `-B` for batch, capital `-P` for the port).
pub(crate) fn build_scp_argv(
    node: &Node,
    socket: Option<&MasterSocket>,
    request: &CopyRequest,
) -> Vec<String> {
    let mut argv: Vec<String> = Vec::new();

    if node.sshpass {
        argv.push("sshpass".to_string());
        argv.push("-e".to_string());
    }

    argv.push("scp".to_string());
    argv.push("-q".to_string());
    argv.push("-C".to_string());

    match socket {
        Some(socket) => {
            argv.push("-o".to_string());
            argv.push(format!("ControlPath={}", socket.path.display()));
        }
        None => {
            argv.push("-o".to_string());
            argv.push("ControlMaster=no".to_string());
        }
    }

    if !node.sshpass {
        argv.push("-B".to_string());
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

    argv.push("-P".to_string());
    argv.push(node.port.to_string());

    if request.needs_recursive() {
        argv.push("-r".to_string());
    }

    let target = node.target_ref();
    match request.direction {
        CopyDirection::Upload => {
            argv.push(request.source.clone());
            argv.push(format!("{target}:{}", request.dest));
        }
        CopyDirection::Download => {
            argv.push(format!("{target}:{}", request.source));
            argv.push(request.dest.clone());
        }
    }

    argv
}

/// Map a finished scp child to a result.
pub(crate) fn check_copy_status(node: &Node, request: &CopyRequest, output: Output) -> Result<()> {
    if !output.status.success() {
        return Err(Error::RemoteCopy {
            host: node.host.clone(),
            from: request.source.clone(),
            to: request.dest.clone(),
            exit_code: output.status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

/// Copy one path to or from the remote host. Exactly one attempt.
pub async fn copy(
    node: &Node,
    socket: Option<&MasterSocket>,
    jitter: JitterBounds,
    request: &CopyRequest,
) -> Result<()> {
    sleep_jitter(jitter).await;

    let argv = build_scp_argv(node, socket, request);
    debug!("Copying via {}: {:?}", node, argv);

    let output = run_capture(&argv).await?;
    check_copy_status(node, request, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_node() -> Node {
        Node::new("cluster-login".to_string(), 22)
    }

    #[test]
    fn test_scp_argv_upload_binds_control_path() {
        let socket = MasterSocket::new("/tmp/ssh_mux/cluster-login_2:22");
        let request = CopyRequest::upload("/data/fit_result.yml", "/remote/results/");
        let argv = build_scp_argv(&test_node(), Some(&socket), &request);

        assert_eq!(argv[..3], ["scp", "-q", "-C"]);
        assert!(argv.contains(&"ControlPath=/tmp/ssh_mux/cluster-login_2:22".to_string()));
        assert!(argv.contains(&"-B".to_string()));
        assert_eq!(argv[argv.len() - 2], "/data/fit_result.yml");
        assert_eq!(argv[argv.len() - 1], "cluster-login:/remote/results/");
    }

    #[test]
    fn test_scp_argv_download_prefixes_remote_source() {
        let mut node = test_node();
        node.username = Some("fitter".to_string());
        let request = CopyRequest::download("/remote/results/fit.yml", "/data/fit.yml");
        let argv = build_scp_argv(&node, None, &request);

        assert!(argv.contains(&"ControlMaster=no".to_string()));
        assert_eq!(argv[argv.len() - 2], "fitter@cluster-login:/remote/results/fit.yml");
        assert_eq!(argv[argv.len() - 1], "/data/fit.yml");
    }

    #[test]
    fn test_scp_argv_sshpass_drops_batch_flag() {
        let mut node = test_node();
        node.sshpass = true;
        let request = CopyRequest::upload("a", "b");
        let argv = build_scp_argv(&node, None, &request);

        assert_eq!(argv[..2], ["sshpass", "-e"]);
        assert!(!argv.contains(&"-B".to_string()));
    }

    #[test]
    fn test_scp_argv_recursive_flag() {
        let request = CopyRequest::download("/remote/dir", "/local/dir").recursive(true);
        let argv = build_scp_argv(&test_node(), None, &request);
        assert!(argv.contains(&"-r".to_string()));

        let request = CopyRequest::download("/remote/file", "/local/file");
        let argv = build_scp_argv(&test_node(), None, &request);
        assert!(!argv.contains(&"-r".to_string()));
    }

    #[test]
    fn test_scp_argv_local_directory_forces_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let request = CopyRequest::upload(dir.path().to_string_lossy(), "/remote/dir");
        let argv = build_scp_argv(&test_node(), None, &request);
        assert!(argv.contains(&"-r".to_string()));
    }

    #[test]
    fn test_scp_argv_auth_and_port_options() {
        let mut node = test_node();
        node.port = 2222;
        node.key_file = Some(PathBuf::from("/home/fitter/.ssh/id_ed25519"));
        node.no_host_key_check = true;
        let request = CopyRequest::upload("a", "b");
        let argv = build_scp_argv(&node, None, &request);

        let p_pos = argv.iter().position(|a| a == "-P").unwrap();
        assert_eq!(argv[p_pos + 1], "2222");
        assert!(argv.contains(&"UserKnownHostsFile=/dev/null".to_string()));

        let i_pos = argv.iter().position(|a| a == "-i").unwrap();
        assert_eq!(argv[i_pos + 1], "/home/fitter/.ssh/id_ed25519");
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.dat");
        let request = CopyRequest::upload("/nonexistent/source.dat", dest.to_string_lossy());

        // Exercise the status mapping with a local cp standing in for scp.
        let argv = vec![
            "cp".to_string(),
            request.source.clone(),
            request.dest.clone(),
        ];
        let output = run_capture(&argv).await.unwrap();
        let err = check_copy_status(&test_node(), &request, output).unwrap_err();

        match err {
            Error::RemoteCopy {
                host, exit_code, ..
            } => {
                assert_eq!(host, "cluster-login");
                assert_ne!(exit_code, 0);
            }
            other => panic!("expected RemoteCopy, got {other:?}"),
        }
        assert!(!dest.exists());
    }
}
