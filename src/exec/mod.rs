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

//! Remote command and copy execution over a selected master socket.

pub mod command;
pub mod copy;

pub use command::{execute, CommandResult};
pub use copy::{copy, CopyDirection, CopyRequest};

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::Result;

/// Jitter bounds in whole seconds, `(min, max)` inclusive.
pub type JitterBounds = (u64, u64);

/// Draw the pre-connection sleep from `[min, max]` inclusive.
///
/// Whole seconds, matching the configured bounds; `(0, 0)` yields zero.
pub(crate) fn jitter_duration(bounds: JitterBounds, rng: &mut fastrand::Rng) -> Duration {
    let (min, max) = bounds;
    if max == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs(rng.u64(min..=max))
}

/// Sleep for a random interval so near-simultaneous callers do not all hit
/// the master sockets in the same instant.
pub(crate) async fn sleep_jitter(bounds: JitterBounds) {
    let delay = jitter_duration(bounds, &mut fastrand::Rng::new());
    if !delay.is_zero() {
        debug!("Sleeping {:?} before connecting", delay);
        tokio::time::sleep(delay).await;
    }
}

/// Run an argv, capturing stdout and stderr. stdin is closed so a
/// misconfigured ssh can never sit waiting on a prompt.
pub(crate) async fn run_capture(argv: &[String]) -> Result<std::process::Output> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line")
    })?;

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_disabled_bounds() {
        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..50 {
            assert_eq!(jitter_duration((0, 0), &mut rng), Duration::ZERO);
        }
    }

    #[test]
    fn test_jitter_within_bounds_inclusive() {
        let mut rng = fastrand::Rng::with_seed(11);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..2000 {
            let d = jitter_duration((1, 3), &mut rng);
            assert!(d >= Duration::from_secs(1));
            assert!(d <= Duration::from_secs(3));
            seen_min |= d == Duration::from_secs(1);
            seen_max |= d == Duration::from_secs(3);
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn test_jitter_degenerate_equal_bounds() {
        let mut rng = fastrand::Rng::with_seed(5);
        assert_eq!(jitter_duration((2, 2), &mut rng), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_run_capture_collects_stdout() {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf hello".to_string(),
        ];
        let output = run_capture(&argv).await.unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, b"hello");
    }

    #[tokio::test]
    async fn test_run_capture_missing_program() {
        let argv = vec!["definitely-not-a-real-binary-xyzzy".to_string()];
        assert!(run_capture(&argv).await.is_err());
    }
}
