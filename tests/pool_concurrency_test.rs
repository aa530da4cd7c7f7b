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

//! Concurrent selection: many uncoordinated callers against one pool.
//!
//! Selection is advisory load spreading, not admission control, so these
//! tests assert completion and spreading rather than a hard channel bound.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use muxssh::{ChannelProber, MasterSocket, Result, SocketPool};

/// Prober whose reported load tracks a shared in-flight counter per socket,
/// approximating what lsof would observe while operations run.
struct CountingProber {
    in_flight: HashMap<String, Arc<AtomicU32>>,
}

#[async_trait]
impl ChannelProber for CountingProber {
    async fn open_channels(&self, socket: &MasterSocket) -> Result<u32> {
        let path = socket.path.to_string_lossy().into_owned();
        Ok(self
            .in_flight
            .get(&path)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn fifty_concurrent_selections_complete_and_spread() {
    let paths = ["/mux/h_1:22", "/mux/h_2:22"];
    let counters: HashMap<String, Arc<AtomicU32>> = paths
        .iter()
        .map(|p| (p.to_string(), Arc::new(AtomicU32::new(0))))
        .collect();

    let prober = CountingProber {
        in_flight: counters.clone(),
    };
    let pool = Arc::new(SocketPool::new(
        "h",
        paths.iter().map(|p| MasterSocket::new(*p)).collect(),
        10,
        Arc::new(prober),
    ));

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counters = counters.clone();
            tokio::spawn(async move {
                let socket = pool.select().await?;
                let path = socket.path.to_string_lossy().into_owned();
                let counter = Arc::clone(&counters[&path]);

                // Hold the "channel" open briefly so later probes see it.
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_sub(1, Ordering::SeqCst);

                Ok::<String, muxssh::Error>(path)
            })
        })
        .collect();

    let outcome = tokio::time::timeout(Duration::from_secs(10), join_all(tasks))
        .await
        .expect("concurrent selection must not deadlock");

    let mut per_socket: HashMap<String, u32> = HashMap::new();
    let mut exhausted = 0u32;
    for joined in outcome {
        match joined.expect("task must not panic") {
            Ok(path) => *per_socket.entry(path).or_default() += 1,
            // Accepted race under full saturation; callers back off and
            // retry at their own layer.
            Err(muxssh::Error::CapacityExhausted { .. }) => exhausted += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    let successes: u32 = per_socket.values().sum();
    assert_eq!(successes + exhausted, 50);
    assert!(successes > 0, "at least some selections must succeed");

    // With two equally loaded sockets, fifty draws landing on one socket
    // only would mean the weighting is broken.
    if successes >= 20 {
        assert!(
            per_socket.len() == 2,
            "load not spread across sockets: {per_socket:?}"
        );
    }
}
