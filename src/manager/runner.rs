// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling dispatch loop.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::device_manager::DeviceManager;

/// Drives [`DeviceManager::process_pending`] until shutdown is signalled.
///
/// The queue is drained every `poll_interval`. While no device broker is
/// available the loop waits `unavailable_backoff` instead and keeps
/// polling; messages stay queued in the meantime.
pub async fn run(manager: Arc<Mutex<DeviceManager>>, mut shutdown: watch::Receiver<bool>) {
    let (poll_interval, backoff) = {
        let manager = manager.lock().await;
        (manager.config().poll_interval, manager.config().unavailable_backoff)
    };
    tracing::debug!(?poll_interval, ?backoff, "Dispatch loop started");

    let mut available = true;
    loop {
        if *shutdown.borrow() {
            break;
        }

        let pause = {
            let mut manager = manager.lock().await;
            if manager.brokers_available() {
                if !available {
                    tracing::info!("Broker available again, resuming dispatch");
                    available = true;
                }
                manager.process_pending();
                poll_interval
            } else {
                if available {
                    tracing::warn!(queued = manager.queued(), "No broker available, backing off");
                    available = false;
                }
                backoff
            }
        };

        tokio::select! {
            () = tokio::time::sleep(pause) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Dispatch loop stopped");
}

/// Handle on a spawned dispatch loop.
#[derive(Debug)]
pub struct DispatchHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Signals the loop to stop and waits for it.
    pub async fn shutdown(self) {
        // The receiver only disappears once the loop has already ended.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Dispatch loop ended abnormally");
        }
    }

    /// Returns `true` if the loop task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns [`run`] on the current tokio runtime.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use shellor_lib::manager::{DeviceManager, ManagerConfig, spawn};
/// use shellor_lib::protocol::{Inbox, MemoryTransport};
/// use tokio::sync::Mutex;
///
/// # #[tokio::main]
/// # async fn main() {
/// let manager = DeviceManager::new(ManagerConfig::default(), Arc::new(MemoryTransport::new()), Inbox::new());
/// let manager = Arc::new(Mutex::new(manager));
///
/// let handle = spawn(Arc::clone(&manager));
/// handle.shutdown().await;
/// # }
/// ```
#[must_use]
pub fn spawn(manager: Arc<Mutex<DeviceManager>>) -> DispatchHandle {
    let (shutdown, receiver) = watch::channel(false);
    let task = tokio::spawn(run(manager, receiver));
    DispatchHandle { shutdown, task }
}
