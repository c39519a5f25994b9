//! Named set of running tail points

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::tail_point::{TailOptions, TailPoint};

/// All configured logs, addressable by name
#[derive(Debug, Default)]
pub struct TailRegistry {
    points: BTreeMap<String, Arc<TailPoint>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TailRegistry {
    /// Spawn one tail point per `(name, path)`; each stops when `cancel` fires
    pub fn spawn<I, N, P>(logs: I, options: TailOptions, cancel: &CancellationToken) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<PathBuf>,
    {
        let mut registry = Self::default();
        for (name, path) in logs {
            let name = name.into();
            let (point, task) =
                TailPoint::spawn(name.as_str(), path, options, cancel.child_token());
            registry.points.insert(name, point);
            registry.tasks.get_mut().push(task);
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TailPoint>> {
        self.points.get(name)
    }

    /// Tail points in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TailPoint>> {
        self.points.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.points.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Wait for every tail task to finish. Call after cancelling.
    pub async fn join(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "tail task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_spawn_and_lookup() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();

        let registry = TailRegistry::spawn(
            [
                ("slowlog", dir.path().join("slow.log")),
                ("httplog", dir.path().join("access.log")),
            ],
            TailOptions::default(),
            &cancel,
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["httplog", "slowlog"]);
        assert_eq!(
            registry.get("httplog").unwrap().path(),
            dir.path().join("access.log")
        );
        assert!(registry.get("nope").is_none());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), registry.join())
            .await
            .unwrap();
        assert!(registry.iter().all(|point| !point.is_running()));
    }
}
