use std::path::PathBuf;
use std::time::Duration;

use flume::RecvTimeoutError;
use notify::{RecursiveMode, Watcher};
use tracing::warn;

use crate::error::{Result, Shader2hError};

const SETTLE_TIME: Duration = Duration::from_millis(100);

/// Watches the input shaders and reports which one changed.
pub struct ShaderWatcher {
    _watchers: Vec<notify::RecommendedWatcher>,
    receiver: flume::Receiver<PathBuf>,
}

impl ShaderWatcher {
    pub fn new(paths: &[PathBuf]) -> Result<Self> {
        let (tx, rx) = flume::unbounded();
        let mut watchers = Vec::with_capacity(paths.len());

        for path in paths {
            let tx = tx.clone();
            let changed = path.clone();

            // AIDEV-NOTE: Report the path as given on the command line so output names stay stable
            let mut watcher =
                notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
                    match event {
                        Ok(event) if event.kind.is_modify() => {
                            let _ = tx.send(changed.clone());
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Watch error on `{}`: {e}", changed.display()),
                    }
                })?;
            watcher.watch(path, RecursiveMode::NonRecursive)?;
            watchers.push(watcher);
        }

        Ok(Self {
            _watchers: watchers,
            receiver: rx,
        })
    }

    /// Blocks until a burst of changes has settled and returns every file
    /// touched by it, in the order they were first reported.
    pub fn next_changes(&mut self) -> Result<Vec<PathBuf>> {
        let first = self
            .receiver
            .recv()
            .map_err(|_| Shader2hError::WatchClosed)?;
        Ok(settle(&self.receiver, first))
    }
}

// Editors tend to emit several modify events per save, often a truncate
// followed by the real write. Only report once the files stay quiet.
fn settle(receiver: &flume::Receiver<PathBuf>, first: PathBuf) -> Vec<PathBuf> {
    let mut changed = vec![first];
    loop {
        match receiver.recv_timeout(SETTLE_TIME) {
            Ok(path) => {
                if !changed.contains(&path) {
                    changed.push(path);
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return changed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_settle_waits_for_the_last_event() {
        let (tx, rx) = flume::unbounded();
        let a = PathBuf::from("a.frag");

        let sender = thread::spawn({
            let a = a.clone();
            move || {
                for _ in 0..3 {
                    thread::sleep(Duration::from_millis(20));
                    tx.send(a.clone()).unwrap();
                }
            }
        });

        let start = Instant::now();
        let changed = settle(&rx, a.clone());
        sender.join().unwrap();

        assert_eq!(changed, vec![a]);
        // Three events 20 ms apart, then one quiet settle period.
        assert!(start.elapsed() >= Duration::from_millis(60) + SETTLE_TIME);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_settle_collects_every_file_once() {
        let (tx, rx) = flume::unbounded();
        let a = PathBuf::from("a.frag");
        let b = PathBuf::from("b.vert");
        tx.send(b.clone()).unwrap();
        tx.send(a.clone()).unwrap();
        tx.send(b.clone()).unwrap();

        assert_eq!(settle(&rx, a.clone()), vec![a, b]);
    }

    #[test]
    fn test_settle_returns_when_senders_are_gone() {
        let (tx, rx) = flume::unbounded::<PathBuf>();
        drop(tx);
        let a = PathBuf::from("a.frag");
        assert_eq!(settle(&rx, a.clone()), vec![a]);
    }

    #[test]
    fn test_truncate_then_write_is_reported_after_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.frag");
        fs::write(&path, "initial").unwrap();

        let mut watcher = ShaderWatcher::new(std::slice::from_ref(&path)).unwrap();

        fs::write(&path, "").unwrap();
        thread::sleep(Duration::from_millis(20));
        fs::write(&path, "final").unwrap();

        let changed = watcher.next_changes().unwrap();
        assert_eq!(changed, vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "final");

        // The whole burst was consumed by the call above.
        assert!(watcher.receiver.is_empty());
    }

    #[test]
    fn test_watch_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.vert");
        assert!(matches!(
            ShaderWatcher::new(&[missing]),
            Err(Shader2hError::Watch(_))
        ));
    }
}
