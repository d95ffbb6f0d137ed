//! Background priority loader for saved workspaces (spec §4.H): startup
//! touches exactly one workspace file synchronously, everything else loads
//! on a background thread ordered by priority.

use std::collections::BinaryHeap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::workspace::{Workspace, WorkspaceSlot, WorkspaceStore};

use super::cache::LruCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    priority: Priority,
    /// Earlier enqueue wins among equal priorities (min-heap on sequence).
    sequence: u64,
    slot: WorkspaceSlot,
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

enum Command {
    Enqueue(QueueEntry),
    Invalidate(WorkspaceSlot),
    Shutdown,
}

/// Loads workspaces lazily and caches the most recently used ones.
///
/// `initialize` performs one synchronous load (the active workspace) so the
/// UI can render immediately; every other saved slot is queued onto a
/// background thread that drains highest-priority-first.
pub struct LazyLoader {
    store: Arc<WorkspaceStore>,
    cache: Arc<Mutex<LruCache>>,
    tx: Sender<Command>,
    worker: Option<thread::JoinHandle<()>>,
    sequence: u64,
}

impl LazyLoader {
    #[must_use]
    pub fn new(store: WorkspaceStore, cache_capacity: usize) -> Self {
        let store = Arc::new(store);
        let cache = Arc::new(Mutex::new(LruCache::new(cache_capacity)));
        let (tx, rx) = mpsc::channel();

        let worker = spawn_worker(Arc::clone(&store), Arc::clone(&cache), rx);

        LazyLoader {
            store,
            cache,
            tx,
            worker: Some(worker),
            sequence: 0,
        }
    }

    /// Synchronously load exactly one workspace (the one the UI opens to)
    /// and queue every other saved slot for background warm-up.
    pub fn initialize(&mut self, active_slot: WorkspaceSlot) {
        if let Some(workspace) = self.store.load_slot(active_slot) {
            self.cache.lock().unwrap().insert(active_slot, workspace);
        }
        for slot in self.store.list_slots() {
            if slot != active_slot {
                self.prefetch(slot, Priority::Low);
            }
        }
    }

    /// Cache hit returns immediately; a miss falls back to a synchronous
    /// load right here rather than blocking on the background queue, since
    /// a miss means the UI needs it now.
    pub fn get_workspace(&mut self, slot: WorkspaceSlot) -> Option<Workspace> {
        if let Some(workspace) = self.cache.lock().unwrap().get(slot) {
            return Some(workspace.clone());
        }
        let workspace = self.store.load_slot(slot)?;
        self.cache.lock().unwrap().insert(slot, workspace.clone());
        Some(workspace)
    }

    pub fn prefetch(&mut self, slot: WorkspaceSlot, priority: Priority) {
        self.sequence += 1;
        let _ = self.tx.send(Command::Enqueue(QueueEntry {
            priority,
            sequence: self.sequence,
            slot,
        }));
    }

    pub fn invalidate(&mut self, slot: WorkspaceSlot) {
        self.cache.lock().unwrap().invalidate(slot);
        let _ = self.tx.send(Command::Invalidate(slot));
    }

    pub fn shutdown(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for LazyLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    store: Arc<WorkspaceStore>,
    cache: Arc<Mutex<LruCache>>,
    rx: Receiver<Command>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut queue: BinaryHeap<QueueEntry> = BinaryHeap::new();
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Command::Enqueue(entry)) => queue.push(entry),
                Ok(Command::Invalidate(slot)) => {
                    queue.retain(|entry| entry.slot != slot);
                }
                Ok(Command::Shutdown) => return,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => return,
            }

            while let Ok(cmd) = rx.try_recv() {
                match cmd {
                    Command::Enqueue(entry) => queue.push(entry),
                    Command::Invalidate(slot) => queue.retain(|entry| entry.slot != slot),
                    Command::Shutdown => return,
                }
            }

            if let Some(entry) = queue.pop() {
                if let Some(workspace) = store.load_slot(entry.slot) {
                    cache.lock().unwrap().insert(entry.slot, workspace);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;

    #[test]
    fn initialize_synchronously_loads_the_active_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path().to_path_buf());
        store.save_slot(0, &Workspace::new("active".into(), 0)).unwrap();

        let mut loader = LazyLoader::new(store, 10);
        loader.initialize(0);
        let workspace = loader.get_workspace(0).expect("cached on initialize");
        assert_eq!(workspace.name, "active");
    }

    #[test]
    fn get_workspace_falls_back_to_synchronous_load_on_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path().to_path_buf());
        store.save_slot(3, &Workspace::new("three".into(), 0)).unwrap();

        let mut loader = LazyLoader::new(store, 10);
        let workspace = loader.get_workspace(3).expect("synchronous fallback");
        assert_eq!(workspace.name, "three");
    }

    #[test]
    fn background_prefetch_eventually_populates_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path().to_path_buf());
        store.save_slot(1, &Workspace::new("one".into(), 0)).unwrap();

        let mut loader = LazyLoader::new(store, 10);
        loader.prefetch(1, Priority::High);

        let mut found = false;
        for _ in 0..50 {
            std::thread::sleep(Duration::from_millis(20));
            if loader.cache.lock().unwrap().peek(1).is_some() {
                found = true;
                break;
            }
        }
        assert!(found, "background worker should have loaded slot 1");
    }

    #[test]
    fn invalidate_clears_cached_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path().to_path_buf());
        store.save_slot(2, &Workspace::new("two".into(), 0)).unwrap();

        let mut loader = LazyLoader::new(store, 10);
        loader.get_workspace(2);
        loader.invalidate(2);
        assert!(loader.cache.lock().unwrap().peek(2).is_none());
    }
}
