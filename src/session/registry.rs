//! Process-wide registry of the live engine instance.
//!
//! The engine tolerates exactly one running instance. Rather than scanning
//! the OS process table, every session registers the child it launches
//! here; launching a new one terminates whatever is registered.

use log::warn;
use std::process::Child;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle to a launched engine process.
pub(crate) type InstanceHandle = Arc<Mutex<Child>>;

static LIVE: Mutex<Option<InstanceHandle>> = Mutex::new(None);

/// Force-terminates the registered instance, if any.
///
/// Returns the pid of the terminated process.
pub(crate) fn evict() -> Option<u32> {
    let previous = LIVE.lock().unwrap_or_else(PoisonError::into_inner).take()?;
    let mut child = previous.lock().unwrap_or_else(PoisonError::into_inner);
    let pid = child.id();
    terminate(&mut child);
    Some(pid)
}

/// Registers a freshly launched instance.
pub(crate) fn register(handle: InstanceHandle) {
    *LIVE.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
}

/// Removes `pid` from the registry if it is the registered instance.
pub(crate) fn release(pid: u32) {
    let mut live = LIVE.lock().unwrap_or_else(PoisonError::into_inner);
    let matches = live.as_ref().is_some_and(|handle| {
        handle
            .lock()
            .map(|child| child.id() == pid)
            .unwrap_or(false)
    });
    if matches {
        *live = None;
    }
}

/// Pid of the registered instance.
pub(crate) fn live_pid() -> Option<u32> {
    let live = LIVE.lock().unwrap_or_else(PoisonError::into_inner);
    let handle = live.as_ref()?;
    let child = handle.lock().unwrap_or_else(PoisonError::into_inner);
    Some(child.id())
}

/// Kills and reaps a child, ignoring an already-exited process.
pub(crate) fn terminate(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill() {
        warn!("failed to kill engine process {}: {e}", child.id());
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap engine process {}: {e}", child.id());
    }
}
