//! Re-entrancy guard around reconciliation and user requests.
//!
//! Reconciliation *tries* the guard and skips when it is held; a missed tick
//! is picked up by the next one. User requests *wait* for it, so a click is
//! never silently dropped because a probe happened to be running.
//!
//! Holding the guard is represented by a [`BusyToken`]. Dropping the token
//! releases the guard, so every exit path (early return, `?`, panic unwind)
//! lets the next caller in.

use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct BusyGuard {
    busy: Mutex<bool>,
    released: Condvar,
}

impl BusyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.busy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Acquires the guard if it is free; `None` when busy.
    pub fn try_acquire(&self) -> Option<BusyToken<'_>> {
        let mut busy = self.flag();
        if *busy {
            return None;
        }
        *busy = true;
        Some(BusyToken { guard: self })
    }

    /// Blocks until the guard is free, then acquires it.
    pub fn acquire(&self) -> BusyToken<'_> {
        let mut busy = self.flag();
        while *busy {
            busy = self
                .released
                .wait(busy)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *busy = true;
        BusyToken { guard: self }
    }

    pub fn is_busy(&self) -> bool {
        *self.flag()
    }

    fn release(&self) {
        *self.flag() = false;
        self.released.notify_one();
    }
}

/// Proof that the holder owns the [`BusyGuard`]. Releases it on drop.
#[derive(Debug)]
pub struct BusyToken<'a> {
    guard: &'a BusyGuard,
}

impl Drop for BusyToken<'_> {
    fn drop(&mut self) {
        self.guard.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_try_acquire_fails_while_held() {
        let guard = BusyGuard::new();
        let token = guard.try_acquire().expect("first acquire");
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());
        drop(token);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_token_released_on_early_return() {
        fn bail_early(guard: &BusyGuard) -> Result<(), String> {
            let _token = guard.try_acquire().ok_or("busy")?;
            Err("probe failed".to_string())
        }

        let guard = BusyGuard::new();
        assert!(bail_early(&guard).is_err());
        assert!(!guard.is_busy());
    }

    #[test]
    fn test_token_released_on_panic() {
        let guard = Arc::new(BusyGuard::new());
        let inner = Arc::clone(&guard);
        let result = thread::spawn(move || {
            let _token = inner.acquire();
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert!(!guard.is_busy());
    }

    #[test]
    fn test_acquire_waits_for_release() {
        let guard = Arc::new(BusyGuard::new());
        let token = guard.try_acquire().unwrap();

        let waiter = {
            let guard = Arc::clone(&guard);
            thread::spawn(move || {
                let _token = guard.acquire();
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        drop(token);
        waiter.join().unwrap();
        assert!(!guard.is_busy());
    }
}
