// src/engine/binding.rs
//
// Temporary decode bindings.
//
// Every decode binds its source for exactly the duration of the decode call.
// A binding is a weighted permit against a decode memory budget: concurrent
// decodes block once the budget is spent, and the permit is handed back in
// Drop, so release happens on success, on error, while unwinding from a panic,
// and when an awaiting future is dropped.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Default decode budget: 512MB of decoded pixels in flight.
pub const DEFAULT_DECODE_BUDGET_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug)]
struct State {
    available: u64,
    active: usize,
    acquired: u64,
    released: u64,
}

/// Weighted semaphore that also keeps lifetime counters for diagnostics.
#[derive(Debug)]
pub struct BindingRegistry {
    capacity: u64,
    state: Mutex<State>,
    cvar: Condvar,
}

/// RAII guard for one bound source. Released exactly once, on drop.
#[derive(Debug)]
pub struct SourceBinding {
    registry: Arc<BindingRegistry>,
    weight: u64,
}

/// Snapshot of registry counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingStats {
    pub active: usize,
    pub acquired: u64,
    pub released: u64,
}

impl BindingRegistry {
    pub fn new(capacity: u64) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            capacity,
            state: Mutex::new(State {
                available: capacity,
                active: 0,
                acquired: 0,
                released: 0,
            }),
            cvar: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bind a source, blocking while the budget is exhausted.
    pub fn bind(self: &Arc<Self>, weight: u64) -> SourceBinding {
        let mut state = self.state.lock();
        // clamp absurd weights to capacity to avoid deadlock
        let need = weight.clamp(1, self.capacity);
        while state.available < need {
            self.cvar.wait(&mut state);
        }
        state.available -= need;
        state.active += 1;
        state.acquired += 1;
        SourceBinding {
            registry: Arc::clone(self),
            weight: need,
        }
    }

    fn release(&self, weight: u64) {
        let mut state = self.state.lock();
        state.available = state.available.saturating_add(weight).min(self.capacity);
        state.active = state.active.saturating_sub(1);
        state.released += 1;
        // Waiters have heterogeneous weights; notify_one could starve a small one.
        self.cvar.notify_all();
    }

    /// Number of bindings currently held.
    pub fn active(&self) -> usize {
        self.state.lock().active
    }

    pub fn stats(&self) -> BindingStats {
        let state = self.state.lock();
        BindingStats {
            active: state.active,
            acquired: state.acquired,
            released: state.released,
        }
    }
}

impl SourceBinding {
    pub fn weight(&self) -> u64 {
        self.weight
    }
}

impl Drop for SourceBinding {
    fn drop(&mut self) {
        self.registry.release(self.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn bind_and_drop_balances_counters() {
        let registry = BindingRegistry::new(100);
        {
            let a = registry.bind(10);
            let _b = registry.bind(20);
            assert_eq!(a.weight(), 10);
            assert_eq!(registry.active(), 2);
        }
        assert_eq!(
            registry.stats(),
            BindingStats {
                active: 0,
                acquired: 2,
                released: 2
            }
        );
    }

    #[test]
    fn oversized_weight_is_clamped() {
        let registry = BindingRegistry::new(8);
        let binding = registry.bind(1_000);
        assert_eq!(binding.weight(), 8);
    }

    #[test]
    fn release_on_panic_unwind() {
        let registry = BindingRegistry::new(16);
        let reg = Arc::clone(&registry);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _binding = reg.bind(4);
            panic!("caller continuation failed");
        }));
        assert!(result.is_err());
        assert_eq!(registry.active(), 0);
        assert_eq!(registry.stats().released, 1);
    }

    #[test]
    fn exhausted_budget_blocks_until_release() {
        let registry = BindingRegistry::new(10);
        let held = registry.bind(10);
        let done = Arc::new(AtomicBool::new(false));

        let reg = Arc::clone(&registry);
        let flag = Arc::clone(&done);
        let waiter = thread::spawn(move || {
            let _b = reg.bind(5);
            flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));
        drop(held);
        waiter.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(registry.active(), 0);
    }
}
