//! Per-key single-flight gates.
//!
//! Holding a [`FlightGuard`] for a key means no other caller holds one for the
//! same key. Callers for different keys never wait on each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Gate = Arc<AsyncMutex<()>>;

/// Registry of per-key gates.
///
/// Gates are created on first use and dropped once nobody holds or waits
/// on them, so the registry only ever contains keys with a fetch in flight.
#[derive(Debug)]
pub(crate) struct SingleFlight<K> {
    gates: Mutex<HashMap<K, Gate>>,
}

impl<K> SingleFlight<K>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until no other caller holds the gate for `key`, then take it.
    ///
    /// Dropping the returned future while it waits releases its claim on the
    /// gate the same way dropping a [`FlightGuard`] does.
    pub(crate) async fn acquire(&self, key: K) -> FlightGuard<'_, K> {
        let claim = GateClaim {
            gate: Arc::clone(self.lock().entry(key.clone()).or_default()),
            flights: self,
            key,
        };
        let permit = Arc::clone(&claim.gate).lock_owned().await;
        FlightGuard {
            _permit: permit,
            _claim: claim,
        }
    }

    /// Number of keys with a holder or waiters.
    pub(crate) fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Gate>> {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One caller's reference to a key's gate, held while waiting and while
/// holding. Removes the gate from the registry when it is the last one.
#[derive(Debug)]
struct GateClaim<'a, K>
where
    K: Hash + Eq + Clone,
{
    flights: &'a SingleFlight<K>,
    key: K,
    gate: Gate,
}

impl<K> Drop for GateClaim<'_, K>
where
    K: Hash + Eq + Clone,
{
    fn drop(&mut self) {
        let mut gates = self.flights.lock();
        // Registry and this claim are the only owners left.
        // New claims clone the gate under the registry lock, so this cannot race.
        if Arc::strong_count(&self.gate) == 2 {
            gates.remove(&self.key);
        }
    }
}

/// Exclusive hold on one key's gate, released on drop.
#[derive(Debug)]
pub(crate) struct FlightGuard<'a, K>
where
    K: Hash + Eq + Clone,
{
    // Field order matters: the permit is released before the claim checks
    // whether anyone else still references the gate.
    _permit: OwnedMutexGuard<()>,
    _claim: GateClaim<'a, K>,
}
