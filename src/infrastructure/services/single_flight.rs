//! Miss coalescing: concurrent callers for one key share a single future

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type SharedCall<T> = Shared<BoxFuture<'static, T>>;

/// Registry of in-flight calls keyed by cache key
///
/// The first caller for a key starts the work; callers arriving while it runs
/// await the same shared future. The entry is dropped once the call resolves,
/// so a later caller starts fresh work.
pub struct SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    in_flight: Mutex<HashMap<String, SharedCall<T>>>,
}

impl<T> fmt::Debug for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `start()` for `key` unless a call for `key` is already running,
    /// in which case its result is awaited instead
    pub async fn run<F>(&self, key: &str, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let call = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(call) = in_flight.get(key).cloned() {
                call
            } else {
                let call = start().shared();
                in_flight.insert(key.to_string(), call.clone());
                call
            }
        };

        let output = call.clone().await;

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(key)
            .is_some_and(|current| Shared::ptr_eq(current, &call))
        {
            in_flight.remove(key);
        }

        output
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
