//! # Blocking Connection Pool
//!
//! A fixed-size pool of synchronous `postgres::Client` connections guarded
//! by a single mutex and condition variable. Unlike a typical async pool,
//! `acquire()` blocks the calling (OS) thread until a slot is free rather
//! than yielding a future — this is what lets the query composer issue a
//! session-scoped `SET TIME ZONE` immediately before every weather query
//! without racing another task's use of the same connection.
//!
//! ## Shape
//!
//! ```text
//! Pool { mutex(Vec<Slot>), condvar }
//! Slot = Idle(postgres::Client) | Busy
//! ```
//!
//! `acquire()` scans the vector from index 0 for the first free slot; if
//! none is free it waits on the condvar and rescans on every wakeup
//! (guards against spurious wakeups). `release()` scans for the matching
//! slot, clears its flag, and notifies one waiter. There is no explicit
//! FIFO queue — fairness is whatever the condvar's wait queue provides.
//!
//! A connection that has died surfaces as a query error to its borrower;
//! the pool does not health-check or recycle connections. The borrower is
//! still responsible for releasing the slot.

use postgres::{Client, NoTls};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::errors::ApiError;

enum Slot {
    Idle(Client),
    Busy,
}

struct Inner {
    slots: Mutex<Vec<Slot>>,
    available: Condvar,
}

/// A bounded pool of blocking Postgres connections.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<Inner>,
}

/// A connection on loan from the [`Pool`]. Dropping it without calling
/// [`Pool::release`] explicitly still releases the slot, but callers that
/// want the release to happen before doing further work (e.g. before
/// building the JSON response) should call `release` themselves.
pub struct PooledConnection {
    pool: Pool,
    index: usize,
    client: Option<Client>,
}

impl Pool {
    /// Establishes `size` connections up front. If any connection after the
    /// first fails, every connection already created is closed and the
    /// error is returned — callers are expected to log and exit the
    /// process on initialization failure, per the pool's "cannot fail once
    /// initialized" contract: failure only happens at startup.
    pub fn new(config: &DatabaseConfig, size: usize) -> Result<Self, ApiError> {
        let size = size.max(1);
        info!(size, host = %config.host, db = %config.name, "initializing connection pool");

        let mut slots = Vec::with_capacity(size);
        for i in 0..size {
            match connect(config) {
                Ok(client) => slots.push(Slot::Idle(client)),
                Err(e) => {
                    error!(error = %e, attempted = i, "failed to establish pool connection, rolling back");
                    drop(slots);
                    return Err(ApiError::DbError(e));
                }
            }
        }

        Ok(Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(slots),
                available: Condvar::new(),
            }),
        })
    }

    /// Blocks the calling thread until a connection is free, then claims
    /// it. This call cannot fail once the pool has been initialized — it
    /// blocks indefinitely rather than returning an error.
    pub fn acquire(&self) -> PooledConnection {
        let mut slots = self.inner.slots.lock().unwrap();
        loop {
            let free = slots
                .iter()
                .position(|s| matches!(s, Slot::Idle(_)));
            if let Some(index) = free {
                let client = match std::mem::replace(&mut slots[index], Slot::Busy) {
                    Slot::Idle(client) => client,
                    Slot::Busy => unreachable!("position() only returns Idle slots"),
                };
                return PooledConnection {
                    pool: self.clone(),
                    index,
                    client: Some(client),
                };
            }
            slots = self.inner.available.wait(slots).unwrap();
        }
    }

    /// Returns a connection to the pool and wakes at most one waiter.
    fn release(&self, index: usize, client: Client) {
        let mut slots = self.inner.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(index) {
            *slot = Slot::Idle(client);
        }
        drop(slots);
        self.inner.available.notify_one();
    }

    /// Closes every connection. Called once during graceful shutdown.
    pub fn shutdown(&self) {
        let mut slots = self.inner.slots.lock().unwrap();
        info!(size = slots.len(), "closing pool connections");
        slots.drain(..);
    }
}

impl PooledConnection {
    pub fn client(&mut self) -> &mut Client {
        self.client.as_mut().expect("client taken before release")
    }

    /// Returns the connection to the pool explicitly. Equivalent to letting
    /// the value drop, spelled out for call sites where the release point
    /// matters to the reader (e.g. right after the query, before building
    /// the JSON response).
    pub fn release(mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(self.index, client);
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(self.index, client);
        }
    }
}

fn connect(config: &DatabaseConfig) -> Result<Client, postgres::Error> {
    let conn_str = format!(
        "host={} port={} dbname={} user={} password={}",
        config.host, config.port, config.name, config.user, config.password
    );
    Client::connect(&conn_str, NoTls)
}

/// Runs a trivial liveness query through the pool. Used by `GET /healthz`.
pub fn health_check(pool: &Pool) -> Result<(), ApiError> {
    let mut conn = pool.acquire();
    conn.client().simple_query("SELECT 1").map_err(ApiError::DbError)?;
    if conn.client().is_closed() {
        warn!("health check observed a closed connection");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    // `Client` cannot be constructed without a live connection, so the
    // fairness/bound contract is verified directly against the
    // mutex+condvar+Vec<bool> shape the real pool is built from, rather
    // than against `Pool` itself. Connection establishment and the
    // `Pool`/`PooledConnection` API are covered by `#[ignore]`d
    // integration tests that require `DB_HOST` etc. to be set.
    #[test]
    fn never_exceeds_configured_slot_count() {
        let n = 3usize;
        let busy = Arc::new(Mutex::new(vec![false; n]));
        let cv = Arc::new(Condvar::new());
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let busy = busy.clone();
                let cv = cv.clone();
                let concurrent = concurrent.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    let mut guard = busy.lock().unwrap();
                    let idx = loop {
                        if let Some(i) = guard.iter().position(|b| !b) {
                            guard[i] = true;
                            break i;
                        }
                        guard = cv.wait(guard).unwrap();
                    };
                    drop(guard);

                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    concurrent.fetch_sub(1, Ordering::SeqCst);

                    let mut guard = busy.lock().unwrap();
                    guard[idx] = false;
                    drop(guard);
                    cv.notify_one();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= n);
    }
}
