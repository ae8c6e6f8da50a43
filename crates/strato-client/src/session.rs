//! Session state: immutable configuration plus the lazily built runtime.
//!
//! A [`Session`] is created once per logical connection to the backend and
//! lives for the process; all operations against one account share it
//! (behind an `Arc` when used from several tasks). The immutable
//! [`SessionConfig`] is separated from the runtime cache — HTTP transport,
//! slot pool and token manager — which is built exactly once on first use.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OnceCell, OwnedSemaphorePermit, Semaphore};

use strato_auth::{AuthConfig, TokenManager};
use strato_core::HostRegistry;

/// Default number of simultaneously in-flight requests per session.
pub const DEFAULT_SLOT_CAPACITY: usize = 6;

/// Immutable configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The account all operations are scoped to.
    pub account_id: String,
    /// The client (agent) identifier this session acts as.
    pub client_id: String,
    /// Logical host tag to base URL mapping.
    pub hosts: HostRegistry,
    /// Token-acquisition configuration.
    pub auth: AuthConfig,
    /// Capacity of the slot pool bounding in-flight requests.
    pub slot_capacity: usize,
    /// Per-request timeout of the HTTP transport.
    pub request_timeout: Duration,
}

impl SessionConfig {
    /// Create a configuration with production hosts and default limits.
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        client_id: impl Into<String>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            client_id: client_id.into(),
            hosts: HostRegistry::default(),
            auth,
            slot_capacity: DEFAULT_SLOT_CAPACITY,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Replace the host registry (staging environments, tests).
    #[must_use]
    pub fn with_hosts(mut self, hosts: HostRegistry) -> Self {
        self.hosts = hosts;
        self
    }

    /// Override the slot-pool capacity. A capacity of zero is treated as
    /// one; a pool that can never be entered would deadlock every caller.
    #[must_use]
    pub fn with_slot_capacity(mut self, capacity: usize) -> Self {
        self.slot_capacity = capacity.max(1);
        self
    }
}

/// Bounded pool of request slots.
///
/// One unit is acquired before any outbound call and released when the
/// returned [`SlotPermit`] drops, so the unit is returned on every exit
/// path. The caller past capacity queues and waits; it is never rejected.
#[derive(Debug, Clone)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl SlotPool {
    /// Create a pool with the given capacity (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Acquire one slot, waiting if the pool is exhausted.
    ///
    /// # Panics
    ///
    /// Panics if the underlying semaphore has been closed, which this type
    /// never does.
    pub async fn acquire(&self) -> SlotPermit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("slot pool semaphore closed");
        SlotPermit { _permit: permit }
    }

    /// The configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// RAII guard for one slot; dropping it releases the slot.
#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}

/// The lazily initialized, shared runtime of a session.
pub(crate) struct Runtime {
    pub(crate) http: reqwest::Client,
    pub(crate) slots: SlotPool,
    pub(crate) tokens: TokenManager,
}

impl Runtime {
    fn build(config: &SessionConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to create HTTP client");

        let tokens = TokenManager::with_client(http.clone(), config.auth.clone());

        tracing::debug!(
            slot_capacity = config.slot_capacity,
            account_id = %config.account_id,
            "Initialized session runtime"
        );

        Self {
            http,
            slots: SlotPool::new(config.slot_capacity),
            tokens,
        }
    }
}

/// A long-lived connection to the control plane.
///
/// Construction is cheap and performs no I/O; the transport, slot pool and
/// token manager are built exactly once on first use, and repeated or
/// concurrent initialization is idempotent.
pub struct Session {
    config: SessionConfig,
    runtime: OnceCell<Runtime>,
}

impl Session {
    /// Create a session from its immutable configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            runtime: OnceCell::new(),
        }
    }

    /// The session's configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Eagerly initialize the transport and slot pool.
    ///
    /// Calling this is optional — the first request initializes lazily —
    /// and always idempotent.
    pub async fn init(&self) {
        let _ = self.runtime().await;
    }

    pub(crate) async fn runtime(&self) -> &Runtime {
        self.runtime
            .get_or_init(|| async { Runtime::build(&self.config) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config() -> SessionConfig {
        SessionConfig::new("acct-1", "client-1", AuthConfig::default())
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(SlotPool::new(0).capacity(), 1);
        let config = test_config().with_slot_capacity(0);
        assert_eq!(config.slot_capacity, 1);
    }

    #[tokio::test]
    async fn permit_released_on_drop() {
        let pool = SlotPool::new(2);
        let first = pool.acquire().await;
        let _second = pool.acquire().await;
        assert_eq!(pool.available(), 0);
        drop(first);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_holders_never_exceed_capacity() {
        const CAPACITY: usize = 2;
        const CALLERS: usize = 8;

        let pool = SlotPool::new(CAPACITY);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..CALLERS {
            let pool = pool.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _slot = pool.acquire().await;
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= CAPACITY);
        assert_eq!(pool.available(), CAPACITY);
    }

    #[tokio::test]
    async fn extra_caller_waits_for_a_release() {
        let pool = SlotPool::new(1);
        let held = pool.acquire().await;

        let released = Arc::new(AtomicUsize::new(0));
        let waiter = tokio::spawn({
            let pool = pool.clone();
            let released = Arc::clone(&released);
            async move {
                let _slot = pool.acquire().await;
                // Visible only after the holder released
                assert_eq!(released.load(Ordering::SeqCst), 1);
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished(), "waiter ran before a slot was free");

        released.store(1, Ordering::SeqCst);
        drop(held);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let session = Session::new(test_config());
        session.init().await;
        let first: *const Runtime = session.runtime().await;
        session.init().await;
        let second: *const Runtime = session.runtime().await;
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_init_builds_one_runtime() {
        let session = Arc::new(Session::new(test_config()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                session.runtime().await as *const Runtime as usize
            }));
        }

        let mut addresses = Vec::new();
        for handle in handles {
            addresses.push(handle.await.unwrap());
        }
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), 1);
        assert_eq!(
            session.runtime().await.slots.capacity(),
            DEFAULT_SLOT_CAPACITY
        );
    }
}
