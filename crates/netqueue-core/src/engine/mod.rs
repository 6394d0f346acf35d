//! Bounded-concurrency request engine.
//!
//! Requests are accepted in arrival order and started strictly FIFO while
//! fewer than `max_concurrent` are running; the rest wait in the queue. Each
//! started request runs as its own Tokio task. When one returns, its slot is
//! freed, one promotion is attempted, and if nothing is running or queued the
//! drained notification fires.
//!
//! All bookkeeping happens under a single mutex in short, non-suspending
//! steps. Drained listeners run after the lock is released, so a listener may
//! call [`Engine::add`] to begin a fresh cycle.

mod admission;
mod guard;
mod submit;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::config::{self, NetqueueConfig};
use crate::request::{Job, Request, Services};

use admission::{Admission, TaskId};
use guard::SlotGuard;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identifies a drained listener registered with [`Engine::on_drained`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Point-in-time counters of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Requests waiting for a slot.
    pub queued: usize,
    /// Requests currently running.
    pub in_flight: usize,
    pub max_concurrent: usize,
    /// Requests promoted from the queue so far.
    pub started: u64,
    /// Requests whose `run` returned (success or failure alike).
    pub finished: u64,
    /// Requests dropped from the queue or abandoned in flight by `cancel_all`.
    pub cancelled: u64,
    /// Drained notifications fired so far.
    pub drains: u64,
}

/// Handle to one scheduling domain. Clones share the same queue and limit;
/// separate `Engine::new` calls share nothing.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    admission: Mutex<Admission<Request>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    /// Drain epoch; bumped once per drained notification.
    drains: watch::Sender<u64>,
    services: Services,
    runtime: Handle,
}

static GLOBAL: OnceLock<Engine> = OnceLock::new();

impl Engine {
    /// Create an engine that spawns requests on the current Tokio runtime.
    /// Negative limits are clamped to 0.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(max_concurrent: i64, services: Services) -> Self {
        Self::with_runtime(Handle::current(), max_concurrent, services)
    }

    /// Create an engine that spawns requests on `runtime`.
    pub fn with_runtime(runtime: Handle, max_concurrent: i64, services: Services) -> Self {
        let (drains, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                admission: Mutex::new(Admission::new(clamp_limit(max_concurrent))),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                drains,
                services,
                runtime,
            }),
        }
    }

    /// Engine with libcurl transport and on-disk bundle cache, limit from `cfg`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn from_config(cfg: &NetqueueConfig) -> Self {
        let runtime = Handle::current();
        let services = Services::from_config(runtime.clone(), cfg);
        Self::with_runtime(runtime, cfg.max_concurrent, services)
    }

    /// Process-wide default engine, created on first access from the user
    /// config (or defaults if it cannot be loaded).
    ///
    /// The engine stays bound to the runtime that first accessed it; prefer
    /// passing an explicit `Engine` where a runtime may be torn down.
    ///
    /// # Panics
    ///
    /// Panics if first accessed outside a Tokio runtime.
    pub fn global() -> &'static Engine {
        GLOBAL.get_or_init(|| {
            let cfg = config::load_or_init().unwrap_or_else(|e| {
                tracing::warn!("using default config for global engine: {:#}", e);
                NetqueueConfig::default()
            });
            Engine::from_config(&cfg)
        })
    }

    /// Enqueue `request` and start it right away if a slot is free.
    pub fn add(&self, request: impl Into<Request>) {
        let request = request.into();
        let mut admission = self.lock_admission();
        tracing::debug!(
            kind = request.kind(),
            url = request.url().unwrap_or("-"),
            queued = admission.queued(),
            in_flight = admission.in_flight(),
            "request queued"
        );
        admission.enqueue(request);
        self.start_next(&mut admission);
    }

    /// Schedule an arbitrary future like a request.
    pub fn add_job<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.add(Job::new(future));
    }

    pub fn max_concurrent(&self) -> usize {
        self.lock_admission().max_concurrent()
    }

    /// Change the concurrency limit (negative values clamp to 0).
    ///
    /// Raising it starts as many queued requests as the new slack allows, in
    /// FIFO order, before returning. Lowering it never touches running
    /// requests; it only holds back future promotions.
    pub fn set_max_concurrent(&self, max_concurrent: i64) {
        let limit = clamp_limit(max_concurrent);
        let mut admission = self.lock_admission();
        admission.set_max_concurrent(limit);
        let mut promoted = 0usize;
        while self.start_next(&mut admission) {
            promoted += 1;
        }
        tracing::debug!(limit, promoted, "concurrency limit changed");
    }

    /// Drop every queued request, abandon every running one, and fire the
    /// drained notification (even if nothing was outstanding).
    ///
    /// Running requests are aborted at their next suspension point; their
    /// operations are dropped, which tells the transport to stop. No callbacks
    /// of abandoned or dropped requests are invoked.
    pub fn cancel_all(&self) {
        let (dropped, aborts) = {
            let mut admission = self.lock_admission();
            let cancelled = admission.cancel_all();
            self.bump_drain_epoch();
            cancelled
        };
        for handle in &aborts {
            handle.abort();
        }
        tracing::info!(
            queued = dropped.len(),
            in_flight = aborts.len(),
            "cancelled all requests"
        );
        drop(dropped);
        self.call_listeners();
    }

    /// Register a listener invoked once per drain event.
    ///
    /// Listeners run after the engine lock is released. On a multi-threaded
    /// runtime a concurrent `add` may land between the drain and the call,
    /// so a listener can observe new work already queued or running. The
    /// [`drained`](Self::drained) future has no such window.
    pub fn on_drained<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Future resolving at the next drain event after this call.
    ///
    /// Subscribes immediately, so create it before adding the work whose
    /// completion it should observe.
    pub fn drained(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.inner.drains.subscribe();
        async move {
            let _ = rx.changed().await;
        }
    }

    pub fn stats(&self) -> EngineStats {
        let admission = self.lock_admission();
        EngineStats {
            queued: admission.queued(),
            in_flight: admission.in_flight(),
            max_concurrent: admission.max_concurrent(),
            started: admission.started(),
            finished: admission.finished(),
            cancelled: admission.cancelled(),
            drains: *self.inner.drains.borrow(),
        }
    }

    /// Promote the queue head if a slot is free. Returns true if one started.
    fn start_next(&self, admission: &mut Admission<Request>) -> bool {
        let Some((id, request)) = admission.promote() else {
            return false;
        };
        tracing::debug!(
            id,
            kind = request.kind(),
            url = request.url().unwrap_or("-"),
            in_flight = admission.in_flight(),
            "request started"
        );
        let task = self.inner.runtime.spawn(run_request(self.clone(), id, request));
        admission.attach(id, task.abort_handle());
        true
    }

    /// Called when a running request returns (via its slot guard).
    fn release(&self, id: TaskId) {
        {
            let mut admission = self.lock_admission();
            if !admission.finish(id) {
                return;
            }
            self.start_next(&mut admission);
            tracing::debug!(
                id,
                queued = admission.queued(),
                in_flight = admission.in_flight(),
                "request finished"
            );
            if !admission.is_drained() {
                return;
            }
            // Published while still drained.
            self.bump_drain_epoch();
        }
        tracing::info!("all requests completed");
        self.call_listeners();
    }

    /// Callers hold the admission lock.
    fn bump_drain_epoch(&self) {
        self.inner.drains.send_modify(|n| *n += 1);
    }

    fn call_listeners(&self) {
        let listeners: Vec<Listener> = self
            .lock_listeners()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn lock_admission(&self) -> MutexGuard<'_, Admission<Request>> {
        self.inner
            .admission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

async fn run_request(engine: Engine, id: TaskId, request: Request) {
    let services = engine.inner.services.clone();
    let _slot = SlotGuard { engine, id };
    request.run(&services).await;
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX)
}
