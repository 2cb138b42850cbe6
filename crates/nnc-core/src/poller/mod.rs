// ── Polling session multiplexer ──
//
// One poll loop per resource key, fanned out to any number of
// subscriber queues. The loop is created together with its session
// under the sessions lock and torn down together with it, so a key
// never has more than one live loop.

mod interface;
mod traffic;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use crate::config::{PollLimits, PollingConfig};
use crate::error::CoreError;
use crate::events::{EventPublisher, MetricsEvent};
use crate::probe::{DeviceCommand, DeviceProbe, Record};

pub use interface::{INTERFACE_COUNTER_KEYS, InterfaceStatsPoller, InterfaceStatsSource};
pub use traffic::{SERVICE_COMMENT_PREFIX, ServiceTrafficPoller, ServiceTrafficSource};

pub type InterfaceFeed = Feed<crate::model::InterfaceKey, crate::model::InterfaceStats>;
pub type ServiceTrafficFeed = Feed<crate::model::ServiceKey, crate::model::ServiceTraffic>;

/// What a multiplexer polls and how it turns device records into points.
pub trait PollSource: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;
    type Point: Send + Sync + 'static;

    /// Component name used in logs and lifecycle errors.
    const NAME: &'static str;

    fn command(&self, key: &Self::Key) -> DeviceCommand;

    /// Build a point from a successful, non-empty fetch. `None` means the
    /// records carried nothing usable and the tick is skipped.
    fn build(
        &self,
        key: &Self::Key,
        records: &[Record],
        previous: Option<&Self::Point>,
        now: DateTime<Utc>,
    ) -> Option<Self::Point>;

    fn event(&self, point: Arc<Self::Point>) -> MetricsEvent;
}

/// Read-only view of one session, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub interval: Duration,
    pub subscribers: usize,
    pub last_fetch: Option<DateTime<Utc>>,
}

/// Keyed set of polling sessions sharing one device probe.
pub struct SessionMultiplexer<S: PollSource> {
    inner: Arc<Inner<S>>,
}

impl<S: PollSource> Clone for SessionMultiplexer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S: PollSource> {
    source: S,
    probe: Arc<dyn DeviceProbe>,
    events: EventPublisher,
    limits: PollLimits,
    fetch_timeout: Duration,
    queue_capacity: usize,
    sessions: Mutex<HashMap<S::Key, Session<S::Point>>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    next_id: AtomicU64,
}

struct Session<P> {
    interval: Duration,
    cancel: CancellationToken,
    subscribers: Arc<Mutex<Vec<Subscriber<P>>>>,
    last_fetch: Arc<Mutex<Option<DateTime<Utc>>>>,
}

struct Subscriber<P> {
    id: u64,
    tx: mpsc::Sender<Arc<P>>,
}

impl<S: PollSource> SessionMultiplexer<S> {
    pub fn new(
        source: S,
        probe: Arc<dyn DeviceProbe>,
        events: EventPublisher,
        limits: PollLimits,
        polling: &PollingConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                probe,
                events,
                limits,
                fetch_timeout: polling.fetch_timeout,
                queue_capacity: polling.queue_capacity.max(1),
                sessions: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn limits(&self) -> PollLimits {
        self.inner.limits
    }

    // ── Subscription ─────────────────────────────────────────────────

    /// Attach a new subscriber to `key`, starting its session if needed.
    ///
    /// `interval` is clamped to this instance's limits; `None` selects the
    /// default. An existing session keeps the interval it was created
    /// with. When `scope` is cancelled (or the returned feed is dropped)
    /// the subscriber is removed automatically.
    pub fn subscribe(
        &self,
        key: S::Key,
        interval: Option<Duration>,
        scope: &CancellationToken,
    ) -> Result<Feed<S::Key, S::Point>, CoreError> {
        let interval = self.inner.limits.clamp(interval);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);

        {
            let mut sessions = self.inner.sessions.lock();
            if self.inner.shutdown.is_cancelled() {
                return Err(CoreError::ShutDown { component: S::NAME });
            }
            let session = sessions.entry(key.clone()).or_insert_with(|| {
                let session = Session::new(interval, self.inner.shutdown.child_token());
                self.inner.spawn_loop(key.clone(), &session);
                debug!(poller = S::NAME, %key, ?interval, "polling session started");
                session
            });
            session.subscribers.lock().push(Subscriber { id, tx });
        }

        let token = scope.child_token();
        let inner = Arc::clone(&self.inner);
        let watch_key = key.clone();
        let watch_token = token.clone();
        self.inner.tracker.spawn(async move {
            tokio::select! {
                () = watch_token.cancelled() => {
                    inner.remove_subscriber(&watch_key, id);
                }
                () = inner.shutdown.cancelled() => {}
            }
        });

        Ok(Feed { key, id, rx, token })
    }

    /// Remove `feed` from its session. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, feed: Feed<S::Key, S::Point>) -> bool {
        self.inner.remove_subscriber(&feed.key, feed.id)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Cancel every session and wait for all poll loops to exit.
    ///
    /// Later subscribe calls fail with [`CoreError::ShutDown`].
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();
        let drained: Vec<_> = self.inner.sessions.lock().drain().collect();
        for (key, session) in drained {
            session.cancel.cancel();
            debug!(poller = S::NAME, %key, "polling session stopped");
        }
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    // ── Introspection ────────────────────────────────────────────────

    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .sessions
            .lock()
            .values()
            .map(|s| s.subscribers.lock().len())
            .sum()
    }

    pub fn session_info(&self, key: &S::Key) -> Option<SessionInfo> {
        let sessions = self.inner.sessions.lock();
        let session = sessions.get(key)?;
        Some(SessionInfo {
            interval: session.interval,
            subscribers: session.subscribers.lock().len(),
            last_fetch: *session.last_fetch.lock(),
        })
    }
}

impl<P> Session<P> {
    fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            interval,
            cancel,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            last_fetch: Arc::new(Mutex::new(None)),
        }
    }
}

impl<S: PollSource> Inner<S> {
    fn spawn_loop(self: &Arc<Self>, key: S::Key, session: &Session<S::Point>) {
        let inner = Arc::clone(self);
        let run = SessionRun {
            key,
            interval: session.interval,
            cancel: session.cancel.clone(),
            subscribers: Arc::clone(&session.subscribers),
            last_fetch: Arc::clone(&session.last_fetch),
        };
        self.tracker.spawn(async move { inner.poll_loop(run).await });
    }

    /// Drop one subscriber; tear the session down if it was the last.
    fn remove_subscriber(&self, key: &S::Key, id: u64) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get(key) else {
            return false;
        };

        let (removed, empty) = {
            let mut subs = session.subscribers.lock();
            let before = subs.len();
            subs.retain(|s| s.id != id);
            (subs.len() != before, subs.is_empty())
        };

        if !empty {
            return removed;
        }
        if let Some(session) = sessions.remove(key) {
            session.cancel.cancel();
            debug!(poller = S::NAME, %key, "last subscriber left, session torn down");
        }
        removed
    }

    // ── Poll loop ────────────────────────────────────────────────────

    async fn poll_loop(&self, run: SessionRun<S::Key, S::Point>) {
        let mut ticker = tokio::time::interval(run.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous: Option<Arc<S::Point>> = None;

        loop {
            // The first tick completes immediately: fetch on start.
            tokio::select! {
                biased;
                () = run.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let records = tokio::select! {
                biased;
                () = run.cancel.cancelled() => break,
                records = self.fetch(&run.key) => records,
            };
            let Some(records) = records else {
                continue;
            };

            let now = Utc::now();
            let Some(point) = self
                .source
                .build(&run.key, &records, previous.as_deref(), now)
            else {
                debug!(poller = S::NAME, key = %run.key, "fetch returned no counters, skipping tick");
                continue;
            };
            let point = Arc::new(point);
            *run.last_fetch.lock() = Some(now);

            run.broadcast(&point);
            self.events.publish(self.source.event(Arc::clone(&point)));
            previous = Some(point);
        }

        run.subscribers.lock().clear();
        debug!(poller = S::NAME, key = %run.key, "poll loop exited");
    }

    /// One bounded device fetch. Every failure mode yields `None`.
    async fn fetch(&self, key: &S::Key) -> Option<Vec<Record>> {
        let command = self.source.command(key);
        match tokio::time::timeout(self.fetch_timeout, self.probe.execute(&command)).await {
            Err(_) => {
                debug!(poller = S::NAME, %key, %command, "fetch timed out");
                None
            }
            Ok(Err(e)) => {
                debug!(poller = S::NAME, %key, error = %e, "fetch failed");
                None
            }
            Ok(Ok(result)) if !result.success => {
                debug!(
                    poller = S::NAME,
                    %key,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "device reported failure"
                );
                None
            }
            Ok(Ok(result)) if result.records.is_empty() => {
                debug!(poller = S::NAME, %key, "fetch returned no records");
                None
            }
            Ok(Ok(result)) => Some(result.records),
        }
    }
}

/// State handed to one poll loop.
struct SessionRun<K, P> {
    key: K,
    interval: Duration,
    cancel: CancellationToken,
    subscribers: Arc<Mutex<Vec<Subscriber<P>>>>,
    last_fetch: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl<K: fmt::Display, P> SessionRun<K, P> {
    /// Non-blocking send to every subscriber. A full queue loses this
    /// update for that subscriber only.
    fn broadcast(&self, point: &Arc<P>) {
        let senders: Vec<(u64, mpsc::Sender<Arc<P>>)> = self
            .subscribers
            .lock()
            .iter()
            .map(|s| (s.id, s.tx.clone()))
            .collect();

        for (id, tx) in senders {
            if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(Arc::clone(point)) {
                trace!(key = %self.key, subscriber = id, "subscriber queue full, update dropped");
            }
        }
    }
}

// ── Feed ─────────────────────────────────────────────────────────────

/// A subscriber's read-only handle on a session's data points.
///
/// Dropping the feed unsubscribes it.
pub struct Feed<K, P> {
    key: K,
    id: u64,
    rx: mpsc::Receiver<Arc<P>>,
    token: CancellationToken,
}

impl<K, P> Feed<K, P> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Next data point, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Arc<P>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Arc<P>, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Points currently buffered for this subscriber.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<K, P> Drop for Feed<K, P> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl<K: Unpin, P> futures_core::Stream for Feed<K, P> {
    type Item = Arc<P>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
