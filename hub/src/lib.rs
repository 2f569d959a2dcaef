//! # Strata Hub
//!
//! Delivers configuration-changed notifications to subscriber callbacks
//! with at-most-once-per-commit semantics.
//!
//! Subscriber lists are immutable vectors replaced wholesale on mutation
//! (copy-on-write), so a notification pass iterates a stable list without
//! holding any lock while user callbacks run. One background task polls
//! the backing store's commit token and triggers a reload-and-notify pass
//! when it changes.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use strata_core::types::{Commit, ScopeAxis};
use strata_errors::ResolveError;
use strata_settings::{Materialized, SettingsClient};

/// A subscriber callback. Receives the materialization result for its own
/// scope and a hub reference usable for unsubscribing from within the
/// callback. Invoked with no hub locks held; must not be assumed
/// reentrant-safe by other subscribers.
pub type SettingsCallback<S, T, D> =
    dyn Fn(Result<Materialized<S, T, D>, ResolveError>, &NotificationHub<S, T, D>) + Send + Sync;

struct Subscription<S, T: ScopeAxis, D: ScopeAxis> {
    tier: T,
    data_center: D,
    callback: Arc<SettingsCallback<S, T, D>>,
    state: Mutex<NotifyState>,
}

/// `notified` distinguishes "never delivered" from "delivered at the
/// no-overrides-yet commit", where the commit token itself is `None`.
#[derive(Default)]
struct NotifyState {
    notified: bool,
    last_commit: Option<Commit>,
}

type SubscriberList<S, T, D> = Arc<Vec<Arc<Subscription<S, T, D>>>>;

pub struct NotificationHub<S, T: ScopeAxis, D: ScopeAxis> {
    client: Arc<SettingsClient<S, T, D>>,
    subscribers: Mutex<HashMap<String, SubscriberList<S, T, D>>>,
    poll_interval: Duration,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S, T, D> NotificationHub<S, T, D>
where
    S: Default + Send + Sync + 'static,
    T: ScopeAxis,
    D: ScopeAxis,
{
    /// Create the hub and, unless `poll_interval` is zero, start the poll
    /// task. Must be called from within a tokio runtime when polling is
    /// enabled.
    pub fn new(client: Arc<SettingsClient<S, T, D>>, poll_interval: Duration) -> Arc<Self> {
        let hub = Arc::new(Self {
            client,
            subscribers: Mutex::new(HashMap::new()),
            poll_interval,
            poll_task: Mutex::new(None),
        });
        hub.start();
        hub
    }

    pub fn client(&self) -> &Arc<SettingsClient<S, T, D>> {
        &self.client
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Register a callback for `(app_name, tier, data_center)`.
    ///
    /// Idempotent: re-subscribing the same callback `Arc` for the same
    /// scope is a no-op and returns `false`. On first registration one
    /// reload-and-notify cycle runs for *all* current subscribers of the
    /// app before this returns, so state is fresh after any topology
    /// change.
    pub async fn subscribe(
        &self,
        app_name: &str,
        tier: T,
        data_center: D,
        callback: Arc<SettingsCallback<S, T, D>>,
    ) -> bool {
        let added = {
            let mut subscribers = self.subscribers.lock();
            let list = subscribers
                .entry(app_name.to_string())
                .or_insert_with(|| Arc::new(Vec::new()));
            let exists = list.iter().any(|s| {
                s.tier == tier
                    && s.data_center == data_center
                    && Arc::ptr_eq(&s.callback, &callback)
            });
            if exists {
                false
            } else {
                let mut replacement = list.as_ref().clone();
                replacement.push(Arc::new(Subscription {
                    tier,
                    data_center,
                    callback,
                    state: Mutex::new(NotifyState::default()),
                }));
                *list = Arc::new(replacement);
                true
            }
        };

        if added {
            info!(app = app_name, "subscriber registered");
            self.reload_and_notify(app_name).await;
        }
        added
    }

    /// Remove subscriptions for `app_name` matching the given filters; an
    /// absent filter matches any value. Returns the number removed.
    ///
    /// A notification pass already in flight may still deliver one last
    /// callback after this returns; that race is accepted.
    pub fn unsubscribe(
        &self,
        app_name: &str,
        tier: Option<T>,
        data_center: Option<D>,
        callback: Option<&Arc<SettingsCallback<S, T, D>>>,
    ) -> usize {
        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(app_name) else {
            return 0;
        };
        let retained: Vec<_> = list
            .iter()
            .filter(|s| {
                !(tier.is_none_or(|t| s.tier == t)
                    && data_center.is_none_or(|d| s.data_center == d)
                    && callback.is_none_or(|c| Arc::ptr_eq(&s.callback, c)))
            })
            .cloned()
            .collect();
        let removed = list.len() - retained.len();
        if retained.is_empty() {
            subscribers.remove(app_name);
        } else {
            *list = Arc::new(retained);
        }
        if removed > 0 {
            info!(app = app_name, removed, "subscribers removed");
        }
        removed
    }

    /// One poll tick: for every subscribed app, compare the store's current
    /// commit with the cached snapshot's and reload-and-notify on mismatch.
    pub async fn poll_once(&self) {
        let apps: Vec<String> = self.subscribers.lock().keys().cloned().collect();
        for app_name in apps {
            match self.client.get_current_commit(&app_name).await {
                Ok(current) => {
                    let changed = match self.client.cached_commit(&app_name) {
                        Some(cached) => cached != current,
                        None => true,
                    };
                    if changed {
                        debug!(app = %app_name, "override commit changed");
                        self.reload_and_notify(&app_name).await;
                    }
                }
                Err(e) => {
                    error!(app = %app_name, error = %e, "poll tick failed to read commit");
                }
            }
        }
    }

    /// Fetch one consistent snapshot for `app_name` and notify every
    /// subscriber not already at its commit.
    ///
    /// A materialization failure for one subscriber is delivered to that
    /// subscriber's callback only and never suppresses delivery to the
    /// others; callback panics are caught so they cannot break the
    /// dispatch loop. A subscriber's last-notified commit advances only on
    /// successful materialization.
    pub async fn reload_and_notify(&self, app_name: &str) {
        let snapshot = match self.client.snapshot(app_name).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(app = app_name, error = %e, "snapshot fetch failed, skipping notification pass");
                return;
            }
        };

        let Some(subscribers) = self.subscribers.lock().get(app_name).cloned() else {
            return;
        };

        for subscription in subscribers.iter() {
            let already_informed = {
                let state = subscription.state.lock();
                state.notified && state.last_commit == snapshot.commit
            };
            if already_informed {
                continue;
            }

            let result = self.client.get_from_snapshot(
                &snapshot,
                subscription.tier,
                subscription.data_center,
                None,
            );
            if result.is_ok() {
                let mut state = subscription.state.lock();
                state.notified = true;
                state.last_commit = snapshot.commit.clone();
            }

            let callback = Arc::clone(&subscription.callback);
            let outcome =
                std::panic::catch_unwind(AssertUnwindSafe(|| callback(result, self)));
            if outcome.is_err() {
                error!(app = app_name, "subscriber callback panicked");
            }
        }
    }

    fn start(self: &Arc<Self>) {
        if self.poll_interval.is_zero() {
            info!("change polling disabled");
            return;
        }
        let weak = Arc::downgrade(self);
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(hub) = weak.upgrade() else {
                    break;
                };
                hub.poll_once().await;
            }
        });
        *self.poll_task.lock() = Some(handle);
    }

    /// Stop the poll task. Subscriptions remain registered; explicit
    /// `reload_and_notify`/`poll_once` calls still work.
    pub fn shutdown(&self) {
        if let Some(handle) = self.poll_task.lock().take() {
            handle.abort();
        }
    }
}

impl<S, T: ScopeAxis, D: ScopeAxis> Drop for NotificationHub<S, T, D> {
    fn drop(&mut self) {
        if let Some(handle) = self.poll_task.lock().take() {
            handle.abort();
        }
    }
}
