//! Background polling component.
//!
//! The component owns one worker thread that syncs, lifts the barrier gate
//! and then sleeps on the trigger gate until the poll interval elapses or
//! someone triggers it.
//!
//! ## Error Policy
//!
//! - Protocol errors (`ClientError::Sync`) are logged and the client is kept,
//!   so the agent sees the error on the next request
//! - Any other failure, including a panic inside a receiver, is logged and
//!   the client is replaced by a fresh one with an empty state
//! - Nothing escapes the worker thread

use crate::capabilities::Capabilities;
use crate::client::Client;
use crate::config::{ClientIdentity, ComponentConfig};
use crate::error::{ClientError, ComponentResult};
use crate::transport::Transport;
use confsync_core::{Gate, Release};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Which cycle a barrier waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierKind {
    /// The first completed cycle. Does not block once it has happened.
    Once,
    /// A cycle that started after this call.
    Next,
}

/// Counters maintained by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentStats {
    /// Completed cycles.
    pub cycles: u64,
    /// Cycles that ended with a protocol error.
    pub sync_errors: u64,
    /// Times the client was replaced after an unexpected error.
    pub client_resets: u64,
    /// Message of the last failure, cleared by a successful cycle.
    pub last_error: Option<String>,
}

/// State shared between the component handle and its worker.
struct Shared<T: Transport> {
    config: ComponentConfig,
    transport: Arc<T>,
    capabilities: Arc<Capabilities>,
    identity: ClientIdentity,
    client: RwLock<Arc<Client<T>>>,
    barrier: Gate,
    trigger: Gate,
    /// Trigger generation seen at the start of the last completed cycle.
    served: AtomicU64,
    stop: AtomicBool,
    stats: Mutex<ComponentStats>,
}

impl<T: Transport> Shared<T> {
    fn new_client(&self) -> Client<T> {
        Client::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.capabilities),
            self.identity.clone(),
        )
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn run(&self) {
        tracing::info!(thread = %self.config.thread_name, "remote worker started");

        while !self.stopped() {
            let triggers = self.trigger.generation();

            self.cycle();
            self.served.store(triggers, Ordering::SeqCst);
            self.barrier.lift();

            if self.stopped() {
                break;
            }
            self.trigger
                .wait_after_for(triggers, self.config.poll_interval);
        }

        tracing::info!(thread = %self.config.thread_name, "remote worker stopped");
    }

    /// Waits until a cycle that started at or after trigger generation
    /// `trigger` has completed, bounded by the barrier timeout.
    fn wait_served(&self, trigger: u64) -> Release {
        let deadline = Instant::now() + self.config.barrier_timeout;
        let mut release = Release::AlreadyReleased;

        loop {
            let observed = self.barrier.generation();
            if self.served.load(Ordering::SeqCst) >= trigger || self.stopped() {
                return release;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Release::TimedOut;
            }
            release = self.barrier.wait_after_for(observed, remaining);
            if release == Release::TimedOut {
                return release;
            }
        }
    }

    fn cycle(&self) {
        let client = Arc::clone(&*self.client.read());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| client.sync()));

        let mut stats = self.stats.lock();
        stats.cycles += 1;

        let failure = match outcome {
            Ok(Ok(_)) => {
                stats.last_error = None;
                return;
            }
            Ok(Err(ClientError::Sync(e))) => {
                tracing::error!(client = %client.id(), error = %e, "remote worker client sync error, skipping sync");
                stats.sync_errors += 1;
                stats.last_error = Some(e.to_string());
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        tracing::error!(client = %client.id(), error = %failure, "remote worker error, resetting client state");
        stats.client_resets += 1;
        stats.last_error = Some(failure);
        drop(stats);

        let fresh = Arc::new(self.new_client());
        tracing::info!(old = %client.id(), new = %fresh.id(), "remote client replaced");
        *self.client.write() = fresh;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic".to_string()
    }
}

/// Background remote configuration component.
///
/// Dropping the component shuts the worker down.
pub struct Component<T: Transport + 'static> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport + 'static> Component<T> {
    /// Starts the worker thread. The first cycle runs immediately.
    pub fn start(
        config: ComponentConfig,
        transport: Arc<T>,
        capabilities: Arc<Capabilities>,
        identity: ClientIdentity,
    ) -> ComponentResult<Self> {
        let client = Client::new(
            Arc::clone(&transport),
            Arc::clone(&capabilities),
            identity.clone(),
        );
        let shared = Arc::new(Shared {
            barrier: Gate::with_timeout(config.barrier_timeout),
            trigger: Gate::new(),
            served: AtomicU64::new(0),
            client: RwLock::new(Arc::new(client)),
            stop: AtomicBool::new(false),
            stats: Mutex::new(ComponentStats::default()),
            config,
            transport,
            capabilities,
            identity,
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(shared.config.thread_name.clone())
                .spawn(move || shared.run())?
        };

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Blocks until a cycle has completed, bounded by the barrier timeout.
    ///
    /// With [`BarrierKind::Next`], a cycle already running when this is
    /// called does not count; the worker is triggered and the call returns
    /// once a cycle started after the trigger has completed.
    ///
    /// A timeout is not an error: the caller proceeds without the
    /// configuration.
    pub fn barrier(&self, kind: BarrierKind) -> Release {
        match kind {
            BarrierKind::Once => self.shared.barrier.wait_once(),
            BarrierKind::Next => {
                self.shared.trigger.lift();
                let trigger = self.shared.trigger.generation();
                self.shared.wait_served(trigger)
            }
        }
    }

    /// Wakes the worker before the poll interval elapses.
    pub fn trigger(&self) {
        self.shared.trigger.lift();
    }

    /// Returns the current client.
    pub fn client(&self) -> Arc<Client<T>> {
        Arc::clone(&*self.shared.client.read())
    }

    /// Returns a snapshot of the worker counters.
    pub fn stats(&self) -> ComponentStats {
        self.shared.stats.lock().clone()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ComponentConfig {
        &self.shared.config
    }

    /// Returns true until the component is shut down.
    pub fn is_running(&self) -> bool {
        !self.shared.stopped()
    }

    /// Stops the worker and waits for it to exit. Idempotent.
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.trigger.lift();

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("remote worker thread panicked");
            }
        }

        self.shared.barrier.lift();
    }
}

impl<T: Transport + 'static> Drop for Component<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use crate::error::TransportResult;
    use confsync_protocol::{ConfigRequest, ConfigResponse};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Holds its first request until released.
    #[derive(Default)]
    struct HeldTransport {
        entered: Gate,
        release: Gate,
        calls: AtomicUsize,
    }

    impl Transport for HeldTransport {
        fn send_config(&self, _request: &ConfigRequest) -> TransportResult<ConfigResponse> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.lift();
                self.release.wait_once_for(Duration::from_secs(10));
            }
            Ok(ConfigResponse::empty())
        }
    }

    fn start<T: Transport + 'static>(transport: Arc<T>) -> Component<T> {
        let config = ComponentConfig::new()
            .with_poll_interval(Duration::from_secs(60))
            .with_barrier_timeout(Duration::from_secs(10))
            .with_thread_name("confsync-test");
        Component::start(
            config,
            transport,
            Arc::new(Capabilities::default()),
            ClientIdentity::default(),
        )
        .unwrap()
    }

    #[test]
    fn first_cycle_releases_barrier_once() {
        let transport = Arc::new(MockTransport::new());
        let component = start(Arc::clone(&transport));

        let first = component.barrier(BarrierKind::Once);
        assert!(matches!(first, Release::Lifted | Release::AlreadyReleased));
        assert_eq!(component.barrier(BarrierKind::Once), Release::AlreadyReleased);
        assert!(component.stats().cycles >= 1);
        assert!(transport.request_count() >= 1);
    }

    #[test]
    fn barrier_next_runs_another_cycle() {
        let transport = Arc::new(MockTransport::new());
        let component = start(Arc::clone(&transport));
        component.barrier(BarrierKind::Once);
        let before = transport.request_count();

        assert_ne!(component.barrier(BarrierKind::Next), Release::TimedOut);
        assert!(transport.request_count() > before);
    }

    #[test]
    fn barrier_next_skips_the_cycle_in_flight() {
        let transport = Arc::new(HeldTransport::default());
        let component = start(Arc::clone(&transport));
        transport.entered.wait_once_for(Duration::from_secs(10));

        thread::scope(|scope| {
            let waiter = scope.spawn(|| component.barrier(BarrierKind::Next));
            while component.shared.trigger.generation() == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            transport.release.lift();

            assert_ne!(waiter.join().unwrap(), Release::TimedOut);
        });

        assert_eq!(component.stats().cycles, 2);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let component = start(Arc::new(MockTransport::new()));
        assert!(component.is_running());
        component.shutdown();
        component.shutdown();
        assert!(!component.is_running());
    }

    #[test]
    fn unexpected_error_replaces_client() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fallback(Ok(ConfigResponse::empty()));
        transport.push_error(crate::error::TransportError::Request("refused".into()));
        let component = start(Arc::clone(&transport));

        component.barrier(BarrierKind::Once);
        let stats = component.stats();
        assert_eq!(stats.client_resets, 1);
        assert_eq!(stats.sync_errors, 0);
        assert!(stats.last_error.unwrap().contains("refused"));
    }
}
