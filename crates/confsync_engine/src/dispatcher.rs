//! Routing of committed changes to receivers.

use crate::error::ReceiverError;
use confsync_core::{Change, ChangeSet, RepositoryState};
use confsync_protocol::Path;
use std::fmt;
use std::sync::Arc;

/// A consumer of configuration changes for a set of products.
pub trait Receiver: Send + Sync {
    /// Products this receiver is interested in.
    fn products(&self) -> &[String];

    /// Applies the changes that matched this receiver.
    ///
    /// `state` is the snapshot the changes were committed into.
    fn apply(&self, changes: &[&Change], state: &RepositoryState) -> Result<(), ReceiverError>;

    /// Returns true if the receiver handles `product`.
    fn matches(&self, product: &str) -> bool {
        self.products().iter().any(|p| p == product)
    }
}

/// A receiver backed by a closure.
pub struct ProductReceiver<F> {
    products: Vec<String>,
    handler: F,
}

impl<F> ProductReceiver<F>
where
    F: Fn(&[&Change], &RepositoryState) -> Result<(), ReceiverError> + Send + Sync,
{
    /// Creates a receiver for `products` that calls `handler`.
    pub fn new<I, S>(products: I, handler: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            products: products.into_iter().map(Into::into).collect(),
            handler,
        }
    }
}

impl<F> Receiver for ProductReceiver<F>
where
    F: Fn(&[&Change], &RepositoryState) -> Result<(), ReceiverError> + Send + Sync,
{
    fn products(&self) -> &[String] {
        &self.products
    }

    fn apply(&self, changes: &[&Change], state: &RepositoryState) -> Result<(), ReceiverError> {
        (self.handler)(changes, state)
    }
}

impl<F> fmt::Debug for ProductReceiver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductReceiver")
            .field("products", &self.products)
            .finish_non_exhaustive()
    }
}

/// Hands changes to the receivers interested in their product.
#[derive(Clone, Default)]
pub struct Dispatcher {
    receivers: Vec<Arc<dyn Receiver>>,
}

impl Dispatcher {
    /// Creates a dispatcher without receivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher with the given receivers, in order.
    pub fn with_receivers(receivers: impl IntoIterator<Item = Arc<dyn Receiver>>) -> Self {
        Self {
            receivers: receivers.into_iter().collect(),
        }
    }

    /// Appends a receiver.
    pub fn register(&mut self, receiver: Arc<dyn Receiver>) {
        self.receivers.push(receiver);
    }

    /// Returns the receivers in registration order.
    pub fn receivers(&self) -> &[Arc<dyn Receiver>] {
        &self.receivers
    }

    /// Returns the number of receivers.
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    /// Returns true if no receiver is registered.
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Dispatches `changes` to interested receivers in registration order.
    ///
    /// A receiver is only called if at least one change matches its
    /// products. The first receiver error stops dispatch and is returned.
    /// On success, returns every path handed to at least one receiver.
    pub fn dispatch(
        &self,
        changes: &ChangeSet,
        state: &RepositoryState,
    ) -> Result<Vec<Path>, ReceiverError> {
        let mut delivered: Vec<Path> = Vec::new();

        for receiver in &self.receivers {
            let matching: Vec<&Change> = changes
                .iter()
                .filter(|change| receiver.matches(change.product()))
                .collect();
            if matching.is_empty() {
                continue;
            }

            tracing::debug!(
                products = ?receiver.products(),
                changes = matching.len(),
                "dispatching changes"
            );
            receiver.apply(&matching, state)?;

            for change in matching {
                if !delivered.contains(change.path()) {
                    delivered.push(change.path().clone());
                }
            }
        }

        Ok(delivered)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("receivers", &self.receivers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confsync_protocol::Content;
    use parking_lot::Mutex;

    fn inserted(raw: &str) -> Change {
        let path = Path::parse(raw).unwrap();
        Change::Inserted {
            content: Content::new(path.clone(), raw.as_bytes().to_vec()),
            path,
        }
    }

    fn recorder(
        products: &[&str],
        seen: Arc<Mutex<Vec<String>>>,
    ) -> Arc<dyn Receiver> {
        let products: Vec<String> = products.iter().map(|p| p.to_string()).collect();
        Arc::new(ProductReceiver::new(products, move |changes: &[&Change], _: &RepositoryState| {
            let mut seen = seen.lock();
            seen.extend(changes.iter().map(|c| c.path().to_string()));
            Ok(())
        }))
    }

    #[test]
    fn routes_changes_by_product() {
        let features = Arc::new(Mutex::new(Vec::new()));
        let rules = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::with_receivers([
            recorder(&["ASM_FEATURES"], Arc::clone(&features)),
            recorder(&["ASM_DD", "ASM"], Arc::clone(&rules)),
        ]);

        let mut changes = ChangeSet::new();
        changes.push(inserted("datadog/2/ASM_DD/a/config"));
        changes.push(inserted("datadog/2/ASM_FEATURES/b/config"));
        changes.push(inserted("datadog/2/LIVE_DEBUGGING/c/config"));

        let delivered = dispatcher
            .dispatch(&changes, &RepositoryState::new())
            .unwrap();

        assert_eq!(*features.lock(), vec!["datadog/2/ASM_FEATURES/b/config"]);
        assert_eq!(*rules.lock(), vec!["datadog/2/ASM_DD/a/config"]);
        assert_eq!(delivered.len(), 2);
        assert!(!delivered.contains(&Path::parse("datadog/2/LIVE_DEBUGGING/c/config").unwrap()));
    }

    #[test]
    fn uninterested_receiver_is_not_called() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);
        let dispatcher = Dispatcher::with_receivers([Arc::new(ProductReceiver::new(
            ["ASM_DATA"],
            move |_: &[&Change], _: &RepositoryState| {
                *counter.lock() += 1;
                Ok(())
            },
        )) as Arc<dyn Receiver>]);

        let mut changes = ChangeSet::new();
        changes.push(inserted("datadog/2/ASM_DD/a/config"));
        dispatcher
            .dispatch(&changes, &RepositoryState::new())
            .unwrap();

        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn first_error_stops_dispatch() {
        let later = Arc::new(Mutex::new(Vec::new()));
        let failing: Arc<dyn Receiver> = Arc::new(ProductReceiver::new(
            ["ASM_DD"],
            |_: &[&Change], _: &RepositoryState| Err(ReceiverError::new("rejected")),
        ));
        let dispatcher =
            Dispatcher::with_receivers([failing, recorder(&["ASM_DD"], Arc::clone(&later))]);

        let mut changes = ChangeSet::new();
        changes.push(inserted("datadog/2/ASM_DD/a/config"));

        let err = dispatcher
            .dispatch(&changes, &RepositoryState::new())
            .unwrap_err();
        assert_eq!(err.message(), "rejected");
        assert!(later.lock().is_empty());
    }
}
