//! Remote configuration client.

use crate::capabilities::Capabilities;
use crate::config::ClientIdentity;
use crate::dispatcher::Dispatcher;
use crate::error::{ClientError, ClientResult, SyncResult};
use crate::reconcile::reconcile;
use crate::transport::Transport;
use confsync_core::{ChangeSet, CoreError, Repository};
use confsync_protocol::{
    ApplyState, ClientInfo, ClientState, ConfigRequest, ConfigResponse, ContentList, ParseError,
    Path, TargetMap,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Runs request/reconcile/dispatch round-trips against the agent.
///
/// A client owns its applied state. Replacing a client discards that state;
/// the next request then reports an empty cache and the agent resends
/// everything.
pub struct Client<T: Transport> {
    id: String,
    transport: Arc<T>,
    capabilities: Arc<Capabilities>,
    identity: ClientIdentity,
    repository: Repository,
    dispatcher: Dispatcher,
    last_error: Mutex<Option<String>>,
}

impl<T: Transport> Client<T> {
    /// Creates a client with a fresh id and an empty repository.
    pub fn new(
        transport: Arc<T>,
        capabilities: Arc<Capabilities>,
        identity: ClientIdentity,
    ) -> Self {
        let dispatcher = Dispatcher::with_receivers(capabilities.receivers().iter().cloned());
        Self {
            id: Uuid::new_v4().to_string(),
            transport,
            capabilities,
            identity,
            repository: Repository::new(),
            dispatcher,
            last_error: Mutex::new(None),
        }
    }

    /// Returns the client id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the applied configurations.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns the capabilities.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns the identity reported to the agent.
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Returns true if the previous sync failed.
    pub fn has_error(&self) -> bool {
        self.last_error.lock().is_some()
    }

    /// Returns the message of the previous sync failure.
    pub fn error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Builds the request describing the current applied state.
    pub fn payload(&self) -> ConfigRequest {
        let state = self.repository.state();
        let last_error = self.error();

        ConfigRequest {
            client: ClientInfo {
                state: ClientState {
                    root_version: state.root_version(),
                    targets_version: state.targets_version(),
                    config_states: state.config_states(),
                    has_error: last_error.is_some(),
                    error: last_error.unwrap_or_default(),
                    backend_client_state: state.opaque_backend_state().map(str::to_string),
                },
                id: self.id.clone(),
                products: self.capabilities.products().to_vec(),
                is_tracer: true,
                is_agent: false,
                client_tracer: self.identity.client_tracer(),
                capabilities: self.capabilities.base64_capabilities().to_string(),
            },
            cached_target_files: state.cached_target_files(),
        }
    }

    /// Runs one round-trip.
    ///
    /// Returns the changes committed by this cycle; the set is empty when the
    /// agent had nothing new. A reconciliation error leaves the applied
    /// state untouched; a receiver error leaves the committed changes
    /// unacknowledged. Either way the failure is reported to the agent on
    /// the next request.
    pub fn sync(&self) -> ClientResult<ChangeSet> {
        let result = self.sync_once();
        *self.last_error.lock() = result.as_ref().err().map(ToString::to_string);
        result
    }

    fn sync_once(&self) -> ClientResult<ChangeSet> {
        let response = self.transport.send_config(&self.payload())?;

        if !response.ok {
            tracing::debug!(client = %self.id, "remote: response not ok => NOOP");
            return Ok(ChangeSet::new());
        }
        if response.is_empty() {
            tracing::debug!(client = %self.id, "remote: empty response => NOOP");
            return Ok(ChangeSet::new());
        }

        let (paths, targets, contents) = parse_response(&response)?;

        let changes = self
            .repository
            .transaction(|current, txn| reconcile(current, txn, &paths, &targets, &contents))?;

        if changes.is_empty() {
            tracing::debug!(client = %self.id, "remote: no changes");
            return Ok(changes);
        }

        tracing::debug!(
            client = %self.id,
            changes = changes.len(),
            targets_version = targets.version(),
            "remote: applying changes"
        );

        let state = self.repository.state();
        let delivered = self.dispatcher.dispatch(&changes, &state)?;
        if !delivered.is_empty() {
            self.acknowledge(&delivered)?;
        }

        Ok(changes)
    }

    fn acknowledge(&self, delivered: &[Path]) -> ClientResult<()> {
        self.repository
            .transaction(|current, txn| {
                for path in delivered {
                    if current.contains(path) {
                        txn.set_apply_state(path.clone(), ApplyState::Acknowledged);
                    }
                }
                Ok::<_, CoreError>(())
            })
            .map_err(ClientError::Acknowledge)?;
        Ok(())
    }
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("capabilities", &self.capabilities)
            .field("applied", &self.repository.state().len())
            .field("last_error", &*self.last_error.lock())
            .finish_non_exhaustive()
    }
}

/// Parses the listed paths, the manifest and the target files of a response.
fn parse_response(response: &ConfigResponse) -> SyncResult<(Vec<Path>, TargetMap, ContentList)> {
    let paths = response
        .client_configs
        .iter()
        .map(|raw| Path::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let manifest = response
        .targets
        .as_ref()
        .ok_or_else(|| ParseError::invalid_manifest("response carries no targets manifest"))?;
    let targets = TargetMap::parse(manifest)?;
    let contents = ContentList::parse(&response.target_files)?;

    Ok((paths, targets, contents))
}
