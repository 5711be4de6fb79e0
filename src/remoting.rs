//! `Remoting` wires the long-lived services together once at startup.
//!
//! ## Example
//!
//! ```ignore
//! use direct_router::{IncomingCall, InMemoryCatalog, Remoting, RouterConfig};
//! use serde_json::json;
//!
//! let remoting = Remoting::new(catalog, RouterConfig::default());
//!
//! let call = IncomingCall::post("/router").json(&json!({
//!     "action": "calc", "method": "add", "data": [1, 2], "type": "rpc", "tid": 1
//! }));
//! let response = remoting.router().route(&call)?;
//! ```

use std::sync::Arc;

use crate::api::ApiDescriptorBuilder;
use crate::catalog::HandlerCatalog;
use crate::codec::{Codec, JsonCodec};
use crate::config::RouterConfig;
use crate::lock::SessionLocks;
use crate::method::MethodRegistry;
use crate::router::{Invoker, PollDispatcher, RequestRouter};
use crate::session::SessionStore;

/// Registry, router, poll dispatcher and descriptor builder sharing one
/// catalog and configuration.
pub struct Remoting {
    config: Arc<RouterConfig>,
    registry: Arc<MethodRegistry>,
    sessions: SessionStore,
    router: RequestRouter,
    poller: PollDispatcher,
    api: ApiDescriptorBuilder,
}

impl Remoting {
    pub fn new<C: HandlerCatalog + 'static>(catalog: C, config: RouterConfig) -> Self {
        Self::with_codec(Arc::new(catalog), config, Arc::new(JsonCodec))
    }

    pub fn with_codec(catalog: Arc<dyn HandlerCatalog>, config: RouterConfig, codec: Arc<dyn Codec>) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(MethodRegistry::new(catalog));
        let invoker = Arc::new(Invoker::new(
            Arc::clone(&registry),
            Arc::new(SessionLocks::new()),
            Arc::clone(&config),
        ));
        Self {
            router: RequestRouter::new(
                Arc::clone(&registry),
                Arc::clone(&invoker),
                Arc::clone(&config),
                Arc::clone(&codec),
            ),
            poller: PollDispatcher::new(Arc::clone(&registry), invoker, Arc::clone(&codec)),
            api: ApiDescriptorBuilder::new(Arc::clone(&registry), Arc::clone(&config), codec),
            sessions: SessionStore::with_capacity(config.session_capacity),
            config,
            registry,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn router(&self) -> &RequestRouter {
        &self.router
    }

    pub fn poller(&self) -> &PollDispatcher {
        &self.poller
    }

    pub fn api(&self) -> &ApiDescriptorBuilder {
        &self.api
    }
}
