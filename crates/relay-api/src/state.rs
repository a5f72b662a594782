use std::sync::Arc;

use relay_runtime::Relay;

use crate::auth::AuthProvider;
use crate::config::Config;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Arc<Relay>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(config: Config, relay: Relay, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            config: Arc::new(config),
            relay: Arc::new(relay),
            auth,
        }
    }
}
