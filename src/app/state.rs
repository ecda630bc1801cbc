//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::RoomRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Rooms live for the lifetime of the process
        let registry = Arc::new(RoomRegistry::new(
            config.game.clone(),
            config.outbox_capacity,
        ));

        Self { config, registry }
    }
}
