// src/state.rs

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::{config::Config, scoring::ScoringEngine, session::SessionRegistry, store::DynStore};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub sessions: Arc<SessionRegistry>,
    pub engine: Arc<ScoringEngine>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: DynStore, engine: ScoringEngine, config: Config) -> Self {
        Self {
            store,
            // A session is unreachable once its token expires.
            sessions: Arc::new(SessionRegistry::new(Duration::from_secs(config.jwt_expiration))),
            engine: Arc::new(engine),
            config,
        }
    }
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<SessionRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<ScoringEngine> {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
