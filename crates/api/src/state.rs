use crate::background::publisher::EventDispatch;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: both fields are reference-counted handles.
/// Configuration is consumed at startup (router construction, publisher
/// spawn) and does not travel with the state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (analytics reads and health checks).
    pub pool: smolhog_db::DbPool,
    /// Handle to the background publisher's dispatch channel.
    pub dispatch: EventDispatch,
}
