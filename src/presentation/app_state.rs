// Application state for HTTP handlers
use crate::application::engine::EngineHandle;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
}
