use crate::session::SessionController;
use crate::tools::{RecordingNavigator, SharedLocation};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: SessionController,

    /// Device location pushed by the host, read by `getCurrentLocation`
    pub location: SharedLocation,

    /// Pages requested by `navigateToPage`
    pub navigator: Arc<RecordingNavigator>,
}

impl AppState {
    pub fn new(
        controller: SessionController,
        location: SharedLocation,
        navigator: Arc<RecordingNavigator>,
    ) -> Self {
        Self {
            controller,
            location,
            navigator,
        }
    }
}
