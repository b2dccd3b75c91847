//! Application State

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use wallet_advisor::{MonitorHandle, PortfolioMonitor, PreferencesStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Refresh pipeline shared by every watched address
    pub monitor: PortfolioMonitor,

    /// Active monitors by address. Removing an entry cancels its timer.
    pub watches: Arc<RwLock<HashMap<String, MonitorHandle>>>,

    /// User investment preferences
    pub preferences: PreferencesStore,

    /// Whether the monitor reads from demo sources
    pub mock_sources: bool,
}

impl AppState {
    pub fn new(monitor: PortfolioMonitor, mock_sources: bool) -> Self {
        Self {
            monitor,
            watches: Arc::default(),
            preferences: PreferencesStore::new(),
            mock_sources,
        }
    }
}
