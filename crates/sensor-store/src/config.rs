//! Store configuration

use serde::{Deserialize, Serialize};

/// Default number of sensors returned by a listing
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on the number of sensors `get_all` returns
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Config with a custom page bound
    pub fn with_page_size(page_size: usize) -> Self {
        Self { page_size }
    }
}
