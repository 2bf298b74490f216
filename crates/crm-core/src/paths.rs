use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const CRM_DIR: &str = ".crm";
pub const CONFIG_FILE: &str = ".crm/config.yaml";
pub const STATE_FILE: &str = ".crm/state.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn crm_dir(root: &Path) -> PathBuf {
    root.join(CRM_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn is_initialized(root: &Path) -> bool {
    config_path(root).exists() && state_path(root).exists()
}
