use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn store_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("lexilog");
            Some(state_dir.join("store.db"))
        } else {
            ProjectDirs::from("", "", "lexilog")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("store.db"))
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lexilog").map(|pd| pd.config_dir().join("config.json"))
    }
}
