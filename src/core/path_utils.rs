/*
 * Utility functions for resolving the application's own directories. Kept in
 * one place so every part of the core that persists anything agrees on where
 * that data lives.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

/*
 * Retrieves the application's local (non-roaming) configuration directory,
 * creating it if necessary. The path is derived without an organization
 * qualifier, placing it directly under the user's local application data
 * structure (e.g. AppData/Local on Windows, ~/.config on Linux). Returns
 * `None` when the platform offers no such location or creation fails.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Resolving base app config local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| {
        let config_path = proj_dirs.config_local_dir();
        if !config_path.exists() {
            if let Err(e) = fs::create_dir_all(config_path) {
                log::error!(
                    "PathUtils: Failed to create base app config directory {config_path:?}: {e}"
                );
                return None;
            }
            log::debug!("PathUtils: Created base app config directory: {config_path:?}");
        }
        Some(config_path.to_path_buf())
    })
}
