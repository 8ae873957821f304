use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
pub const ASSET_DIR_ENV: &str = "TASKGATE_ASSET_DIR";

/// Directory holding the config file and the default SQLite database.
///
/// `TASKGATE_ASSET_DIR` wins when set. Debug builds fall back to
/// `dev_assets/` at the workspace root, release builds to the platform data dir.
pub fn asset_dir() -> std::io::Result<PathBuf> {
    let path = match std::env::var(ASSET_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ if cfg!(debug_assertions) => PathBuf::from(PROJECT_ROOT).join("../../dev_assets"),
        _ => ProjectDirs::from("dev", "taskgate", "taskgate")
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no home directory to place assets in",
                )
            })?
            .data_dir()
            .to_path_buf(),
    };

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
        tracing::debug!("created asset directory {}", path.display());
    }
    Ok(path)
}

pub fn config_path() -> std::io::Result<PathBuf> {
    Ok(asset_dir()?.join("config.json"))
}

pub fn default_database_url() -> std::io::Result<String> {
    let db_path = asset_dir()?.join("db.sqlite");
    Ok(format!("sqlite://{}?mode=rwc", db_path.to_string_lossy()))
}
