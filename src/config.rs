//! Configuration and media folder resolution

use std::path::{Path, PathBuf};

/// Compiled default for the media folder
pub const DEFAULT_MEDIA_DIR: &str = "songs";

/// Runtime settings assembled in `main` from arguments and environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Gateway authentication token (required; absence aborts startup)
    pub token: String,
    pub server_id: u64,
    pub channel_id: u64,
    pub media_dir: PathBuf,
    /// Base URL of the voice gateway sidecar
    pub gateway_url: String,
    /// Control API port
    pub port: u16,
}

/// Media folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable (applied by the clap layer before this is called)
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_media_dir(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(config_path) = find_config_file() {
        if let Some(dir) = media_dir_from_toml(&config_path) {
            return dir;
        }
    }

    PathBuf::from(DEFAULT_MEDIA_DIR)
}

/// Locate the config file for the platform
///
/// Tries the user config directory first, then the system-wide path.
fn find_config_file() -> Option<PathBuf> {
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("radiobot").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/radiobot/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

fn media_dir_from_toml(path: &Path) -> Option<PathBuf> {
    let content = std::fs::read_to_string(path).ok()?;
    let config = toml::from_str::<toml::Value>(&content).ok()?;
    config
        .get("media_dir")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let dir = resolve_media_dir(Some(Path::new("/music/pool")));
        assert_eq!(dir, PathBuf::from("/music/pool"));
    }

    #[test]
    fn media_dir_read_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "media_dir = \"/srv/radio/songs\"\n").unwrap();

        assert_eq!(
            media_dir_from_toml(&config_path),
            Some(PathBuf::from("/srv/radio/songs"))
        );
    }

    #[test]
    fn malformed_toml_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "media_dir = [not toml").unwrap();

        assert_eq!(media_dir_from_toml(&config_path), None);
    }
}
