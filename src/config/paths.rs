//! Cross-platform client paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (`client.toml`):
//!   Windows: %APPDATA%\voiceflow-client\
//!   macOS:   ~/Library/Application Support/voiceflow-client/
//!   Linux:   ~/.config/voiceflow-client/
//!
//! Data dir (extra translation catalogs):
//!   Windows: %LOCALAPPDATA%\voiceflow-client\
//!   macOS:   ~/Library/Application Support/voiceflow-client/
//!   Linux:   ~/.local/share/voiceflow-client/

use std::path::PathBuf;

/// Holds all resolved client directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `client.toml`.
    pub config_dir: PathBuf,
    /// Full path to `client.toml`.
    pub config_file: PathBuf,
    /// Directory scanned for `<lang>.json` catalogs that extend the built-in ones.
    pub locales_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voiceflow-client";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let config_file = config_dir.join("client.toml");
        let locales_dir = data_dir.join("locales");

        Self {
            config_dir,
            config_file,
            locales_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .config_file
            .file_name()
            .is_some_and(|n| n == "client.toml"));
        assert!(paths.locales_dir.ends_with("locales"));
        assert!(paths.config_file.starts_with(&paths.config_dir));
    }
}
