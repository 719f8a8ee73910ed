use std::path::PathBuf;

/// Common configuration shared by server binaries.
///
/// The binary parses these from command-line arguments, then passes them to
/// storage layer initialization.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding all persistent data.
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite database file.
    /// Defaults to `{data_dir}/data.sqlite` if not specified.
    pub sqlite_path: Option<PathBuf>,

    /// Listen address for the HTTP server.
    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            sqlite_path: None,
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve the SQLite database path, falling back to `{data_dir}/data.sqlite`.
    pub fn resolve_sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("data.sqlite"))
    }

    fn resolve_data_subpath(&self, name: &str) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|d| d.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}
