use std::path::PathBuf;

/// Default id namespace shared with the host.
pub const DEFAULT_NAMESPACE: &str = "markwhen";

const APP_DIR: &str = "markwhen-calendar";

/// Settings for a view client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix of every correlation id; envelopes without it are ignored.
    pub namespace: String,
    /// Unix socket the host listens on.
    pub socket_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            socket_path: socket_path(),
        }
    }
}

fn app_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of the host socket.
pub fn socket_path() -> PathBuf {
    app_dir().join("view.sock")
}

/// Default location of the log file.
pub fn log_path() -> PathBuf {
    app_dir().join("view.log")
}
