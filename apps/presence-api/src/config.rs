use std::path::PathBuf;

/// Default outbound queue depth per WebSocket connection.
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Presence API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// JSON fixtures file holding the user directory, access tokens and
    /// optional presence seed. When unset the directory starts empty.
    pub directory_path: Option<PathBuf>,
    /// Envelopes buffered per connection before further broadcasts are
    /// dropped for that connection.
    pub queue_capacity: usize,
    /// Pre-populate the presence store from the fixtures' `seed_presence`.
    pub seed_presence: bool,
}

impl Config {
    /// Load configuration from environment variables. Every variable is
    /// optional; unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4100),
            directory_path: std::env::var("DIRECTORY_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            queue_capacity: std::env::var("PRESENCE_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|n| n.max(1))
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            seed_presence: std::env::var("SEED_PRESENCE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4100,
            directory_path: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            seed_presence: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
