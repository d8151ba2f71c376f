use std::path::PathBuf;
use tracing::warn;

pub const CIRCLES_FILE_NAME: &str = "user_circles.json";
pub const ARTICLES_FILE_NAME: &str = "articles.json";

#[derive(Debug, Clone, PartialEq)]
pub struct GuideConfig {
    pub data_dir: PathBuf,
    pub routes_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            routes_dir: PathBuf::from("routes"),
            host: String::from("0.0.0.0"),
            port: 9000,
        }
    }
}

impl GuideConfig {
    /// Reads `BUS_GUIDE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("BUS_GUIDE_PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                warn!(
                    "Ignoring invalid BUS_GUIDE_PORT {:?}, using {}",
                    raw, defaults.port
                );
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            data_dir: lookup("BUS_GUIDE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            routes_dir: lookup("BUS_GUIDE_ROUTES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.routes_dir),
            host: lookup("BUS_GUIDE_HOST").unwrap_or(defaults.host),
            port,
        }
    }

    pub fn circles_path(&self) -> PathBuf {
        self.data_dir.join(CIRCLES_FILE_NAME)
    }

    pub fn articles_path(&self) -> PathBuf {
        self.data_dir.join(ARTICLES_FILE_NAME)
    }
}
