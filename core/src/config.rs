//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so a host can construct a client with zero
//! configuration against the production API.

/// Production API host consumed by the mobile app.
pub const DEFAULT_BASE_URL: &str = "https://shimmering-gentleness-production.up.railway.app";

/// Path under the API host where uploaded images are served.
pub const DEFAULT_UPLOADS_PATH: &str = "/uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    /// Env: `ADOPTA_API_URL`
    pub base_url: String,

    /// Path (relative to `base_url`) serving uploaded images.
    /// Env: `ADOPTA_UPLOADS_PATH`
    pub uploads_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            uploads_path: DEFAULT_UPLOADS_PATH.to_string(),
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("ADOPTA_API_URL") {
            if url.starts_with("http://") || url.starts_with("https://") {
                config.base_url = url.trim_end_matches('/').to_string();
            } else {
                tracing::warn!(value = %url, "Invalid ADOPTA_API_URL, using default");
            }
        }

        if let Ok(path) = std::env::var("ADOPTA_UPLOADS_PATH") {
            config.uploads_path = normalize_path(&path);
        }

        config
    }

    /// Absolute URL for an API path such as `/mascotas/listar`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute URL of an uploaded image.
    pub fn upload_url(&self, filename: &str) -> String {
        format!("{}{}/{}", self.base_url, self.uploads_path, filename)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
