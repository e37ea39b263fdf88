use std::fmt;

use clap::Args;

pub const DEFAULT_BASE_URL: &str = "https://penta.fosdem.org";

/// Connection settings, read from flags or `PENTA_*` environment variables.
#[derive(Clone, Args)]
pub struct Config {
    /// Base URL of the Pentabarf instance
    #[arg(long = "base-url", env = "PENTA_PENTAURL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Username for HTTP basic auth
    #[arg(long, env = "PENTA_USERNAME")]
    pub username: String,

    /// Password for HTTP basic auth
    #[arg(long, env = "PENTA_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Track (devroom) whose talks are exported
    #[arg(long, env = "PENTA_DEVROOM_ID")]
    pub devroom_id: String,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

// Keep the password out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("devroom_id", &self.devroom_id)
            .finish()
    }
}
