use anyhow::Result;

/// Process configuration loaded from environment variables.
/// Contains only secrets and endpoints; tunable pipeline settings live in
/// the store-backed [`AppSettings`](crate::AppSettings).
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Mastodon
    pub mastodon_instance_url: String,
    pub mastodon_access_token: String,
    /// The account the bot posts as; its own posts are always filtered out.
    pub bot_handle: String,

    // LLM
    pub openai_api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            mastodon_instance_url: std::env::var("MASTODON_INSTANCE_URL")
                .unwrap_or_else(|_| "https://mastodon.social".to_string()),
            mastodon_access_token: std::env::var("MASTODON_ACCESS_TOKEN")?,
            bot_handle: std::env::var("MASTODON_BOT_HANDLE").unwrap_or_default(),
            openai_api_key: std::env::var("OPENAI_API_KEY")?,
        };

        config.log_redacted();
        Ok(config)
    }

    fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            if val.is_empty() {
                return "<not set>".to_string();
            }
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  MASTODON_INSTANCE_URL: {}", self.mastodon_instance_url);
        tracing::info!(
            "  MASTODON_ACCESS_TOKEN: {}",
            preview(&self.mastodon_access_token)
        );
        tracing::info!("  MASTODON_BOT_HANDLE: {}", self.bot_handle);
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
    }
}
