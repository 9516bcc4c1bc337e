use std::env;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use tracing::info;

const DEFAULT_LOCATION: &str = "Barcelona, Spain";
const DEFAULT_SHOWTIMES_URL: &str = "https://www.google.com/movies";

#[derive(Debug, Clone)]
pub struct Config {
  pub bot_token: String,
  pub database_url: String,
  pub default_location: String,
  pub showtimes_base_url: String,
}

/// Settings published as a JSON document at `CONFIG_URL`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
  pub telegram_bot_key: Option<String>,
  pub default_location: Option<String>,
  pub showtimes_base_url: Option<String>,
}

impl RemoteConfig {
  pub async fn fetch(url: &str) -> Result<Self> {
    let remote = reqwest::get(url)
      .await
      .and_then(|response| response.error_for_status())
      .with_context(|| format!("failed to fetch remote config from {url}"))?
      .json::<Self>()
      .await
      .context("remote config is not valid JSON")?;
    Ok(remote)
  }
}

impl Config {
  pub async fn load() -> Result<Self> {
    let remote = match env::var("CONFIG_URL") {
      Ok(url) if !url.trim().is_empty() => {
        info!(url = url.as_str(), "loading remote config");
        RemoteConfig::fetch(url.trim()).await?
      },
      _ => RemoteConfig::default(),
    };
    Self::resolve(|key| env::var(key).ok(), remote)
  }

  /// Environment values win over remote ones.
  fn resolve(lookup: impl Fn(&str) -> Option<String>, remote: RemoteConfig) -> Result<Self> {
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let bot_token = var("BOT_TOKEN")
      .or_else(|| var("TELOXIDE_TOKEN"))
      .or_else(|| var("TELEGRAM_BOT_TOKEN"))
      .or(remote.telegram_bot_key)
      .context("BOT_TOKEN, TELOXIDE_TOKEN or TELEGRAM_BOT_TOKEN must be set")?;
    let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let default_location = var("DEFAULT_LOCATION")
      .or(remote.default_location)
      .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    let showtimes_base_url = var("SHOWTIMES_BASE_URL")
      .or(remote.showtimes_base_url)
      .unwrap_or_else(|| DEFAULT_SHOWTIMES_URL.to_string());
    Ok(Self {
      bot_token,
      database_url,
      default_location,
      showtimes_base_url,
    })
  }
}
