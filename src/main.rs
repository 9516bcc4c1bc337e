mod app;
mod bot;
mod config;
mod db;
mod format;
mod models;
mod showtimes;
mod telemetry;

use anyhow::Result;
use teloxide::prelude::Bot;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
  telemetry::init()?;
  let config = config::Config::load().await?;
  info!(default_location = config.default_location.as_str(), "starting bot");

  let bot = Bot::new(config.bot_token.clone());
  let db = db::Db::connect(&config.database_url).await?;
  let showtimes = showtimes::ShowtimesClient::new(&config.showtimes_base_url)?;
  let context = bot::AppContext::new(db, showtimes, config.default_location);
  app::App::new(bot, context).run().await
}
