use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use chrono::NaiveDate;
use teloxide::dispatching::MessageFilterExt;
use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use teloxide::types::ChatId;
use teloxide::types::LinkPreviewOptions;
use teloxide::types::Location;
use teloxide::types::Me;
use teloxide::types::Message;
use teloxide::types::ParseMode;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::bot::HandlerResult;
use crate::bot::context::AppContext;
use crate::bot::routes::Route;
use crate::bot::routes::parse_route;
use crate::db::LocationStore;
use crate::format::format_listing;
use crate::models::Listing;
use crate::models::ListingKind;
use crate::showtimes::ShowtimesError;
use crate::showtimes::ShowtimesSource;

type SharedContext = Arc<AppContext>;

const HELP_TEXT: &str = "I can help you find nearby theaters and showtimes. Tell me, what are you looking for?\n\n\
/setlocation - Sets your location for future reference\n\
/movies or /showtimes - Shows the movies that are projecting in near theaters\n\
/theaters - Shows nearby theaters, and the movies they are screening\n";
const REQUEST_LOCATION_TEXT: &str = "Send me your location using the location button on Telegram, or send it manually with \"/setlocation city, country or zip code\"";
const SET_LOCATION_FAILED_TEXT: &str =
  "An error happened setting your new location, please try again in a few moments";

pub fn build_schema() -> UpdateHandler<anyhow::Error> {
  let message_handler = Update::filter_message()
    .branch(Message::filter_location().endpoint(handle_location))
    .branch(
      dptree::filter_map(|msg: Message, me: Me| msg.text().and_then(|text| parse_route(text, me.username())))
        .endpoint(handle_route),
    )
    .branch(dptree::endpoint(handle_unrouted));

  dptree::entry().branch(message_handler)
}

#[instrument(skip(bot, ctx, msg))]
async fn handle_route(bot: Bot, ctx: SharedContext, msg: Message, route: Route) -> HandlerResult {
  match route {
    Route::SetLocation(location) => {
      let reply = format!("I've set your location to {location}");
      save_location(&bot, &ctx, msg.chat.id, &location, &reply).await
    },
    Route::RequestLocation => {
      info!(chat_id = %msg.chat.id, "asking for location");
      bot.send_message(msg.chat.id, REQUEST_LOCATION_TEXT).await?;
      Ok(())
    },
    Route::Listing { kind, query } => send_listing(&bot, &ctx, msg.chat.id, kind, query.as_deref()).await,
  }
}

#[instrument(skip(bot, ctx, msg))]
async fn handle_location(bot: Bot, ctx: SharedContext, msg: Message, location: Location) -> HandlerResult {
  // TODO: let group chats store a shared location.
  if !msg.chat.is_private() {
    return Ok(());
  }
  let coordinates = coordinates_text(&location);
  save_location(&bot, &ctx, msg.chat.id, &coordinates, "I've set your location").await
}

#[instrument(skip(bot, msg))]
async fn handle_unrouted(bot: Bot, msg: Message) -> HandlerResult {
  if !msg.chat.is_private() {
    return Ok(());
  }
  info!(chat_id = %msg.chat.id, "sending help text");
  send_blocks(&bot, msg.chat.id, &[HELP_TEXT.to_string()]).await
}

async fn save_location(bot: &Bot, ctx: &SharedContext, chat: ChatId, location: &str, reply: &str) -> HandlerResult {
  let reply = match ctx.db().set_location(chat.0, location).await {
    Ok(()) => {
      info!(chat_id = %chat, location, "stored chat location");
      reply
    },
    Err(err) => {
      error!(chat_id = %chat, error = ?err, "failed to store chat location");
      SET_LOCATION_FAILED_TEXT
    },
  };
  bot.send_message(chat, reply).await?;
  Ok(())
}

#[instrument(skip(bot, ctx))]
async fn send_listing(
  bot: &Bot,
  ctx: &SharedContext,
  chat: ChatId,
  kind: ListingKind,
  query: Option<&str>,
) -> HandlerResult {
  if let Err(err) = bot.send_chat_action(chat, ChatAction::Typing).await {
    warn!(chat_id = %chat, error = %err, "failed to send typing indicator");
  }

  let today = Local::now().date_naive();
  let blocks = listing_blocks(
    ctx.showtimes(),
    ctx.db(),
    chat.0,
    ctx.default_location(),
    kind,
    query,
    today,
  )
  .await;

  match blocks {
    Ok(blocks) => {
      info!(chat_id = %chat, kind = kind.label(), blocks = blocks.len(), "sending listing");
      send_blocks(bot, chat, &blocks).await
    },
    Err(err) => {
      error!(chat_id = %chat, kind = kind.label(), error = %err, "failed to fetch listing");
      bot
        .send_message(chat, format!("Error fetching {}", kind.empty_label()))
        .await?;
      Ok(())
    },
  }
}

/// Resolves the chat's location, fetches the listing and renders it.
///
/// A "no results" answer from the source renders the same reply an empty
/// listing would.
async fn listing_blocks<S, L>(
  source: &S,
  store: &L,
  chat_id: i64,
  default_location: &str,
  kind: ListingKind,
  query: Option<&str>,
  date: NaiveDate,
) -> Result<Vec<String>, ShowtimesError>
where
  S: ShowtimesSource,
  L: LocationStore,
{
  let location = match store.location(chat_id).await {
    Ok(Some(location)) => location,
    Ok(None) => default_location.to_string(),
    Err(err) => {
      warn!(chat_id, error = ?err, "failed to read chat location, using default");
      default_location.to_string()
    },
  };

  match source.listing(kind, &location, query, date).await {
    Ok(listing) => Ok(format_listing(&listing, kind, query)),
    Err(ShowtimesError::NoResults) => Ok(format_listing(&Listing::empty(location, date), kind, query)),
    Err(err) => Err(err),
  }
}

// Blocks go out one at a time; later ones continue the earlier ones.
#[allow(deprecated)]
async fn send_blocks(bot: &Bot, chat: ChatId, blocks: &[String]) -> HandlerResult {
  for block in blocks {
    bot
      .send_message(chat, block.clone())
      .parse_mode(ParseMode::Markdown)
      .link_preview_options(disabled_link_preview())
      .await
      .with_context(|| format!("failed to send message to chat {chat}"))?;
  }
  Ok(())
}

fn disabled_link_preview() -> LinkPreviewOptions {
  LinkPreviewOptions {
    is_disabled: true,
    url: None,
    prefer_small_media: false,
    prefer_large_media: false,
    show_above_text: false,
  }
}

fn coordinates_text(location: &Location) -> String {
  format!("{},{}", location.latitude, location.longitude)
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;
  use std::sync::Mutex;

  use anyhow::anyhow;
  use chrono::NaiveDate;

  use super::listing_blocks;
  use crate::db::LocationStore;
  use crate::models::Listing;
  use crate::models::ListingKind;
  use crate::models::RelatedThing;
  use crate::models::Thing;
  use crate::showtimes::ShowtimesError;
  use crate::showtimes::ShowtimesSource;

  #[derive(Default)]
  struct MemoryStore {
    locations: Mutex<HashMap<i64, String>>,
    broken: bool,
  }

  impl LocationStore for MemoryStore {
    async fn location(&self, chat_id: i64) -> anyhow::Result<Option<String>> {
      if self.broken {
        return Err(anyhow!("store unavailable"));
      }
      Ok(self.locations.lock().expect("lock").get(&chat_id).cloned())
    }

    async fn set_location(&self, chat_id: i64, location: &str) -> anyhow::Result<()> {
      self.locations.lock().expect("lock").insert(chat_id, location.to_string());
      Ok(())
    }
  }

  struct FakeSource {
    things: Option<Vec<Thing>>,
    requested: Mutex<Vec<String>>,
  }

  impl FakeSource {
    fn with(things: Option<Vec<Thing>>) -> Self {
      Self {
        things,
        requested: Mutex::new(Vec::new()),
      }
    }
  }

  impl ShowtimesSource for FakeSource {
    async fn listing(
      &self,
      _kind: ListingKind,
      location: &str,
      _query: Option<&str>,
      date: NaiveDate,
    ) -> Result<Listing, ShowtimesError> {
      self.requested.lock().expect("lock").push(location.to_string());
      let things = self.things.clone().ok_or(ShowtimesError::NoResults)?;
      Ok(Listing {
        location: Some(location.to_string()),
        date: Some(date),
        things,
      })
    }
  }

  fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).expect("valid date")
  }

  #[tokio::test]
  async fn uses_stored_location() {
    let store = MemoryStore::default();
    store.set_location(7, "Girona").await.expect("stored");
    let source = FakeSource::with(Some(vec![Thing::new(
      "Inception",
      vec![RelatedThing::new("Verdi", vec!["20:00".to_string()])],
    )]));

    let blocks = listing_blocks(&source, &store, 7, "Barcelona", ListingKind::Movies, None, date())
      .await
      .expect("blocks");

    assert_eq!(*source.requested.lock().expect("lock"), vec!["Girona".to_string()]);
    assert_eq!(
      blocks,
      vec!["Here are the movies projecting on Sat 17 Oct near Girona:\n\n*Inception*\nVerdi - 20:00\n".to_string()]
    );
  }

  #[tokio::test]
  async fn falls_back_to_default_location() {
    let source = FakeSource::with(Some(Vec::new()));
    let broken = MemoryStore {
      broken: true,
      ..MemoryStore::default()
    };

    listing_blocks(&source, &MemoryStore::default(), 1, "Barcelona", ListingKind::Theaters, None, date())
      .await
      .expect("blocks");
    listing_blocks(&source, &broken, 1, "Barcelona", ListingKind::Theaters, None, date())
      .await
      .expect("blocks");

    assert_eq!(
      *source.requested.lock().expect("lock"),
      vec!["Barcelona".to_string(), "Barcelona".to_string()]
    );
  }

  #[tokio::test]
  async fn no_results_matches_empty_listing_reply() {
    let store = MemoryStore::default();
    let missing = FakeSource::with(None);
    let empty = FakeSource::with(Some(Vec::new()));

    let from_error = listing_blocks(&missing, &store, 1, "Barcelona", ListingKind::Theaters, Some("verdi"), date())
      .await
      .expect("blocks");
    let from_empty = listing_blocks(&empty, &store, 1, "Barcelona", ListingKind::Theaters, Some("verdi"), date())
      .await
      .expect("blocks");

    assert_eq!(from_error, from_empty);
    assert_eq!(
      from_error,
      vec!["Sorry, I couldn't find any theaters matching verdi for Sat 17 Oct near Barcelona".to_string()]
    );
  }
}
