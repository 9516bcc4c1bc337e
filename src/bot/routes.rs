use once_cell::sync::Lazy;
use regex::Captures;
use regex::Regex;

use crate::models::ListingKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  SetLocation(String),
  RequestLocation,
  Listing {
    kind: ListingKind,
    query: Option<String>,
  },
}

type RouteBuilder = fn(&Captures<'_>) -> Route;

// Evaluated in order, first match wins.
static ROUTES: Lazy<Vec<(Regex, RouteBuilder)>> = Lazy::new(|| {
  vec![
    route(r"^/setlocation(?:@(?P<bot>\w+))?\s+(?P<arg>.+?)\s*$", |caps| {
      Route::SetLocation(caps["arg"].to_string())
    }),
    route(r"^/setlocation(?:@(?P<bot>\w+))?\s*$", |_| Route::RequestLocation),
    route(r"^/theaters(?:@(?P<bot>\w+))?(?:\s+(?P<arg>.+?))?\s*$", |caps| Route::Listing {
      kind: ListingKind::Theaters,
      query: argument(caps),
    }),
    route(r"^/(?:showtimes|movies)(?:@(?P<bot>\w+))?(?:\s+(?P<arg>.+?))?\s*$", |caps| Route::Listing {
      kind: ListingKind::Movies,
      query: argument(caps),
    }),
  ]
});

fn route(pattern: &str, build: RouteBuilder) -> (Regex, RouteBuilder) {
  (Regex::new(pattern).expect("valid regex"), build)
}

fn argument(caps: &Captures<'_>) -> Option<String> {
  caps
    .name("arg")
    .map(|arg| arg.as_str().trim().to_string())
    .filter(|arg| !arg.is_empty())
}

/// Matches `text` against the command table. Commands addressed to another
/// bot with `/command@name` are ignored.
pub fn parse_route(text: &str, bot_username: &str) -> Option<Route> {
  let text = text.trim();
  let caps = ROUTES.iter().find_map(|(pattern, build)| Some((pattern.captures(text)?, build)));
  let (caps, build) = caps?;
  if let Some(mention) = caps.name("bot")
    && !mention.as_str().eq_ignore_ascii_case(bot_username)
  {
    return None;
  }
  Some(build(&caps))
}

#[cfg(test)]
mod tests {
  use super::Route;
  use super::parse_route;
  use crate::models::ListingKind;

  const BOT: &str = "ShowtimesBot";

  #[test]
  fn parses_set_location() {
    assert_eq!(
      parse_route("/setlocation Barcelona, Spain  ", BOT),
      Some(Route::SetLocation("Barcelona, Spain".to_string()))
    );
    assert_eq!(parse_route("/setlocation", BOT), Some(Route::RequestLocation));
    assert_eq!(parse_route("/setlocation   ", BOT), Some(Route::RequestLocation));
  }

  #[test]
  fn parses_listing_commands() {
    assert_eq!(
      parse_route("/theaters", BOT),
      Some(Route::Listing {
        kind: ListingKind::Theaters,
        query: None,
      })
    );
    assert_eq!(
      parse_route("/movies inception", BOT),
      Some(Route::Listing {
        kind: ListingKind::Movies,
        query: Some("inception".to_string()),
      })
    );
    assert_eq!(
      parse_route("/showtimes@showtimesbot the dark knight", BOT),
      Some(Route::Listing {
        kind: ListingKind::Movies,
        query: Some("the dark knight".to_string()),
      })
    );
  }

  #[test]
  fn unknown_text_has_no_route() {
    assert_eq!(parse_route("hello there", BOT), None);
    assert_eq!(parse_route("/theatersinception", BOT), None);
    assert_eq!(parse_route("/help", BOT), None);
  }

  #[test]
  fn ignores_commands_for_other_bots() {
    assert_eq!(parse_route("/movies@OtherBot", BOT), None);
    assert_eq!(parse_route("/setlocation@OtherBot Girona", BOT), None);
    assert_eq!(
      parse_route("/movies@ShowtimesBot", BOT),
      Some(Route::Listing {
        kind: ListingKind::Movies,
        query: None,
      })
    );
    assert_eq!(
      parse_route("/setlocation@SHOWTIMESBOT Girona", BOT),
      Some(Route::SetLocation("Girona".to_string()))
    );
  }
}
