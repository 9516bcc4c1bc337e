use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::Url;
use scraper::ElementRef;
use scraper::Html;
use scraper::Selector;
use thiserror::Error;
use tracing::debug;
use tracing::instrument;

use crate::models::Listing;
use crate::models::ListingKind;
use crate::models::RelatedThing;
use crate::models::Thing;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ShowtimesError {
  #[error("showtimes request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("query returned no results")]
  NoResults,
}

/// Anything able to answer "what is playing near here".
pub trait ShowtimesSource {
  fn listing(
    &self,
    kind: ListingKind,
    location: &str,
    query: Option<&str>,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Listing, ShowtimesError>> + Send;
}

struct Selectors {
  results: Selector,
  theater: Selector,
  movie: Selector,
  theater_name: Selector,
  movie_name: Selector,
  nested_name: Selector,
  nested_theater: Selector,
  nested_movie: Selector,
  times: Selector,
  link: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| {
  let parse = |css: &str| Selector::parse(css).expect("valid selector");
  Selectors {
    results: parse("#movie_results"),
    theater: parse("#movie_results .theater"),
    movie: parse("#movie_results .movie"),
    theater_name: parse(".desc .name"),
    movie_name: parse(".desc h2"),
    nested_name: parse(".name"),
    nested_theater: parse(".showtimes .theater"),
    nested_movie: parse(".showtimes .movie"),
    times: parse(".times"),
    link: parse("a[href]"),
  }
});

#[derive(Clone)]
pub struct ShowtimesClient {
  client: Client,
  base_url: Url,
}

impl ShowtimesClient {
  pub fn new(base_url: &str) -> anyhow::Result<Self> {
    let client = Client::builder()
      .user_agent(USER_AGENT)
      .timeout(REQUEST_TIMEOUT)
      .build()?;
    let base_url = Url::parse(base_url)?;
    Ok(Self { client, base_url })
  }

  async fn fetch_page(&self, kind: ListingKind, location: &str, query: Option<&str>) -> Result<String, ShowtimesError> {
    let sort = match kind {
      ListingKind::Theaters => "0",
      ListingKind::Movies => "1",
    };
    let mut params = vec![("near", location), ("sort", sort), ("date", "0")];
    if let Some(query) = query {
      params.push(("q", query));
    }

    let body = self
      .client
      .get(self.base_url.clone())
      .query(&params)
      .send()
      .await?
      .error_for_status()?
      .text()
      .await?;
    Ok(body)
  }
}

impl ShowtimesSource for ShowtimesClient {
  #[instrument(skip(self))]
  async fn listing(
    &self,
    kind: ListingKind,
    location: &str,
    query: Option<&str>,
    date: NaiveDate,
  ) -> Result<Listing, ShowtimesError> {
    let body = self.fetch_page(kind, location, query).await?;
    let things = parse_page(&body, kind, &self.base_url).ok_or(ShowtimesError::NoResults)?;
    debug!(
      count = things.len(),
      kind = kind.label(),
      related = kind.related().label(),
      "parsed showtimes page"
    );
    Ok(Listing {
      location: Some(location.to_string()),
      date: Some(date),
      things,
    })
  }
}

/// Extracts the listing entries from a results page. `None` when the page has
/// no results section at all.
pub fn parse_page(html: &str, kind: ListingKind, base_url: &Url) -> Option<Vec<Thing>> {
  let document = Html::parse_document(html);
  let selectors = &*SELECTORS;
  document.select(&selectors.results).next()?;

  let things = match kind {
    ListingKind::Theaters => document
      .select(&selectors.theater)
      .map(|theater| {
        let name = first_text(theater, &selectors.theater_name);
        let movies = theater
          .select(&selectors.nested_movie)
          .map(|movie| parse_related(movie, base_url))
          .collect();
        Thing::new(name, movies)
      })
      .collect(),
    ListingKind::Movies => document
      .select(&selectors.movie)
      .map(|movie| {
        let name = first_text(movie, &selectors.movie_name);
        let theaters = movie
          .select(&selectors.nested_theater)
          .map(|theater| parse_related(theater, base_url))
          .collect();
        Thing::new(name, theaters)
      })
      .collect(),
  };
  Some(things)
}

fn parse_related(element: ElementRef<'_>, base_url: &Url) -> RelatedThing {
  let selectors = &*SELECTORS;
  let name = first_text(element, &selectors.nested_name);
  let Some(times) = element.select(&selectors.times).next() else {
    return RelatedThing::new(name, Vec::new());
  };

  let text: String = times.text().collect();
  let showtimes = text
    .split_whitespace()
    .map(clean_token)
    .filter(|token| !token.is_empty())
    .collect();

  let tickets: HashMap<String, String> = times
    .select(&selectors.link)
    .filter_map(|link| {
      let time = clean_token(&link.text().collect::<String>());
      let href = link.value().attr("href")?;
      let url = ticket_url(base_url, href)?;
      (!time.is_empty()).then_some((time, url))
    })
    .collect();

  RelatedThing {
    name,
    showtimes,
    tickets,
  }
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> String {
  element
    .select(selector)
    .next()
    .map(|found| collapse_whitespace(&found.text().collect::<String>()))
    .unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().map(clean_token).collect::<Vec<_>>().join(" ")
}

// Result pages sprinkle direction marks between times.
fn clean_token(token: &str) -> String {
  token
    .chars()
    .filter(|c| !matches!(c, '\u{200e}' | '\u{200f}' | '\u{200b}'))
    .collect::<String>()
    .trim()
    .to_string()
}

/// Resolves a ticket href, unwrapping `/url?q=` redirects to their target.
fn ticket_url(base_url: &Url, href: &str) -> Option<String> {
  let url = base_url.join(href).ok()?;
  if url.path() == "/url"
    && let Some((_, target)) = url.query_pairs().find(|(key, _)| key == "q")
  {
    return Some(target.into_owned());
  }
  Some(url.to_string())
}
