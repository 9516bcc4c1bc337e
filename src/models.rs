use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
  Movies,
  Theaters,
}

impl ListingKind {
  pub fn related(self) -> Self {
    match self {
      Self::Movies => Self::Theaters,
      Self::Theaters => Self::Movies,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Movies => "movies",
      Self::Theaters => "theaters",
    }
  }

  /// Word used in "couldn't find any ..." replies.
  pub fn empty_label(self) -> &'static str {
    match self {
      Self::Movies => "showtimes",
      Self::Theaters => "theaters",
    }
  }

  /// Paragraphs per outgoing message, header included in the first one.
  pub fn block_size(self) -> usize {
    match self {
      Self::Movies => 10,
      Self::Theaters => 5,
    }
  }
}

/// A theater screening a movie, or a movie screened at a theater.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedThing {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub showtimes: Vec<String>,
  #[serde(default)]
  pub tickets: HashMap<String, String>,
}

impl RelatedThing {
  pub fn new(name: impl Into<String>, showtimes: Vec<String>) -> Self {
    Self {
      name: name.into(),
      showtimes,
      tickets: HashMap::new(),
    }
  }

  #[cfg(test)]
  pub fn with_ticket(mut self, time: impl Into<String>, url: impl Into<String>) -> Self {
    self.tickets.insert(time.into(), url.into());
    self
  }

  pub fn is_absent(&self) -> bool {
    self.name.is_empty()
      || match self.showtimes.as_slice() {
        [] => true,
        [only] => only.is_empty(),
        _ => false,
      }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub related: Vec<RelatedThing>,
}

impl Thing {
  pub fn new(name: impl Into<String>, related: Vec<RelatedThing>) -> Self {
    Self {
      name: name.into(),
      related,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
  pub location: Option<String>,
  pub date: Option<NaiveDate>,
  #[serde(default)]
  pub things: Vec<Thing>,
}

impl Listing {
  pub fn empty(location: impl Into<String>, date: NaiveDate) -> Self {
    Self {
      location: Some(location.into()),
      date: Some(date),
      things: Vec::new(),
    }
  }

  /// Date and location, when the listing carries both.
  pub fn context(&self) -> Option<(NaiveDate, &str)> {
    match (self.date, self.location.as_deref()) {
      (Some(date), Some(location)) if !location.is_empty() => Some((date, location)),
      _ => None,
    }
  }
}
