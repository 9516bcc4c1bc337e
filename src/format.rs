use chrono::NaiveDate;

use crate::models::Listing;
use crate::models::ListingKind;
use crate::models::RelatedThing;
use crate::models::Thing;

const DATE_FORMAT: &str = "%a %-d %b";

/// Renders a listing into the ordered messages that should be sent for it.
///
/// Never returns an empty list: a listing with nothing worth showing becomes a
/// single "couldn't find any" message. Messages hold at most
/// [`ListingKind::block_size`] paragraphs, the header taking the first slot.
pub fn format_listing(listing: &Listing, kind: ListingKind, query: Option<&str>) -> Vec<String> {
  let paragraphs: Vec<String> = listing.things.iter().filter_map(render_thing).collect();

  if paragraphs.is_empty() {
    return vec![empty_results_text(kind, query, listing.context())];
  }

  let mut slots = Vec::with_capacity(paragraphs.len() + 1);
  slots.push(header_text(kind, listing.context()));
  slots.extend(paragraphs);
  slots.chunks(kind.block_size()).map(|chunk| chunk.join("\n")).collect()
}

pub fn header_text(kind: ListingKind, context: Option<(NaiveDate, &str)>) -> String {
  match context {
    Some((date, location)) => format!(
      "Here are the {} projecting on {} near {location}:\n",
      kind.label(),
      date.format(DATE_FORMAT)
    ),
    None => format!("Here are the {} projecting near you:\n", kind.label()),
  }
}

pub fn empty_results_text(kind: ListingKind, query: Option<&str>, context: Option<(NaiveDate, &str)>) -> String {
  let mut text = format!("Sorry, I couldn't find any {}", kind.empty_label());
  if let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) {
    text.push_str(&format!(" matching {query}"));
  }
  if let Some((date, location)) = context {
    text.push_str(&format!(" for {} near {location}", date.format(DATE_FORMAT)));
  }
  text
}

// Entries with no usable related lines are dropped entirely.
fn render_thing(thing: &Thing) -> Option<String> {
  let lines: Vec<String> = thing
    .related
    .iter()
    .filter(|other| !other.is_absent())
    .map(render_related)
    .collect();

  if lines.is_empty() {
    return None;
  }

  let mut paragraph = format!("*{}*\n", thing.name);
  for line in lines {
    paragraph.push_str(&line);
  }
  Some(paragraph)
}

fn render_related(other: &RelatedThing) -> String {
  let showtimes: Vec<String> = other
    .showtimes
    .iter()
    .map(|time| match other.tickets.get(time) {
      Some(url) => format!("[{time}]({url})"),
      None => time.clone(),
    })
    .collect();
  format!("{} - {}\n", other.name, showtimes.join(" "))
}
