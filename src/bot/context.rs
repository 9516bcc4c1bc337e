use crate::db::Db;
use crate::showtimes::ShowtimesClient;

#[derive(Clone)]
pub struct AppContext {
  db: Db,
  showtimes: ShowtimesClient,
  default_location: String,
}

impl AppContext {
  pub fn new(db: Db, showtimes: ShowtimesClient, default_location: String) -> Self {
    Self {
      db,
      showtimes,
      default_location,
    }
  }

  pub fn db(&self) -> &Db {
    &self.db
  }

  pub fn showtimes(&self) -> &ShowtimesClient {
    &self.showtimes
  }

  /// Used for chats that never set a location.
  pub fn default_location(&self) -> &str {
    &self.default_location
  }
}
