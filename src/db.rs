use std::future::Future;

use anyhow::Result;
use sqlx::Pool;
use sqlx::Postgres;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Per-chat location preference.
pub trait LocationStore {
  fn location(&self, chat_id: i64) -> impl Future<Output = Result<Option<String>>> + Send;
  fn set_location(&self, chat_id: i64, location: &str) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Clone)]
pub struct Db {
  pool: Pool<Postgres>,
}

impl Db {
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(5).connect(database_url).await?;
    MIGRATOR.run(&pool).await?;
    Ok(Self { pool })
  }
}

impl LocationStore for Db {
  #[instrument(skip(self))]
  async fn location(&self, chat_id: i64) -> Result<Option<String>> {
    let location = sqlx::query_scalar::<_, String>(r#"SELECT location FROM chat_locations WHERE chat_id = $1"#)
      .bind(chat_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(location)
  }

  #[instrument(skip(self))]
  async fn set_location(&self, chat_id: i64, location: &str) -> Result<()> {
    sqlx::query(
      r#"
      INSERT INTO chat_locations (chat_id, location)
      VALUES ($1, $2)
      ON CONFLICT (chat_id) DO UPDATE SET
        location = EXCLUDED.location,
        updated_at = NOW()
      "#,
    )
    .bind(chat_id)
    .bind(location)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}
