pub mod context;
pub mod handlers;
pub mod routes;

pub type HandlerResult = anyhow::Result<()>;

pub use context::AppContext;
pub use handlers::build_schema;
