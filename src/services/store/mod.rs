//! Relational persistence (C2) — Postgres via `sqlx`.
//!
//! One small repository struct per aggregate, each holding a `PgPool`:
//! plain `sqlx::query`/`query_as` calls, domain-error conversion via
//! `#[from]`.

pub mod analyses;
pub mod events;
pub mod logs;
pub mod pain_points;
pub mod results;
pub mod searches;
pub mod usage;

pub use analyses::AnalysesRepo;
pub use events::EventsRepo;
pub use logs::LogsRepo;
pub use pain_points::PainPointsRepo;
pub use results::ResultsRepo;
pub use searches::SearchesRepo;
pub use usage::UsageRepo;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid stored data: {0}")]
    Decode(String),
}
