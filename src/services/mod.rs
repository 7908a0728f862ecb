pub mod analyzer;
pub mod cache;
pub mod event_emitter;
pub mod fingerprint;
pub mod intake;
pub mod news_source;
pub mod scheduler;
pub mod status_reader;
pub mod store;
pub mod subscriber;
pub mod worker;

pub use analyzer::{Analyzer, AnalyzerError, HttpAnalyzer};
pub use cache::{init_redis_connection, CacheError, RedisCache};
pub use event_emitter::EventEmitter;
pub use fingerprint::{fingerprint, fingerprint_of_search};
pub use intake::{Intake, IntakeOutcome};
pub use news_source::{HttpNewsSource, NewsSource, NewsSourceError};
pub use scheduler::{DispatchTask, SchedulerConfig, StaleRecoveryTask};
pub use status_reader::{StatusOutcome, StatusReader};
pub use store::{
    AnalysesRepo, EventsRepo, LogsRepo, PainPointsRepo, ResultsRepo, SearchesRepo, StoreError,
    UsageRepo,
};
pub use subscriber::{BackfillSnapshot, Subscriber};
pub use worker::{Worker, WorkerConfig};
