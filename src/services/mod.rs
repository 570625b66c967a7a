pub mod analyst;
pub mod batch;
pub mod execution;
pub mod extraction;
pub mod fallback;
pub mod generation;
pub mod openai_client;
pub mod planning;
pub mod resolver;
pub mod search;
pub mod synthesis;
pub mod warehouse;

pub use analyst::{Analyst, AnalystReply, CortexAnalystClient};
pub use execution::LoopOutcome;
pub use fallback::{FallbackTemplate, FALLBACK_ROW_LIMIT};
pub use generation::Generator;
pub use openai_client::OpenAIClient;
pub use resolver::QueryResolver;
pub use search::{CortexSearchClient, GuideSearch};
pub use warehouse::{QueryExecutor, SqlApiExecutor};
