pub mod engine;
pub mod query;

pub use engine::SearchEngineClient;
pub use query::{fields, BoolQuery, QueryClause};
