pub mod event_handlers;
pub mod preference_cache;
pub mod preferences;
pub mod recommendations;
pub mod survey;
pub mod tasks;
pub mod votes;

pub use event_handlers::{spawn_event_handlers, EventHandlerHandle};
pub use preference_cache::PreferenceCache;
pub use preferences::PreferenceAnalysisService;
pub use recommendations::RecommendationService;
pub use survey::SurveyService;
pub use tasks::{TaskPool, TaskPoolHandle};
pub use votes::VoteService;
