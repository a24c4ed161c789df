mod catalog;
mod preference;
mod recommendation;
mod review;
mod survey;
mod vote;

pub use catalog::{CatalogSnapshot, Season};
pub use preference::MemberPreferenceProfile;
pub use recommendation::{RecommendationResult, RecommendedPerfume, ScoredCandidate};
pub use review::Review;
pub use survey::{MatrixScore, RatedPerfume, SurveyAnswer};
pub use vote::{Vote, VoteAggregate, VoteCategory, VoteSummary};
