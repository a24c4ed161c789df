pub mod postgres;
pub mod redis;

pub use postgres::create_pool;
pub use postgres::{
    PgCatalogRepository, PgMemberRepository, PgReviewRepository, PgVoteRepository,
};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
pub use redis::{RedisAggregateStore, RedisProfileStore};
