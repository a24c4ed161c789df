use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::{MemberPreferenceProfile, VoteSummary};
use crate::ports::{AggregateStore, ProfileStore};

/// Preference profiles outlive their freshness window on purpose; stale
/// entries are repaired asynchronously rather than evicted.
const PROFILE_CACHE_TTL: u64 = 604800; // 1 week in seconds
const VOTE_SUMMARY_CACHE_TTL: u64 = 86400; // 1 day in seconds

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Profile(Uuid),
    VoteSummary(Uuid),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Profile(member_id) => write!(f, "profile:{}", member_id),
            CacheKey::VoteSummary(perfume_id) => write!(f, "votes:{}", perfume_id),
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving data from Redis
///
/// Reads and removals go straight to Redis; writes are queued to a
/// background task so hot paths never wait on cache write-back.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to flush
    /// all pending writes to Redis.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that processes cache write messages
    ///
    /// Continuously receives cache write requests from the channel and writes
    /// them to Redis. On shutdown signal, flushes all remaining messages
    /// before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to Redis
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Retrieves a value from the cache by key
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// The value is serialized and handed to the background writer; this
    /// method returns immediately. Use it when the caller does not need
    /// confirmation that the write landed.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: format!("{}", key),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }

    /// Removes a key immediately
    ///
    /// Invalidation must be visible to the next read, so this bypasses the
    /// background writer.
    pub async fn remove(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(format!("{}", key)).await?;
        Ok(())
    }
}

/// Redis-backed store for computed preference profiles
#[derive(Clone)]
pub struct RedisProfileStore {
    cache: Cache,
}

impl RedisProfileStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ProfileStore for RedisProfileStore {
    async fn load(&self, member_id: Uuid) -> AppResult<Option<MemberPreferenceProfile>> {
        self.cache
            .get_from_cache(&CacheKey::Profile(member_id))
            .await
    }

    async fn save(&self, profile: &MemberPreferenceProfile) -> AppResult<()> {
        self.cache.set_in_background(
            &CacheKey::Profile(profile.member_id),
            profile,
            PROFILE_CACHE_TTL,
        );
        Ok(())
    }

    async fn remove(&self, member_id: Uuid) -> AppResult<()> {
        self.cache.remove(&CacheKey::Profile(member_id)).await
    }
}

/// Redis-backed store for vote summaries
#[derive(Clone)]
pub struct RedisAggregateStore {
    cache: Cache,
}

impl RedisAggregateStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl AggregateStore for RedisAggregateStore {
    async fn load(&self, perfume_id: Uuid) -> AppResult<Option<VoteSummary>> {
        self.cache
            .get_from_cache(&CacheKey::VoteSummary(perfume_id))
            .await
    }

    async fn save(&self, summary: &VoteSummary) -> AppResult<()> {
        self.cache.set_in_background(
            &CacheKey::VoteSummary(summary.perfume_id),
            summary,
            VOTE_SUMMARY_CACHE_TTL,
        );
        Ok(())
    }
}
