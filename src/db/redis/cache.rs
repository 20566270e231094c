use redis::AsyncCommands;
use redis::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Normalised TMDB search parameters
    TmdbSearch(String),
    /// TMDB movie id
    TmdbDetails(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TmdbSearch(params) => write!(f, "tmdb:search:{}", params.to_lowercase()),
            CacheKey::TmdbDetails(id) => write!(f, "tmdb:movie:{}", id),
        }
    }
}

/// Creates a Redis client for caching
///
/// The client connects lazily; nothing is contacted until the first command.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// A serialized value waiting to be stored
struct PendingWrite {
    key: String,
    json: String,
    ttl: u64,
}

/// Read-through cache over Redis with write-behind stores
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer once queued writes are stored
pub struct CacheWriterHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer and waits until it has drained its queue
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task ended abnormally");
        }
    }
}

/// Owns the receiving side of the write queue
struct CacheWriter {
    client: Client,
    queue: mpsc::UnboundedReceiver<PendingWrite>,
}

impl CacheWriter {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        tracing::info!("Cache writer started");

        loop {
            tokio::select! {
                next = self.queue.recv() => match next {
                    Some(write) => self.store(write).await,
                    None => break,
                },
                _ = &mut stop => break,
            }
        }

        // no new writes after this point; store whatever is already queued
        self.queue.close();
        let mut flushed = 0usize;
        while let Some(write) = self.queue.recv().await {
            self.store(write).await;
            flushed += 1;
        }

        tracing::info!(flushed, "Cache writer stopped");
    }

    async fn store(&self, write: PendingWrite) {
        let result: AppResult<()> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let _: () = conn.set_ex(&write.key, &write.json, write.ttl).await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!(key = %write.key, error = %e, "Failed to write to Redis cache");
        }
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (writes, queue) = mpsc::unbounded_channel();
        let (stop, stop_rx) = oneshot::channel();

        let writer = CacheWriter {
            client: redis_client.clone(),
            queue,
        };
        let task = tokio::spawn(writer.run(stop_rx));

        (
            Self {
                redis_client,
                writes,
            },
            CacheWriterHandle { stop, task },
        )
    }

    /// Retrieves and deserializes a cached value, `None` on a miss
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })
            })
            .transpose()
    }

    /// Queues a value for storage without waiting for Redis
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl,
        };

        if self.writes.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_search_lowercase() {
        let key = CacheKey::TmdbSearch("query=The Matrix&year=1999".to_string());
        assert_eq!(format!("{}", key), "tmdb:search:query=the matrix&year=1999");
    }

    #[test]
    fn test_cache_key_display_details() {
        let key = CacheKey::TmdbDetails("550".to_string());
        assert_eq!(format!("{}", key), "tmdb:movie:550");
    }

    #[tokio::test]
    async fn test_shutdown_completes_and_later_writes_are_dropped() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.shutdown())
            .await
            .unwrap();

        cache.set_in_background(&CacheKey::TmdbDetails("550".to_string()), &"{}", 60);
    }
}
