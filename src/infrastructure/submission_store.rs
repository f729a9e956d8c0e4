//! 提交缓存 - 基础设施层
//!
//! 只提供 get / put / invalidate 三个能力。
//! 同一个 ID 的单写者语义由 `ProgressionController` 保证，存储本身不做加锁编排。

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::models::{CacheEntry, SubmissionId};

const DEFAULT_MAX_ENTRIES: usize = 5_000;

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 按提交 ID 索引的缓存
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// 读取条目，不存在或已过期时返回 None
    async fn get(&self, id: &SubmissionId) -> Result<Option<CacheEntry>, StoreError>;

    /// 写入（覆盖）条目
    async fn put(&self, id: &SubmissionId, entry: CacheEntry) -> Result<(), StoreError>;

    /// 删除条目，返回是否存在
    async fn invalidate(&self, id: &SubmissionId) -> Result<bool, StoreError>;
}

struct StoredEntry {
    entry: CacheEntry,
    inserted_at: Instant,
}

/// 进程内缓存
///
/// - 容量上限：超出时淘汰最早写入的条目
/// - TTL：从首次写入开始计时，过期条目读取时视为不存在
pub struct InMemorySubmissionStore {
    entries: RwLock<HashMap<SubmissionId, StoredEntry>>,
    order: RwLock<VecDeque<SubmissionId>>,
    max_entries: usize,
    ttl: Option<Duration>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, None)
    }

    pub fn with_limits(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            order: RwLock::new(VecDeque::new()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// 当前条目数（包含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, stored: &StoredEntry) -> bool {
        self.ttl
            .map(|ttl| stored.inserted_at.elapsed() >= ttl)
            .unwrap_or(false)
    }

    fn internal(e: impl std::fmt::Display) -> StoreError {
        StoreError::Internal(e.to_string())
    }
}

impl Default for InMemorySubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn get(&self, id: &SubmissionId) -> Result<Option<CacheEntry>, StoreError> {
        let expired = {
            let entries = self.entries.read().map_err(Self::internal)?;
            match entries.get(id) {
                None => return Ok(None),
                Some(stored) if !self.is_expired(stored) => {
                    return Ok(Some(stored.entry.clone()))
                }
                Some(_) => true,
            }
        };

        if expired {
            debug!("缓存条目已过期: {}", id);
            self.invalidate(id).await?;
        }
        Ok(None)
    }

    async fn put(&self, id: &SubmissionId, entry: CacheEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(Self::internal)?;
        let mut order = self.order.write().map_err(Self::internal)?;

        if let Some(stored) = entries.get_mut(id) {
            stored.entry = entry;
            return Ok(());
        }

        if entries.len() >= self.max_entries {
            if let Some(oldest) = order.pop_front() {
                debug!("缓存已满，淘汰最早的条目: {}", oldest);
                entries.remove(&oldest);
            }
        }

        entries.insert(
            id.clone(),
            StoredEntry {
                entry,
                inserted_at: Instant::now(),
            },
        );
        order.push_back(id.clone());
        Ok(())
    }

    async fn invalidate(&self, id: &SubmissionId) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(Self::internal)?;
        let removed = entries.remove(id).is_some();
        if removed {
            let mut order = self.order.write().map_err(Self::internal)?;
            order.retain(|existing| existing != id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SolutionSet, SolutionStep, Submission};

    fn entry(id: &str) -> CacheEntry {
        let submission = Submission::new(SubmissionId::from(id), "Solve 2x = 4", None);
        CacheEntry::new(
            submission,
            SolutionSet::new(vec![SolutionStep {
                step_number: 1,
                explanation: "Divide by 2".into(),
                formula: "x = 2".into(),
            }]),
        )
    }

    #[test]
    fn test_put_get_invalidate() {
        tokio_test::block_on(async {
            let store = InMemorySubmissionStore::new();
            let id = SubmissionId::from("a");

            assert!(store.get(&id).await.unwrap().is_none());
            store.put(&id, entry("a")).await.unwrap();
            assert_eq!(store.get(&id).await.unwrap().unwrap().submission_id, id);

            assert!(store.invalidate(&id).await.unwrap());
            assert!(!store.invalidate(&id).await.unwrap());
            assert!(store.get(&id).await.unwrap().is_none());
        });
    }

    #[test]
    fn test_put_overwrites_without_growing() {
        tokio_test::block_on(async {
            let store = InMemorySubmissionStore::new();
            let id = SubmissionId::from("a");
            store.put(&id, entry("a")).await.unwrap();

            let mut updated = entry("a");
            updated.phase = crate::models::Phase::Complete;
            store.put(&id, updated).await.unwrap();

            assert_eq!(store.len(), 1);
            assert_eq!(
                store.get(&id).await.unwrap().unwrap().phase,
                crate::models::Phase::Complete
            );
        });
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        tokio_test::block_on(async {
            let store = InMemorySubmissionStore::with_limits(2, None);
            for id in ["a", "b", "c"] {
                store.put(&SubmissionId::from(id), entry(id)).await.unwrap();
            }

            assert!(store.get(&SubmissionId::from("a")).await.unwrap().is_none());
            assert!(store.get(&SubmissionId::from("b")).await.unwrap().is_some());
            assert!(store.get(&SubmissionId::from("c")).await.unwrap().is_some());
        });
    }

    #[test]
    fn test_expired_entries_read_as_absent() {
        tokio_test::block_on(async {
            let store = InMemorySubmissionStore::with_limits(10, Some(Duration::from_millis(1)));
            let id = SubmissionId::from("a");
            store.put(&id, entry("a")).await.unwrap();

            std::thread::sleep(Duration::from_millis(5));

            assert!(store.get(&id).await.unwrap().is_none());
            assert!(store.is_empty());
        });
    }
}
