use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{
    ConditionOracle, ConditionRequest, JudgmentRequest, LevelJudgment, OracleError,
    PrioritizationRequest, RankedAction,
};
use crate::evaluation::ConditionVerification;

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
enum CachedResponse {
    Verification(ConditionVerification),
    Judgment(LevelJudgment),
    Prioritization(Vec<RankedAction>),
}

#[derive(Debug, Default)]
struct Entries {
    responses: HashMap<String, CachedResponse>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
}

/// Memoized oracle answers keyed by a SHA-256 digest of the request.
/// Holds at most `capacity` answers and evicts the oldest first.
#[derive(Debug)]
pub struct OracleCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl Default for OracleCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl OracleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hex digest of kind, oracle identity and the serialized request.
    pub fn key<T: Serialize>(kind: &str, identity: &str, request: &T) -> Result<String, OracleError> {
        let payload = serde_json::to_vec(request).map_err(|err| OracleError::Configuration {
            reason: format!("request is not serializable: {err}"),
        })?;

        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([0]);
        hasher.update(identity.as_bytes());
        hasher.update([0]);
        hasher.update(&payload);

        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.responses.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.responses.clear();
            entries.order.clear();
        }
    }

    fn get(&self, key: &str) -> Option<CachedResponse> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.responses.get(key).cloned())
    }

    fn insert(&self, key: String, response: CachedResponse) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.responses.insert(key.clone(), response).is_some() {
            return;
        }
        entries.order.push_back(key);

        while entries.responses.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.responses.remove(&oldest);
            tracing::debug!(capacity = self.capacity, "oracle cache full, evicted oldest answer");
        }
    }
}

/// Decorator that consults an [`OracleCache`] before the wrapped oracle.
/// Failures are never cached.
pub struct CachedOracle<O> {
    inner: O,
    cache: Arc<OracleCache>,
}

impl<O> CachedOracle<O>
where
    O: ConditionOracle,
{
    pub fn new(inner: O, cache: Arc<OracleCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<OracleCache> {
        &self.cache
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O> ConditionOracle for CachedOracle<O>
where
    O: ConditionOracle,
{
    fn identity(&self) -> &str {
        self.inner.identity()
    }

    async fn verify_condition(
        &self,
        request: &ConditionRequest,
    ) -> Result<ConditionVerification, OracleError> {
        let key = OracleCache::key("verify_condition", self.identity(), request)?;
        if let Some(CachedResponse::Verification(hit)) = self.cache.get(&key) {
            tracing::debug!(condition_id = %request.condition_id, "oracle cache hit");
            return Ok(hit);
        }

        let verification = self.inner.verify_condition(request).await?;
        self.cache
            .insert(key, CachedResponse::Verification(verification.clone()));
        Ok(verification)
    }

    async fn judge_indicator(
        &self,
        request: &JudgmentRequest,
    ) -> Result<LevelJudgment, OracleError> {
        let key = OracleCache::key("judge_indicator", self.identity(), request)?;
        if let Some(CachedResponse::Judgment(hit)) = self.cache.get(&key) {
            tracing::debug!(indicator_id = %request.rubric.indicator_id, "oracle cache hit");
            return Ok(hit);
        }

        let judgment = self.inner.judge_indicator(request).await?;
        self.cache
            .insert(key, CachedResponse::Judgment(judgment.clone()));
        Ok(judgment)
    }

    async fn prioritize(
        &self,
        request: &PrioritizationRequest,
    ) -> Result<Vec<RankedAction>, OracleError> {
        let key = OracleCache::key("prioritize", self.identity(), request)?;
        if let Some(CachedResponse::Prioritization(hit)) = self.cache.get(&key) {
            tracing::debug!(indicators = request.indicators.len(), "oracle cache hit");
            return Ok(hit);
        }

        let actions = self.inner.prioritize(request).await?;
        self.cache
            .insert(key, CachedResponse::Prioritization(actions.clone()));
        Ok(actions)
    }
}
