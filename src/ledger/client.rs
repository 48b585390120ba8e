//! Rate-limited, memoizing access to the ledger explorer.
//!
//! All external calls serialize through one gate enforcing a minimum
//! inter-call interval; one slow call therefore throttles every concurrent
//! analysis that needs the network. Results are cached per
//! `(address, token-filter)` for the process lifetime, and concurrent misses
//! on the same key collapse into a single round trip.

use crate::ledger::api::{LedgerAction, LedgerApi, LedgerError, LedgerQuery, LedgerTransaction};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::{debug, info};

/// Leaky-bucket-of-one throttle: a caller suspends until the minimum
/// interval since the previous call has elapsed. No burst allowance.
struct RateGate {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Waits out the remainder of the interval, then stamps the call. The
    /// lock is held across the sleep so concurrent callers queue behind it.
    async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

type CacheKey = (String, Option<String>);
type CachedHistory = Arc<Vec<LedgerTransaction>>;

/// Throttled, caching ledger client shared by every analyzer.
pub struct RateLimitedLedgerClient {
    api: Arc<dyn LedgerApi>,
    gate: RateGate,
    cache: DashMap<CacheKey, Arc<OnceCell<CachedHistory>>>,
}

impl RateLimitedLedgerClient {
    pub fn new(api: Arc<dyn LedgerApi>, requests_per_second: f64) -> Self {
        Self {
            api,
            gate: RateGate::new(requests_per_second),
            cache: DashMap::new(),
        }
    }

    /// Transaction history for an address, from cache when possible.
    ///
    /// Without a token filter this is the union of normal and internal
    /// transactions (order undefined beyond each sub-list's own descending
    /// time order); with one it is that token's transfer log. Failures are
    /// returned as [`LedgerError::Unavailable`] and are not cached, so a
    /// later call retries.
    pub async fn transaction_history(
        &self,
        address: &str,
        token_contract: Option<&str>,
    ) -> Result<CachedHistory, LedgerError> {
        let key: CacheKey = (
            address.to_ascii_lowercase(),
            token_contract.map(|c| c.to_ascii_lowercase()),
        );
        // Clone the cell out so no map lock is held across an await.
        let cell = self.cache.entry(key.clone()).or_default().value().clone();

        if let Some(cached) = cell.get() {
            debug!(address = %key.0, "using cached ledger history");
            return Ok(cached.clone());
        }

        cell.get_or_try_init(|| async {
            self.fetch_uncached(&key.0, key.1.as_deref())
                .await
                .map(Arc::new)
        })
        .await
        .map(Arc::clone)
    }

    async fn fetch_uncached(
        &self,
        address: &str,
        token_contract: Option<&str>,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        if let Some(contract) = token_contract {
            self.gate.acquire().await;
            return self
                .api
                .fetch(&LedgerQuery {
                    action: LedgerAction::TokenTx,
                    address: address.to_string(),
                    contract: Some(contract.to_string()),
                })
                .await;
        }

        info!(address = %address, "fetching ledger history");

        self.gate.acquire().await;
        let mut transactions = self
            .api
            .fetch(&LedgerQuery {
                action: LedgerAction::TxList,
                address: address.to_string(),
                contract: None,
            })
            .await?;

        // Internal transactions enrich the picture but are not required: a
        // failure here degrades to the normal list alone.
        self.gate.acquire().await;
        match self
            .api
            .fetch(&LedgerQuery {
                action: LedgerAction::TxListInternal,
                address: address.to_string(),
                contract: None,
            })
            .await
        {
            Ok(internal) => transactions.extend(internal),
            Err(e) => {
                debug!(address = %address, error = %e, "internal transaction list unavailable");
            }
        }

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub explorer: counts calls, answers from fixed per-action data.
    struct StubApi {
        calls: AtomicUsize,
        normal: Result<Vec<LedgerTransaction>, LedgerError>,
        internal: Result<Vec<LedgerTransaction>, LedgerError>,
    }

    impl StubApi {
        fn ok(normal: Vec<LedgerTransaction>, internal: Vec<LedgerTransaction>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                normal: Ok(normal),
                internal: Ok(internal),
            }
        }

        fn unavailable() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                normal: Err(LedgerError::Unavailable("down".to_string())),
                internal: Err(LedgerError::Unavailable("down".to_string())),
            }
        }
    }

    fn tx(value: &str, ts: &str) -> LedgerTransaction {
        LedgerTransaction {
            from: "0x1111111111111111111111111111111111111111".to_string(),
            to: "0x2222222222222222222222222222222222222222".to_string(),
            value: value.to_string(),
            time_stamp: ts.to_string(),
        }
    }

    #[async_trait]
    impl LedgerApi for StubApi {
        async fn fetch(
            &self,
            query: &LedgerQuery,
        ) -> Result<Vec<LedgerTransaction>, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match query.action {
                LedgerAction::TxList | LedgerAction::TokenTx => self.normal.clone(),
                LedgerAction::TxListInternal => self.internal.clone(),
            }
        }
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_network() {
        let api = Arc::new(StubApi::ok(vec![tx("10", "1700000000")], vec![]));
        let client = RateLimitedLedgerClient::new(api.clone(), 1000.0);

        let first = client
            .transaction_history("0xAbC0000000000000000000000000000000000001", None)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2); // normal + internal

        // same address, different case: still one cache entry
        let second = client
            .transaction_history("0xabc0000000000000000000000000000000000001", None)
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_normal_and_internal_lists_are_merged() {
        let api = Arc::new(StubApi::ok(
            vec![tx("10", "1700000000"), tx("20", "1700000100")],
            vec![tx("5", "1700000050")],
        ));
        let client = RateLimitedLedgerClient::new(api, 1000.0);

        let history = client
            .transaction_history("0xabc0000000000000000000000000000000000001", None)
            .await
            .unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_internal_failure_degrades_to_normal_list() {
        let api = Arc::new(StubApi {
            calls: AtomicUsize::new(0),
            normal: Ok(vec![tx("10", "1700000000")]),
            internal: Err(LedgerError::Unavailable("partial outage".to_string())),
        });
        let client = RateLimitedLedgerClient::new(api, 1000.0);

        let history = client
            .transaction_history("0xabc0000000000000000000000000000000000001", None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let api = Arc::new(StubApi::unavailable());
        let client = RateLimitedLedgerClient::new(api.clone(), 1000.0);

        let address = "0xabc0000000000000000000000000000000000001";
        assert!(client.transaction_history(address, None).await.is_err());
        let after_first = api.calls.load(Ordering::SeqCst);

        // a second attempt retries the network instead of replaying the error
        assert!(client.transaction_history(address, None).await.is_err());
        assert!(api.calls.load(Ordering::SeqCst) > after_first);
    }

    #[tokio::test]
    async fn test_token_filter_uses_separate_cache_key() {
        let api = Arc::new(StubApi::ok(vec![tx("10", "1700000000")], vec![]));
        let client = RateLimitedLedgerClient::new(api.clone(), 1000.0);

        let address = "0xabc0000000000000000000000000000000000001";
        client.transaction_history(address, None).await.unwrap();
        let after_plain = api.calls.load(Ordering::SeqCst);

        client
            .transaction_history(address, Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"))
            .await
            .unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), after_plain + 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_collapse_to_one_fetch() {
        let api = Arc::new(StubApi::ok(vec![tx("10", "1700000000")], vec![]));
        let client = Arc::new(RateLimitedLedgerClient::new(api.clone(), 1000.0));

        let address = "0xabc0000000000000000000000000000000000001";
        let a = {
            let client = client.clone();
            tokio::spawn(async move { client.transaction_history(address, None).await })
        };
        let b = {
            let client = client.clone();
            tokio::spawn(async move { client.transaction_history(address, None).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        // one winner fetched normal + internal; the loser waited on the cell
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_gate_spaces_calls() {
        let api = Arc::new(StubApi::ok(vec![tx("10", "1700000000")], vec![]));
        // 5 requests/second: normal + internal = two gated calls 200ms apart
        let client = RateLimitedLedgerClient::new(api, 5.0);

        let start = Instant::now();
        client
            .transaction_history("0xabc0000000000000000000000000000000000001", None)
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
