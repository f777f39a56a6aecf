//! Predictor Scheduling Tests
//!
//! Covers:
//! - Rush-before-background dispatch order
//! - Deduplication of repeated predictions
//! - Concurrency cap and slot refill on completion
//! - Congestion control flushing the whole backlog
//! - Feature gate, staleness, discard, and teardown behavior

use netpredictor::base::neterror::NetError;
use netpredictor::dns::{Addrs, DnsResolverWithOverrides, Name, Resolve, Resolving};
use netpredictor::predictor::{
    Predictor, PredictorConfig, ResolutionMotivation, ResolutionState,
};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Resolver that takes a configurable time per host and records dispatches.
struct DelayedResolver {
    default_delay: Duration,
    delays: HashMap<Name, Duration>,
    missing: HashSet<Name>,
    calls: Mutex<Vec<Name>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl DelayedResolver {
    fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            delays: HashMap::new(),
            missing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_delay(mut self, host: &str, delay: Duration) -> Self {
        self.delays.insert(Name::new(host), delay);
        self
    }

    fn with_missing(mut self, host: &str) -> Self {
        self.missing.insert(Name::new(host));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|n| n.to_string()).collect()
    }
}

impl Resolve for DelayedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        self.calls.lock().unwrap().push(name.clone());
        let delay = self.delays.get(&name).copied().unwrap_or(self.default_delay);
        let missing = self.missing.contains(&name);
        let in_flight = self.in_flight.clone();
        let max_in_flight = self.max_in_flight.clone();
        let completed = self.completed.clone();

        Box::pin(async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            completed.fetch_add(1, Ordering::SeqCst);

            if missing {
                return Err(NetError::NameNotResolved);
            }
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 0);
            Ok(Box::new(std::iter::once(addr)) as Addrs)
        })
    }
}

fn url(host: &str) -> Url {
    Url::parse(&format!("http://{host}/")).unwrap()
}

fn predictor(config: PredictorConfig, resolver: Arc<DelayedResolver>) -> Predictor {
    Predictor::builder().config(config).resolver(resolver).build()
}

async fn state_of(predictor: &Predictor, host: &str) -> Option<ResolutionState> {
    let results = predictor.results().await.unwrap();
    results.get(&Name::new(host)).map(|info| info.state())
}

#[tokio::test(start_paused = true)]
async fn test_rush_hosts_dispatched_first() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let predictor = predictor(PredictorConfig::default(), resolver.clone());

    predictor.dns_prefetch_motivated_list(&[url("a.com")], ResolutionMotivation::MouseOver);
    predictor.dns_prefetch_motivated_list(&[url("b.com")], ResolutionMotivation::PageScan);
    predictor.dns_prefetch_motivated_list(&[url("c.com")], ResolutionMotivation::LearnedReferral);

    assert_eq!(predictor.pending_lookups().await.unwrap(), 3);
    assert_eq!(resolver.calls(), vec!["a.com", "c.com", "b.com"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_call_keeps_order_on_multi_thread_runtime() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_secs(30)));
    let predictor = predictor(PredictorConfig::default(), resolver.clone());

    let hosts = [url("a.com"), url("b.com"), url("c.com"), url("d.com")];
    predictor.dns_prefetch_motivated_list(&hosts, ResolutionMotivation::MouseOver);

    assert_eq!(predictor.pending_lookups().await.unwrap(), 3);
    assert_eq!(resolver.calls(), vec!["a.com", "b.com", "c.com"]);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_prediction_is_noop() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(50)));
    let predictor = predictor(PredictorConfig::default(), resolver.clone());

    predictor.dns_prefetch_list(["dup.example.com"]);
    predictor.dns_prefetch_list(["DUP.example.com."]);
    predictor.dns_prefetch_motivated_list(
        &[url("dup.example.com")],
        ResolutionMotivation::MouseOver,
    );

    let results = predictor.results().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(predictor.stats().await.unwrap().deduplicated, 2);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(resolver.calls(), vec!["dup.example.com"]);
    assert_eq!(state_of(&predictor, "dup.example.com").await, Some(ResolutionState::Found));
}

#[tokio::test(start_paused = true)]
async fn test_pending_never_exceeds_cap() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(40)));
    let config = PredictorConfig { max_queue_delay: Duration::from_secs(60), ..Default::default() };
    let predictor = predictor(config, resolver.clone());

    let hosts: Vec<String> = (0..10).map(|i| format!("host{i}.example.com")).collect();
    predictor.dns_prefetch_list(&hosts);

    for _ in 0..20 {
        assert!(predictor.pending_lookups().await.unwrap() <= 3);
        tokio::time::sleep(Duration::from_millis(15)).await;
    }

    assert!(resolver.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(resolver.calls().len(), 10);
    let results = predictor.results().await.unwrap();
    assert!(results.values().all(|info| info.state() == ResolutionState::Found));
    assert_eq!(predictor.pending_lookups().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_congestion_flushes_backlog() {
    let config = PredictorConfig {
        max_concurrent_lookups: 1,
        max_queue_delay: Duration::from_millis(100),
        ..Default::default()
    };
    let resolver = Arc::new(
        DelayedResolver::new(Duration::from_millis(10)).with_delay("a.com", Duration::from_millis(200)),
    );
    let predictor = predictor(config, resolver.clone());

    predictor.dns_prefetch_list(["a.com", "b.com", "c.com"]);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(resolver.calls(), vec!["a.com"]);
    assert_eq!(state_of(&predictor, "a.com").await, Some(ResolutionState::Found));
    assert_eq!(state_of(&predictor, "b.com").await, Some(ResolutionState::Unfound));
    assert_eq!(state_of(&predictor, "c.com").await, Some(ResolutionState::Unfound));

    let stats = predictor.stats().await.unwrap();
    assert_eq!(stats.congestion_flushes, 1);
    assert_eq!(stats.discarded_by_congestion, 2);

    // The scheduler stays usable after a flush.
    predictor.dns_prefetch_list(["b.com"]);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(state_of(&predictor, "b.com").await, Some(ResolutionState::Found));
}

#[tokio::test(start_paused = true)]
async fn test_failed_lookup_recorded_as_no_such_name() {
    let resolver = Arc::new(
        DelayedResolver::new(Duration::from_millis(10)).with_missing("nope.invalid"),
    );
    let predictor = predictor(PredictorConfig::default(), resolver);

    predictor.dns_prefetch_list(["nope.invalid", "ok.example.com"]);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(state_of(&predictor, "nope.invalid").await, Some(ResolutionState::NoSuchName));
    assert_eq!(state_of(&predictor, "ok.example.com").await, Some(ResolutionState::Found));
    let stats = predictor.stats().await.unwrap();
    assert_eq!((stats.found, stats.not_found), (1, 1));
}

#[tokio::test]
async fn test_synchronous_results_skip_pending() {
    let mut overrides = HashMap::new();
    overrides.insert(Name::new("cached.local"), vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)]);
    overrides.insert(Name::new("blocked.local"), Vec::new());
    let fallback = Arc::new(DelayedResolver::new(Duration::from_secs(3600)));
    let resolver = Arc::new(DnsResolverWithOverrides::new(fallback, overrides));
    let predictor = Predictor::builder().resolver(resolver).build();

    predictor.dns_prefetch_list(["cached.local", "blocked.local"]);

    assert_eq!(predictor.pending_lookups().await.unwrap(), 0);
    assert_eq!(state_of(&predictor, "cached.local").await, Some(ResolutionState::Found));
    assert_eq!(state_of(&predictor, "blocked.local").await, Some(ResolutionState::NoSuchName));
    assert_eq!(predictor.stats().await.unwrap().completed_synchronously, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_host_resolved_again() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let config = PredictorConfig { cache_expiration: Duration::from_secs(2), ..Default::default() };
    let predictor = predictor(config, resolver.clone());

    predictor.dns_prefetch_list(["fresh.example.com"]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    predictor.dns_prefetch_list(["fresh.example.com"]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(resolver.calls().len(), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    predictor.dns_prefetch_list(["fresh.example.com"]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(resolver.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_feature_gate_disables_prefetch() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let gate = Arc::new(AtomicBool::new(false));
    let predictor = Predictor::builder().resolver(resolver.clone()).feature_gate(gate.clone()).build();

    assert!(!predictor.is_enabled());
    predictor.dns_prefetch_list(["a.com"]);
    assert!(predictor.results().await.unwrap().is_empty());

    gate.store(true, Ordering::Release);
    predictor.dns_prefetch_list(["a.com"]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(resolver.calls(), vec!["a.com"]);
}

#[tokio::test]
async fn test_disabled_config_starts_gated() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let config = PredictorConfig { enabled: false, ..Default::default() };
    let predictor = predictor(config, resolver.clone());

    predictor.dns_prefetch_list(["a.com"]);
    assert!(predictor.results().await.unwrap().is_empty());
    assert!(resolver.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_discard_all_results() {
    let config = PredictorConfig { max_concurrent_lookups: 1, ..Default::default() };
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(50)));
    let predictor = predictor(config, resolver.clone());

    predictor.dns_prefetch_list(["a.com", "b.com"]);
    assert_eq!(predictor.pending_lookups().await.unwrap(), 1);

    predictor.discard_all_results();
    let results = predictor.results().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[&Name::new("a.com")].is_marked_for_delete());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(predictor.results().await.unwrap().is_empty());
    assert_eq!(resolver.calls(), vec!["a.com"]);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_hosts_skipped() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let predictor = predictor(PredictorConfig::default(), resolver.clone());

    predictor.dns_prefetch_list(["", "bad host", "good.example.com"]);
    predictor.dns_prefetch_motivated_list(
        &[Url::parse("data:text/plain,hi").unwrap()],
        ResolutionMotivation::Omnibox,
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(resolver.calls(), vec!["good.example.com"]);
}

#[tokio::test(start_paused = true)]
async fn test_late_completion_after_teardown() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(500)));
    let predictor = predictor(PredictorConfig::default(), resolver.clone());

    predictor.dns_prefetch_list(["slow.example.com"]);
    assert_eq!(predictor.pending_lookups().await.unwrap(), 1);
    drop(predictor);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(resolver.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_concurrency_clamped() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_secs(10)));
    let config = PredictorConfig { max_concurrent_lookups: 0, ..Default::default() };
    let predictor = predictor(config, resolver);

    predictor.dns_prefetch_list(["a.com", "b.com"]);
    assert_eq!(predictor.pending_lookups().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ipv6_literal_resolved_without_brackets() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let predictor = predictor(PredictorConfig::default(), resolver.clone());

    predictor.dns_prefetch_motivated_list(
        &[Url::parse("http://[::1]/").unwrap()],
        ResolutionMotivation::Omnibox,
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(resolver.calls(), vec!["::1"]);
    assert_eq!(state_of(&predictor, "::1").await, Some(ResolutionState::Found));
}
