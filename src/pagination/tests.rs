//! Tests for pagination module

use super::*;
use crate::auth::Credentials;
use crate::clock::FixedClock;
use crate::error::{Error, Result};
use crate::http::PageSource;
use crate::types::{JsonValue, Page};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// In-memory page source answering from a script of responses per URL
#[derive(Default)]
struct ScriptedSource {
    responses: Mutex<HashMap<String, VecDeque<Result<Page>>>>,
    requested: Mutex<Vec<String>>,
    deadlines: Mutex<Vec<Option<Instant>>>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self::default()
    }

    fn page(self, url: &str, values: Vec<JsonValue>, next: Option<&str>) -> Self {
        self.respond(url, Ok(Page::new(values, next.map(str::to_string))))
    }

    fn respond(self, url: &str, response: Result<Page>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(
        &self,
        url: &str,
        _credentials: &Credentials,
        deadline: Option<Instant>,
    ) -> Result<Page> {
        self.requested.lock().unwrap().push(url.to_string());
        self.deadlines.lock().unwrap().push(deadline);
        self.responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(Error::connection(format!("no script for {url}"))))
    }
}

fn creds() -> Credentials {
    Credentials::new("user", "pass")
}

// ============================================================================
// PaginationState Tests
// ============================================================================

#[test]
fn test_pagination_state_new() {
    let state = PaginationState::new("https://api.example.com/p1");
    assert_eq!(state.current_url, "https://api.example.com/p1");
    assert!(state.items.is_empty());
    assert_eq!(state.pages_fetched, 0);
    assert!(!state.done);
}

#[test]
fn test_pagination_state_mutations() {
    let mut state = PaginationState::new("p1");

    state.accumulate(vec![json!(1), json!(2)]);
    state.accumulate(vec![json!(3)]);
    assert_eq!(state.items, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(state.pages_fetched, 2);

    state.advance("p2".to_string());
    assert_eq!(state.current_url, "p2");

    state.mark_done();
    assert!(state.done);
}

#[test]
fn test_pagination_state_fail_keeps_items() {
    let mut state = PaginationState::new("p1");
    state.accumulate(vec![json!({"id": 1})]);

    let err = state.fail(Error::decode("bad"));
    match err {
        Error::Incomplete {
            pages_fetched,
            items,
            source,
        } => {
            assert_eq!(pages_fetched, 1);
            assert_eq!(items, vec![json!({"id": 1})]);
            assert!(matches!(*source, Error::Decode { .. }));
        }
        other => panic!("Expected Incomplete, got {other:?}"),
    }
}

#[test]
fn test_pagination_config_builder() {
    let config = PaginationConfig::new()
        .max_pages(10)
        .deadline(Duration::from_secs(30));
    assert_eq!(config.max_pages, Some(10));
    assert_eq!(config.deadline, Some(Duration::from_secs(30)));

    let config = PaginationConfig::default();
    assert!(config.max_pages.is_none());
    assert!(config.deadline.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_pagination_config_validate() {
    assert!(PaginationConfig::new().deadline(MAX_DEADLINE).validate().is_ok());

    let err = PaginationConfig::new()
        .deadline(Duration::from_secs(u64::MAX))
        .validate()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "deadline"));

    let err = PaginationConfig::new().max_pages(0).validate().unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "max_pages"));
}

// ============================================================================
// Driver Tests
// ============================================================================

#[tokio::test]
async fn test_single_page() {
    let source = ScriptedSource::new().page("p1", vec![json!({"id": 1})], None);
    let driver = PaginationDriver::new(&source);

    let items = driver.fetch_all_pages("p1", &creds(), None).await.unwrap();

    assert_eq!(items, vec![json!({"id": 1})]);
    assert_eq!(source.requested(), vec!["p1"]);
}

#[tokio::test]
async fn test_pages_are_concatenated_in_server_order() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!("a"), json!("b")], Some("p2"))
        .page("p2", vec![], Some("p3"))
        .page("p3", vec![json!("c"), json!("a")], Some("p4"))
        .page("p4", vec![json!("b")], None);
    let driver = PaginationDriver::new(&source);

    let items = driver.fetch_all_pages("p1", &creds(), None).await.unwrap();

    // No reordering and no deduplication
    assert_eq!(
        items,
        vec![json!("a"), json!("b"), json!("c"), json!("a"), json!("b")]
    );
    assert_eq!(source.requested(), vec!["p1", "p2", "p3", "p4"]);
}

#[tokio::test]
async fn test_stops_at_page_without_next() {
    // p3 is scripted but must never be requested
    let source = ScriptedSource::new()
        .page("p1", vec![json!(1)], Some("p2"))
        .page("p2", vec![json!(2)], None)
        .page("p3", vec![json!(3)], None);
    let driver = PaginationDriver::new(&source);

    let items = driver.fetch_all_pages("p1", &creds(), None).await.unwrap();

    assert_eq!(items, vec![json!(1), json!(2)]);
    assert_eq!(source.requested(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_predicate_stops_even_with_next_link() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!({"id": 1})], Some("p2"))
        .page("p2", vec![json!({"id": 2})], None);
    let driver = PaginationDriver::new(&source);

    let stop_now = |_: &[JsonValue]| true;
    let items = driver
        .fetch_all_pages("p1", &creds(), Some(&stop_now))
        .await
        .unwrap();

    assert_eq!(items, vec![json!({"id": 1})]);
    assert_eq!(source.requested(), vec!["p1"]);
}

#[tokio::test]
async fn test_predicate_sees_full_accumulator() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!(1), json!(2)], Some("p2"))
        .page("p2", vec![json!(3)], Some("p3"))
        .page("p3", vec![json!(4)], None);
    let driver = PaginationDriver::new(&source);

    let seen = Mutex::new(Vec::new());
    let predicate = |items: &[JsonValue]| {
        seen.lock().unwrap().push(items.len());
        items.len() >= 3
    };
    let items = driver
        .fetch_all_pages("p1", &creds(), Some(&predicate))
        .await
        .unwrap();

    assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
}

#[tokio::test]
async fn test_predicate_false_follows_all_links() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!(1)], Some("p2"))
        .page("p2", vec![json!(2)], None);
    let driver = PaginationDriver::new(&source);

    let never = |_: &[JsonValue]| false;
    let items = driver
        .fetch_all_pages("p1", &creds(), Some(&never))
        .await
        .unwrap();

    assert_eq!(items, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn test_failure_carries_partial_items() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!("A")], Some("p2"))
        .respond("p2", Err(Error::Timeout { timeout_ms: 100 }));
    let driver = PaginationDriver::new(&source);

    let err = driver
        .fetch_all_pages("p1", &creds(), None)
        .await
        .unwrap_err();

    assert_eq!(err.partial_items(), Some(&[json!("A")][..]));
    assert!(matches!(err.root_cause(), Error::Timeout { .. }));
    assert!(matches!(err, Error::Incomplete { pages_fetched: 1, .. }));
}

#[tokio::test]
async fn test_failure_on_first_page() {
    let source = ScriptedSource::new().respond("p1", Err(Error::http_status(401, "denied")));
    let driver = PaginationDriver::new(&source);

    let err = driver
        .fetch_all_pages("p1", &creds(), None)
        .await
        .unwrap_err();

    assert_eq!(err.partial_items(), Some(&[][..]));
    assert!(matches!(
        err.root_cause(),
        Error::HttpStatus { status: 401, .. }
    ));
}

#[tokio::test]
async fn test_max_pages_limit() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!(1)], Some("p2"))
        .page("p2", vec![json!(2)], Some("p3"))
        .page("p3", vec![json!(3)], Some("p1"));
    let driver = PaginationDriver::new(&source).with_config(PaginationConfig::new().max_pages(2));

    let err = driver
        .fetch_all_pages("p1", &creds(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err.root_cause(),
        Error::PaginationLimitExceeded { max_pages: 2 }
    ));
    assert_eq!(err.partial_items(), Some(&[json!(1), json!(2)][..]));
    assert_eq!(source.requested(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_max_pages_not_hit_when_listing_ends() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!(1)], Some("p2"))
        .page("p2", vec![json!(2)], None);
    let driver = PaginationDriver::new(&source).with_config(PaginationConfig::new().max_pages(2));

    let items = driver.fetch_all_pages("p1", &creds(), None).await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_is_threaded_to_every_fetch() {
    let source = ScriptedSource::new()
        .page("p1", vec![json!(1)], Some("p2"))
        .page("p2", vec![json!(2)], None);
    let driver = PaginationDriver::new(&source)
        .with_config(PaginationConfig::new().deadline(Duration::from_secs(60)));

    let start = Instant::now();
    driver.fetch_all_pages("p1", &creds(), None).await.unwrap();

    let deadlines = source.deadlines.lock().unwrap().clone();
    assert_eq!(deadlines.len(), 2);
    assert!(deadlines
        .iter()
        .all(|d| *d == Some(start + Duration::from_secs(60))));
}

#[tokio::test]
async fn test_out_of_range_deadline_is_rejected_before_fetching() {
    let source = ScriptedSource::new().page("p1", vec![json!(1)], None);
    let driver = PaginationDriver::new(&source)
        .with_config(PaginationConfig::new().deadline(Duration::from_secs(u64::MAX)));

    let err = driver
        .fetch_all_pages("p1", &creds(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidConfigValue { .. }));
    assert!(source.requested().is_empty());
}

#[tokio::test]
async fn test_no_deadline_by_default() {
    let source = ScriptedSource::new().page("p1", vec![], None);
    PaginationDriver::new(&source)
        .fetch_all_pages("p1", &creds(), None)
        .await
        .unwrap();

    assert_eq!(*source.deadlines.lock().unwrap(), vec![None]);
}

// ============================================================================
// OlderThan Tests
// ============================================================================

fn july_15_2020() -> FixedClock {
    FixedClock::at_date(NaiveDate::from_ymd_opt(2020, 7, 15).unwrap())
}

fn ninety_days() -> OlderThan<FixedClock> {
    OlderThan::with_clock(
        july_15_2020(),
        ChronoDuration::milliseconds(DEFAULT_MAX_AGE_MS),
    )
}

#[test]
fn test_default_max_age_is_ninety_days() {
    assert_eq!(
        ChronoDuration::milliseconds(DEFAULT_MAX_AGE_MS),
        ChronoDuration::days(90)
    );
}

#[test]
fn test_older_than_item_beyond_threshold() {
    let predicate = ninety_days();
    assert!(predicate.should_stop(&[json!({"date": "2020-04-01"})]));
}

#[test]
fn test_older_than_item_within_threshold() {
    let predicate = ninety_days();
    assert!(!predicate.should_stop(&[json!({"date": "2020-06-20"})]));
}

#[test]
fn test_older_than_any_item_matches() {
    let predicate = ninety_days();
    let items = vec![
        json!({"date": "2020-07-01T08:00:00+00:00"}),
        json!({"date": "2020-03-30T23:59:59Z"}),
    ];
    assert!(predicate.should_stop(&items));
    assert!(!predicate.should_stop(&items[..1]));
}

#[test]
fn test_older_than_cutoff_is_exclusive() {
    let predicate = ninety_days();
    let cutoff = Utc.with_ymd_and_hms(2020, 4, 16, 0, 0, 0).unwrap();
    assert_eq!(predicate.cutoff(), cutoff);

    assert!(!predicate.is_older(&json!({"date": "2020-04-16T00:00:00Z"})));
    assert!(predicate.is_older(&json!({"date": "2020-04-15T23:59:59Z"})));
}

#[test]
fn test_older_than_ignores_missing_or_bad_dates() {
    let predicate = ninety_days();
    let items = vec![
        json!({"id": 1}),
        json!({"date": "last tuesday"}),
        json!({"date": true}),
        json!({"date": 1.5e12}),
        json!("2019-01-01"),
    ];
    assert!(!predicate.should_stop(&items));
    assert!(!predicate.should_stop(&[]));
}

#[test]
fn test_older_than_reads_epoch_millis_and_naive_timestamps() {
    let predicate = ninety_days();

    // 2020-04-01T00:00:00Z and 2020-06-20T00:00:00Z
    assert!(predicate.is_older(&json!({"date": 1_585_699_200_000_i64})));
    assert!(!predicate.is_older(&json!({"date": 1_592_611_200_000_i64})));

    assert!(predicate.is_older(&json!({"date": "2020-04-01T10:30:00"})));
    assert!(!predicate.is_older(&json!({"date": "2020-06-20 10:30:00.250"})));
}

#[test]
fn test_older_than_huge_age_never_matches() {
    let predicate = OlderThan::with_clock(july_15_2020(), ChronoDuration::MAX);
    assert_eq!(predicate.cutoff(), chrono::DateTime::<Utc>::MIN_UTC);
    assert!(!predicate.should_stop(&[json!({"date": "0001-01-01"})]));

    let predicate = OlderThan::with_clock(july_15_2020(), ChronoDuration::days(100_000_000));
    assert!(!predicate.should_stop(&[json!({"date": "1970-01-01"})]));

    let predicate = OlderThan::days(i64::MAX);
    assert!(!predicate.should_stop(&[json!({"date": "1970-01-01"})]));
}

#[test]
fn test_older_than_nested_field() {
    let predicate = ninety_days().date_field("$.author.date");
    let old = json!({"author": {"date": "2019-12-31"}});
    let flat = json!({"date": "2019-12-31"});

    assert!(predicate.should_stop(&[old]));
    assert!(!predicate.should_stop(&[flat]));
}

#[tokio::test]
async fn test_driver_with_older_than_predicate() {
    let source = ScriptedSource::new()
        .page(
            "p1",
            vec![json!({"hash": "a", "date": "2020-07-10T00:00:00Z"})],
            Some("p2"),
        )
        .page(
            "p2",
            vec![json!({"hash": "b", "date": "2020-01-02T00:00:00Z"})],
            Some("p3"),
        )
        .page(
            "p3",
            vec![json!({"hash": "c", "date": "2019-06-01T00:00:00Z"})],
            None,
        );
    let driver = PaginationDriver::new(&source);
    let predicate = ninety_days();

    let items = driver
        .fetch_all_pages("p1", &creds(), Some(&predicate))
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["hash"], "b");
    assert_eq!(source.requested(), vec!["p1", "p2"]);
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_parse_item_date() {
    let expected = Utc.with_ymd_and_hms(2020, 4, 1, 0, 0, 0).unwrap();
    assert_eq!(parse_item_date("2020-04-01"), Some(expected));
    assert_eq!(parse_item_date("2020-04-01T00:00:00Z"), Some(expected));
    assert_eq!(parse_item_date("2020-04-01T02:00:00+02:00"), Some(expected));
    assert_eq!(parse_item_date("2020-04-01T00:00:00"), Some(expected));
    assert_eq!(parse_item_date("2020-04-01 00:00:00.000"), Some(expected));
    assert_eq!(parse_item_date(" 2020-04-01 "), Some(expected));
    assert_eq!(parse_item_date("04/01/2020"), None);
}

#[test]
fn test_item_date() {
    let expected = Utc.with_ymd_and_hms(2020, 4, 1, 0, 0, 0).unwrap();
    assert_eq!(item_date(&json!("2020-04-01")), Some(expected));
    assert_eq!(item_date(&json!(1_585_699_200_000_i64)), Some(expected));
    assert_eq!(item_date(&json!(null)), None);
    assert_eq!(item_date(&json!({"date": "2020-04-01"})), None);
}

#[test]
fn test_extract_field() {
    let value = json!({"a": {"b": {"c": 1}}, "x": [1, 2]});
    assert_eq!(extract_field(&value, "a.b.c"), Some(&json!(1)));
    assert_eq!(extract_field(&value, "$.a.b"), Some(&json!({"c": 1})));
    assert_eq!(extract_field(&value, "x.0"), None);
    assert_eq!(extract_field(&value, "missing"), None);
}
