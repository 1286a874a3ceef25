//! Source adapters: lazy prospect streams over external directory APIs

use crate::fetch::{FetchResponse, HttpFetch};
use crate::mapping::{self, MappingError, MappingRule};
use crate::prospect::{DataSource, ProspectRecord};
use crate::{Error, Result};
use leadx_core::EnumValue;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Page size requested from the ERP directory
pub const ERP_PAGE_SIZE: usize = 50;

/// How an endpoint hands out its records
#[derive(Debug, Clone)]
pub enum Pagination {
    /// `limit`/`skip` offset paging, terminated by the first page's `total`
    Paged { limit: usize },
    /// One request with fixed query parameters
    SingleShot {
        params: &'static [(&'static str, &'static str)],
    },
}

/// Everything needed to pull prospects from one source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub source: DataSource,
    pub base_url: String,
    /// Key of the results array in the response body
    pub results_key: &'static str,
    pub pagination: Pagination,
    pub mapping: &'static [MappingRule],
}

impl SourceConfig {
    pub fn erp(base_url: impl Into<String>) -> Self {
        Self {
            source: DataSource::Erp,
            base_url: base_url.into(),
            results_key: "users",
            pagination: Pagination::Paged { limit: ERP_PAGE_SIZE },
            mapping: mapping::ERP,
        }
    }

    pub fn kueba(base_url: impl Into<String>) -> Self {
        Self {
            source: DataSource::Kueba,
            base_url: base_url.into(),
            results_key: "results",
            pagination: Pagination::SingleShot {
                params: &[("nat", "ch"), ("results", "100")],
            },
            mapping: mapping::KUEBA,
        }
    }

    pub fn for_source(source: DataSource, base_url: impl Into<String>) -> Self {
        match source {
            DataSource::Erp => Self::erp(base_url),
            DataSource::Kueba => Self::kueba(base_url),
        }
    }

    fn validated_url(&self) -> Result<String> {
        let raw = self.base_url.trim();
        if raw.is_empty() {
            return Err(Error::Config(format!("{} base URL is not configured", self.source.label())));
        }
        let url = reqwest::Url::parse(raw)
            .map_err(|e| Error::Config(format!("{} base URL '{raw}' is invalid: {e}", self.source.label())))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "{} base URL '{raw}' must use http or https",
                self.source.label()
            )));
        }
        Ok(url.to_string())
    }
}

/// A configured source bound to an HTTP capability
pub struct SourceAdapter {
    config: SourceConfig,
    fetcher: Arc<dyn HttpFetch>,
}

impl SourceAdapter {
    pub fn new(config: SourceConfig, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { config, fetcher }
    }

    pub fn source(&self) -> DataSource {
        self.config.source
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Start a fresh stream. Fails before any request if the URL is unusable.
    pub fn fetch(&self) -> Result<ProspectStream<'_>> {
        let url = self.config.validated_url()?;
        Ok(ProspectStream {
            adapter: self,
            url,
            buffer: VecDeque::new(),
            cursor: Cursor::Start,
            total: None,
            skipped: 0,
        })
    }

    /// Map one raw element and tag it with this adapter's source
    fn normalize(&self, raw: &Value) -> std::result::Result<ProspectRecord, MappingError> {
        let mut document = mapping::apply(self.config.mapping, raw)?;
        document.insert(
            "source".to_string(),
            Value::String(self.config.source.as_value().to_string()),
        );
        serde_json::from_value(Value::Object(document)).map_err(|e| MappingError::Shape(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Start,
    Skip(usize),
    Done,
}

/// Lazy, finite, non-restartable stream of prospects.
///
/// At most one page is buffered; the next request is only made once the
/// buffer is drained. After a fatal error the stream is exhausted.
pub struct ProspectStream<'a> {
    adapter: &'a SourceAdapter,
    url: String,
    buffer: VecDeque<Value>,
    cursor: Cursor,
    total: Option<u64>,
    skipped: usize,
}

impl<'a> ProspectStream<'a> {
    pub async fn next(&mut self) -> Result<Option<ProspectRecord>> {
        loop {
            while let Some(raw) = self.buffer.pop_front() {
                match self.adapter.normalize(&raw) {
                    Ok(record) => return Ok(Some(record)),
                    Err(e) => {
                        self.skipped += 1;
                        warn!(
                            source = %self.adapter.source(),
                            error = %e,
                            "Skipping element that does not map to a prospect"
                        );
                    }
                }
            }

            if self.cursor == Cursor::Done {
                return Ok(None);
            }

            if let Err(e) = self.load_page().await {
                self.cursor = Cursor::Done;
                self.buffer.clear();
                return Err(e);
            }
        }
    }

    /// Number of elements dropped because they failed to map
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// `total` reported by the first page, if any
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    async fn load_page(&mut self) -> Result<()> {
        let config = &self.adapter.config;
        let skip = match self.cursor {
            Cursor::Start => 0,
            Cursor::Skip(skip) => skip,
            Cursor::Done => return Ok(()),
        };

        let query: Vec<(String, String)> = match &config.pagination {
            Pagination::Paged { limit } => vec![
                ("limit".to_string(), limit.to_string()),
                ("skip".to_string(), skip.to_string()),
            ],
            Pagination::SingleShot { params } => params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };

        debug!(source = %config.source, url = %self.url, skip, "Requesting page");
        let response = self
            .adapter
            .fetcher
            .get_json(&self.url, &query)
            .await
            .map_err(|e| match e {
                Error::Transport(msg) => Error::Transport(format!("{}: {msg}", config.source.label())),
                Error::Protocol(msg) => Error::Protocol(format!("{}: {msg}", config.source.label())),
                other => other,
            })?;

        let elements = extract_results(config, &response)?;
        let page_len = elements.len();
        if self.cursor == Cursor::Start {
            self.total = read_total(config.source, response.body.get("total"));
        }
        self.buffer.extend(elements);

        self.cursor = match config.pagination {
            Pagination::Paged { limit } => {
                let next = skip + limit;
                match self.total {
                    // An empty page ends the walk even if `total` claims more
                    Some(total) if page_len > 0 && (next as u64) < total => Cursor::Skip(next),
                    _ => Cursor::Done,
                }
            }
            Pagination::SingleShot { .. } => Cursor::Done,
        };
        Ok(())
    }
}

/// Integers, integral floats and numeric strings are accepted
fn read_total(source: DataSource, total: Option<&Value>) -> Option<u64> {
    let value = match total {
        None | Some(Value::Null) => return None,
        Some(value) => value,
    };
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(source = %source, total = %value, "Ignoring unusable total, reading a single page");
    }
    parsed
}

fn extract_results(config: &SourceConfig, response: &FetchResponse) -> Result<Vec<Value>> {
    if !response.is_success() {
        return Err(Error::Transport(format!(
            "{} responded with HTTP {}",
            config.source.label(),
            response.status
        )));
    }
    match response.body.get(config.results_key) {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(Error::Protocol(format!(
            "{} response key '{}' is not an array",
            config.source.label(),
            config.results_key
        ))),
        None => Err(Error::Protocol(format!(
            "{} response is missing '{}'",
            config.source.label(),
            config.results_key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{erp_page, erp_user_with, query, ScriptedFetcher};
    use serde_json::json;

    fn erp_adapter(fetcher: &Arc<ScriptedFetcher>) -> SourceAdapter {
        SourceAdapter::new(SourceConfig::erp("https://erp.example.test/users"), fetcher.clone())
    }

    async fn drain(stream: &mut ProspectStream<'_>) -> Result<Vec<ProspectRecord>> {
        let mut records = Vec::new();
        while let Some(record) = stream.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    #[tokio::test]
    async fn test_paginates_until_total() {
        let users: Vec<Value> = (1..=3).map(|i| erp_user_with(i, &format!("u{i}@x.com"))).collect();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            FetchResponse::ok(erp_page(users[..2].to_vec(), Some(52))),
            FetchResponse::ok(erp_page(users[2..].to_vec(), Some(52))),
        ]));
        let adapter = erp_adapter(&fetcher);
        let mut stream = adapter.fetch().unwrap();
        let records = drain(&mut stream).await.unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.source == DataSource::Erp));
        let requests = fetcher.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, query(&[("limit", "50"), ("skip", "0")]));
        assert_eq!(requests[1].1, query(&[("limit", "50"), ("skip", "50")]));
    }

    #[tokio::test]
    async fn test_missing_total_stops_after_one_page() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![FetchResponse::ok(erp_page(
            vec![erp_user_with(1, "a@x.com")],
            None,
        ))]));
        let adapter = erp_adapter(&fetcher);
        let records = drain(&mut adapter.fetch().unwrap()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_total_as_string_or_float_still_paginates() {
        for total in [json!("52"), json!(52.0)] {
            let mut first = erp_page(vec![erp_user_with(1, "a@x.com")], None);
            first["total"] = total.clone();
            let mut second = erp_page(vec![erp_user_with(2, "b@x.com")], None);
            second["total"] = total.clone();
            let fetcher = Arc::new(ScriptedFetcher::new(vec![
                FetchResponse::ok(first),
                FetchResponse::ok(second),
            ]));

            let adapter = erp_adapter(&fetcher);
            let mut stream = adapter.fetch().unwrap();
            let records = drain(&mut stream).await.unwrap();
            assert_eq!(records.len(), 2, "{total}");
            assert_eq!(stream.total(), Some(52));
            assert_eq!(fetcher.requests().len(), 2);
        }
    }

    #[test]
    fn test_unusable_total_is_ignored() {
        for total in [json!("many"), json!(-3), json!(12.5), json!([52])] {
            assert_eq!(read_total(DataSource::Erp, Some(&total)), None, "{total}");
        }
        assert_eq!(read_total(DataSource::Erp, Some(&Value::Null)), None);
        assert_eq!(read_total(DataSource::Erp, Some(&json!(" 7 "))), Some(7));
    }

    #[tokio::test]
    async fn test_pages_are_requested_lazily() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            FetchResponse::ok(erp_page(vec![erp_user_with(1, "a@x.com")], Some(100))),
            FetchResponse::ok(erp_page(vec![erp_user_with(2, "b@x.com")], Some(100))),
        ]));
        let adapter = erp_adapter(&fetcher);
        let mut stream = adapter.fetch().unwrap();
        assert_eq!(fetcher.requests().len(), 0);
        stream.next().await.unwrap().unwrap();
        assert_eq!(fetcher.requests().len(), 1);
        stream.next().await.unwrap().unwrap();
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_elements_are_skipped() {
        let mut broken = erp_user_with(2, "b@x.com");
        broken.as_object_mut().unwrap().remove("email");
        let page = erp_page(
            vec![erp_user_with(1, "a@x.com"), broken, json!(42), erp_user_with(3, "c@x.com")],
            Some(4),
        );
        let fetcher = Arc::new(ScriptedFetcher::new(vec![FetchResponse::ok(page)]));
        let adapter = erp_adapter(&fetcher);
        let mut stream = adapter.fetch().unwrap();
        let records = drain(&mut stream).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(stream.skipped(), 2);
    }

    #[tokio::test]
    async fn test_non_success_status_is_fatal() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![FetchResponse {
            status: 503,
            body: Value::Null,
        }]));
        let adapter = erp_adapter(&fetcher);
        let mut stream = adapter.fetch().unwrap();
        assert!(matches!(stream.next().await, Err(Error::Transport(_))));
        assert!(stream.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_results_key_is_fatal() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![FetchResponse::ok(json!({"people": []}))]));
        let adapter = erp_adapter(&fetcher);
        let result = adapter.fetch().unwrap().next().await;
        assert!(matches!(&result, Err(Error::Protocol(msg)) if msg.starts_with("ERP")));

        let fetcher = Arc::new(ScriptedFetcher::new(vec![FetchResponse::ok(json!({"users": "nope"}))]));
        let adapter = erp_adapter(&fetcher);
        let result = adapter.fetch().unwrap().next().await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    struct GarbledFetcher;

    #[async_trait::async_trait]
    impl HttpFetch for GarbledFetcher {
        async fn get_json(&self, _url: &str, _query: &[(String, String)]) -> Result<FetchResponse> {
            Err(Error::Protocol("response body is not JSON: expected value".to_string()))
        }
    }

    #[tokio::test]
    async fn test_fetcher_errors_name_the_source() {
        let adapter = SourceAdapter::new(
            SourceConfig::kueba("https://people.example.test/api"),
            Arc::new(GarbledFetcher),
        );
        match adapter.fetch().unwrap().next().await {
            Err(Error::Protocol(msg)) => {
                assert_eq!(msg, "Küba: response body is not JSON: expected value")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_any_request() {
        let fetcher = Arc::new(ScriptedFetcher::new(Vec::new()));
        for url in ["", "   ", "not a url", "ftp://erp.example.test"] {
            let adapter = SourceAdapter::new(SourceConfig::erp(url), fetcher.clone());
            assert!(matches!(adapter.fetch(), Err(Error::Config(_))), "{url:?}");
        }
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_kueba_single_shot() {
        let person = json!({
            "gender": "female",
            "name": {"first": "Lea", "last": "Keller"},
            "location": {
                "street": {"number": 12, "name": "Bahnhofstrasse"},
                "city": "Zug",
                "state": "Zug",
                "country": "Switzerland",
                "postcode": "6300",
                "coordinates": {"latitude": "47.17", "longitude": "8.51"}
            },
            "email": "lea.keller@example.com",
            "login": {"uuid": "c0ffee00-0000-4000-8000-000000000001"},
            "dob": {"date": "1990-04-02T08:15:00.000Z", "age": 34},
            "phone": "041 555 12 12",
            "picture": {"large": "https://randomuser.me/api/portraits/women/1.jpg"}
        });
        let fetcher = Arc::new(ScriptedFetcher::new(vec![FetchResponse::ok(
            json!({"results": [person], "info": {"results": 1}}),
        )]));
        let adapter = SourceAdapter::new(SourceConfig::kueba("https://people.example.test/api"), fetcher.clone());
        let records = drain(&mut adapter.fetch().unwrap()).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, DataSource::Kueba);
        assert_eq!(records[0].address.address, "Bahnhofstrasse 12");
        assert_eq!(records[0].blood_group, None);
        let requests = fetcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, query(&[("nat", "ch"), ("results", "100")]));
    }
}
