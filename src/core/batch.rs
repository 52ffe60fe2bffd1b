//! Runs a batch of lookups against the service and accounts for every reply.
//!
//! Two strategies are available. `Sequential` awaits one request at a time
//! in input order. `Concurrent` issues every request up front, keeps the
//! originating item of each in-flight request in a pending map keyed by item
//! index, and only builds the output layer once that map is empty.

use crate::core::layer::{LayerSchema, PointLayer};
use crate::core::query;
use crate::core::report::BatchReport;
use crate::core::response::{parse_reverse, parse_search};
use crate::domain::model::{
    AddressFailure, BatchItem, BatchKind, Coordinate, ExecutionMode, GeocodeRequest, Place,
    ReversePlace,
};
use crate::domain::ports::{ConfigProvider, FetchError, ServiceClient};
use crate::utils::error::{GeocodeError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub search_url: String,
    pub reverse_url: String,
    pub max_address: usize,
    pub max_results: usize,
    pub zoom: u8,
    pub detailed: bool,
    pub show_labels: bool,
    pub layer_name: String,
    pub mode: ExecutionMode,
    pub concurrent_requests: usize,
}

impl BatchOptions {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            search_url: config.search_url(),
            reverse_url: config.reverse_url(),
            max_address: config.max_address(),
            max_results: config.max_results(),
            zoom: config.level_of_detail(),
            detailed: config.detailed(),
            show_labels: config.show_labels(),
            layer_name: config.layer_name().to_string(),
            mode: config.execution_mode(),
            concurrent_requests: config.concurrent_requests(),
        }
    }
}

/// Layer and results log of a finished batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub layer: PointLayer,
    pub report: BatchReport,
}

#[derive(Debug)]
enum Answer {
    Places(Vec<Place>),
    Reverse(Coordinate, ReversePlace),
}

pub struct BatchGeocoder<G: ServiceClient> {
    client: Arc<G>,
    options: BatchOptions,
}

impl<G: ServiceClient + 'static> BatchGeocoder<G> {
    pub fn new(client: Arc<G>, options: BatchOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Rejects empty batches and batches above the configured maximum.
    pub fn check_batch(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(GeocodeError::NoAddresses);
        }
        if count > self.options.max_address {
            return Err(GeocodeError::BatchLimitExceeded {
                requested: count,
                limit: self.options.max_address,
            });
        }
        Ok(())
    }

    /// URL for one item, or the reason it cannot be sent.
    pub fn request_url(
        &self,
        kind: BatchKind,
        item: &BatchItem,
    ) -> std::result::Result<String, AddressFailure> {
        let opts = &self.options;
        match (&item.request, kind) {
            (GeocodeRequest::Forward(q), BatchKind::Forward)
                if query::address_params(q).is_empty() =>
            {
                Err(AddressFailure::InvalidInput("empty address".to_string()))
            }
            (GeocodeRequest::Forward(q), BatchKind::Forward) => Ok(query::search_url(
                &opts.search_url,
                q,
                opts.max_results,
                opts.detailed,
            )),
            (GeocodeRequest::Reverse(point), BatchKind::Reverse) => Ok(query::reverse_url(
                &opts.reverse_url,
                *point,
                opts.zoom,
                opts.detailed,
            )),
            (GeocodeRequest::Invalid(reason), _) => {
                Err(AddressFailure::InvalidInput(reason.clone()))
            }
            _ => Err(AddressFailure::InvalidInput(format!(
                "request does not belong in a {:?} batch",
                kind
            ))),
        }
    }

    pub async fn run(&self, kind: BatchKind, items: Vec<BatchItem>) -> Result<BatchOutcome> {
        self.check_batch(items.len())?;

        let schema = LayerSchema::for_batch(kind, self.options.detailed);
        let mut outcome = BatchOutcome {
            layer: PointLayer::new(
                self.options.layer_name.clone(),
                schema,
                self.options.show_labels,
            ),
            report: BatchReport::new(kind, items.len()),
        };

        tracing::info!(
            "🌍 Geocoding {} items ({:?}, {:?})",
            items.len(),
            kind,
            self.options.mode
        );

        match self.options.mode {
            ExecutionMode::Sequential => self.run_sequential(kind, items, &mut outcome).await?,
            ExecutionMode::Concurrent => self.run_concurrent(kind, items, &mut outcome).await?,
        }

        debug_assert!(outcome.report.stats.is_complete());
        tracing::info!(
            "✅ Batch done: {} processed, {} succeeded, {} failed, {} features",
            outcome.report.stats.processed(),
            outcome.report.stats.successes,
            outcome.report.stats.errors,
            outcome.layer.len()
        );
        Ok(outcome)
    }

    async fn run_sequential(
        &self,
        kind: BatchKind,
        items: Vec<BatchItem>,
        outcome: &mut BatchOutcome,
    ) -> Result<()> {
        let total = items.len();
        for item in items {
            let answer = match self.request_url(kind, &item) {
                Ok(url) => {
                    tracing::debug!("📡 Request {}/{}: {}", item.index + 1, total, url);
                    let body = self.client.fetch(&url).await;
                    interpret(&item.request, body)
                }
                Err(failure) => Err(failure),
            };
            apply(outcome, &item, answer)?;
        }
        Ok(())
    }

    async fn run_concurrent(
        &self,
        kind: BatchKind,
        items: Vec<BatchItem>,
        outcome: &mut BatchOutcome,
    ) -> Result<()> {
        let permits = Arc::new(Semaphore::new(self.options.concurrent_requests.max(1)));
        let mut pending: HashMap<usize, BatchItem> = HashMap::new();
        let mut tasks = JoinSet::new();
        let mut finished = Vec::with_capacity(items.len());

        for item in items {
            let url = match self.request_url(kind, &item) {
                Ok(url) => url,
                Err(failure) => {
                    finished.push((item, Err(failure)));
                    continue;
                }
            };
            if pending.contains_key(&item.index) {
                return Err(GeocodeError::ProcessingError {
                    message: format!("duplicate item index {}", item.index),
                });
            }

            let index = item.index;
            let client = Arc::clone(&self.client);
            let permits = Arc::clone(&permits);
            pending.insert(index, item);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                tracing::debug!("📡 Request for item {}: {}", index + 1, url);
                (index, client.fetch(&url).await)
            });
        }

        tracing::debug!("{} requests in flight", pending.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, body) = joined.map_err(|e| GeocodeError::ProcessingError {
                message: format!("request task failed: {}", e),
            })?;
            let Some(item) = pending.remove(&index) else {
                tracing::warn!("Reply for unknown item {}", index);
                continue;
            };
            let answer = interpret(&item.request, body);
            finished.push((item, answer));
            tracing::debug!("{} requests pending", pending.len());
        }

        // Every reply is accounted for; build the layer in input order.
        finished.sort_by_key(|(item, _)| item.index);
        for (item, answer) in finished {
            apply(outcome, &item, answer)?;
        }
        Ok(())
    }
}

fn interpret(
    request: &GeocodeRequest,
    body: std::result::Result<String, FetchError>,
) -> std::result::Result<Answer, AddressFailure> {
    let body = body.map_err(|e| match e {
        FetchError::Status(msg) => AddressFailure::Service(msg),
        FetchError::Transport(msg) => AddressFailure::Transport(msg),
    })?;
    match request {
        GeocodeRequest::Forward(_) => parse_search(&body).map(Answer::Places),
        GeocodeRequest::Reverse(point) => {
            parse_reverse(&body).map(|place| Answer::Reverse(*point, place))
        }
        GeocodeRequest::Invalid(reason) => Err(AddressFailure::InvalidInput(reason.clone())),
    }
}

fn apply(
    outcome: &mut BatchOutcome,
    item: &BatchItem,
    answer: std::result::Result<Answer, AddressFailure>,
) -> Result<()> {
    match answer {
        Ok(Answer::Places(places)) => {
            for place in &places {
                outcome.layer.add_place(place, &item.source)?;
            }
            outcome.report.record_success();
        }
        Ok(Answer::Reverse(point, place)) => {
            outcome.layer.add_reverse(point, &place)?;
            outcome.report.record_success();
        }
        Err(failure) => outcome
            .report
            .record_failure(item.index, &item.source, failure),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AddressQuery, StructuredAddress};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers by substring of the URL; unknown URLs get an empty list.
    struct MockClient {
        answers: Vec<(&'static str, std::result::Result<&'static str, FetchError>)>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockClient {
        fn new(
            answers: Vec<(&'static str, std::result::Result<&'static str, FetchError>)>,
        ) -> Self {
            Self {
                answers,
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ServiceClient for MockClient {
        async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.answers
                .iter()
                .find(|(needle, _)| url.contains(needle))
                .map(|(_, answer)| answer.clone().map(str::to_string))
                .unwrap_or_else(|| Ok("[]".to_string()))
        }
    }

    fn options(mode: ExecutionMode) -> BatchOptions {
        BatchOptions {
            search_url: "http://geo/search".to_string(),
            reverse_url: "http://geo/reverse".to_string(),
            max_address: 10,
            max_results: 1,
            zoom: 18,
            detailed: false,
            show_labels: false,
            layer_name: "test".to_string(),
            mode,
            concurrent_requests: 2,
        }
    }

    fn forward(index: usize, text: &str) -> BatchItem {
        BatchItem {
            index,
            source: text.to_string(),
            request: GeocodeRequest::Forward(AddressQuery::FullText(text.to_string())),
        }
    }

    fn answers() -> Vec<(&'static str, std::result::Result<&'static str, FetchError>)> {
        vec![
            ("q=Paris", Ok(r#"[{"lat": "48.85", "lon": "2.35", "display_name": "Paris"}]"#)),
            (
                "q=Berlin",
                Ok(r#"[{"lat": "52.52", "lon": "13.40", "display_name": "Berlin"},
                       {"lat": "44.47", "lon": "-71.18", "display_name": "Berlin, NH"}]"#),
            ),
            ("q=Broken", Ok(r#"[{"display_name": "no coordinates"}]"#)),
            ("q=Down", Err(FetchError::Transport("connection refused".to_string()))),
        ]
    }

    fn items() -> Vec<BatchItem> {
        vec![
            forward(0, "Paris"),
            forward(1, "Atlantis"),
            forward(2, "Berlin"),
            forward(3, "Broken"),
            forward(4, "Down"),
        ]
    }

    fn assert_outcome(outcome: &BatchOutcome) {
        let stats = outcome.report.stats;
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.processed(), stats.successes + stats.errors);
        assert_eq!(stats.processed(), 5);

        let features = outcome.layer.features();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].point, Coordinate::new(2.35, 48.85));
        assert_eq!(features[0].attributes, vec!["Paris"]);
        assert_eq!(features[1].attributes, vec!["Berlin"]);
        assert_eq!(features[2].attributes, vec!["Berlin, NH"]);

        let failures: Vec<_> = outcome
            .report
            .errors
            .iter()
            .map(|e| (e.source.as_str(), e.failure.clone()))
            .collect();
        assert!(failures.contains(&("Atlantis", AddressFailure::NoResults)));
        assert!(failures.contains(&("Broken", AddressFailure::MissingCoordinates)));
        assert!(failures.contains(&(
            "Down",
            AddressFailure::Transport("connection refused".to_string())
        )));
    }

    #[tokio::test]
    async fn test_sequential_batch() {
        let client = Arc::new(MockClient::new(answers()));
        let geocoder = BatchGeocoder::new(client.clone(), options(ExecutionMode::Sequential));

        let outcome = geocoder.run(BatchKind::Forward, items()).await.unwrap();

        assert_outcome(&outcome);
        assert_eq!(client.calls.lock().unwrap().len(), 5);
        assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_batch_matches_sequential() {
        let client = Arc::new(MockClient::new(answers()));
        let geocoder = BatchGeocoder::new(client.clone(), options(ExecutionMode::Concurrent));

        let outcome = geocoder.run(BatchKind::Forward, items()).await.unwrap();

        assert_outcome(&outcome);
        assert!(client.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_guard_rejects_oversized_batch() {
        let client = Arc::new(MockClient::new(vec![]));
        let mut opts = options(ExecutionMode::Sequential);
        opts.max_address = 2;
        let geocoder = BatchGeocoder::new(client.clone(), opts);

        let err = geocoder
            .run(BatchKind::Forward, items())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GeocodeError::BatchLimitExceeded {
                requested: 5,
                limit: 2
            }
        ));
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guard_rejects_empty_batch() {
        let geocoder = BatchGeocoder::new(
            Arc::new(MockClient::new(vec![])),
            options(ExecutionMode::Concurrent),
        );
        let err = geocoder.run(BatchKind::Forward, vec![]).await.unwrap_err();
        assert!(matches!(err, GeocodeError::NoAddresses));
    }

    #[tokio::test]
    async fn test_reverse_batch_keeps_input_point() {
        let client = Arc::new(MockClient::new(vec![(
            "lat=48.8584",
            Ok(r#"{"display_name": "Tour Eiffel", "lat": "48.8582", "lon": "2.2944"}"#),
        )]));
        let geocoder = BatchGeocoder::new(client.clone(), options(ExecutionMode::Concurrent));
        let items = vec![
            BatchItem {
                index: 0,
                source: "48.8584,2.2945".to_string(),
                request: GeocodeRequest::Reverse(Coordinate::new(2.2945, 48.8584)),
            },
            BatchItem {
                index: 1,
                source: "abc,1".to_string(),
                request: GeocodeRequest::Invalid("latitude is not a number".to_string()),
            },
        ];

        let outcome = geocoder.run(BatchKind::Reverse, items).await.unwrap();

        assert_eq!(outcome.report.stats.successes, 1);
        assert_eq!(outcome.report.stats.errors, 1);
        assert_eq!(outcome.layer.len(), 1);
        assert_eq!(
            outcome.layer.features()[0].point,
            Coordinate::new(2.2945, 48.8584)
        );
        // The invalid row never reaches the service.
        assert_eq!(client.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_service_status_is_per_address_failure() {
        let client = Arc::new(MockClient::new(vec![(
            "q=Paris",
            Err(FetchError::Status("HTTP 503 Service Unavailable".to_string())),
        )]));
        let geocoder = BatchGeocoder::new(client, options(ExecutionMode::Sequential));

        let outcome = geocoder
            .run(BatchKind::Forward, vec![forward(0, "Paris")])
            .await
            .unwrap();

        assert_eq!(outcome.report.stats.errors, 1);
        assert_eq!(
            outcome.report.errors[0].failure,
            AddressFailure::Service("HTTP 503 Service Unavailable".to_string())
        );
        assert!(outcome.layer.is_empty());
    }

    #[tokio::test]
    async fn test_empty_address_never_reaches_service() {
        let client = Arc::new(MockClient::new(vec![]));
        let geocoder = BatchGeocoder::new(client.clone(), options(ExecutionMode::Concurrent));
        let items = vec![
            BatchItem {
                index: 0,
                source: "7,,".to_string(),
                request: GeocodeRequest::Forward(AddressQuery::Structured(
                    StructuredAddress::default(),
                )),
            },
            BatchItem {
                index: 1,
                source: "8,  ,".to_string(),
                request: GeocodeRequest::Forward(AddressQuery::FreeForm(StructuredAddress {
                    street: Some("  ".to_string()),
                    ..Default::default()
                })),
            },
        ];

        let outcome = geocoder.run(BatchKind::Forward, items).await.unwrap();

        assert_eq!(outcome.report.stats.errors, 2);
        assert_eq!(
            outcome.report.errors[0].failure,
            AddressFailure::InvalidInput("empty address".to_string())
        );
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_url_rejects_wrong_kind() {
        let geocoder = BatchGeocoder::new(
            Arc::new(MockClient::new(vec![])),
            options(ExecutionMode::Sequential),
        );
        let item = forward(0, "Paris");
        assert!(geocoder.request_url(BatchKind::Reverse, &item).is_err());
        assert_eq!(
            geocoder.request_url(BatchKind::Forward, &item).unwrap(),
            "http://geo/search?q=Paris&format=json&limit=1&polygon=0&addressdetails=0"
        );
    }
}
