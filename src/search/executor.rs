//! Search execution and orchestration

use super::builder::QueryBuilder;
use super::error::SearchError;
use super::options::{EagerLoad, SearchOptions};
use crate::backend::{Backend, MatchSet, Row, TextMatchQuery};
use crate::config::SearchSettings;
use crate::metrics::Metrics;
use crate::models::{SearchableType, TypeRegistry};
use crate::query::{MatchMode, QuerySanitizer};
use crate::results::{ResultContainer, ScoredRecord, SearchResult, Timing};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fulltext search across every registered type
pub struct Searchable<R> {
    backend: Arc<dyn Backend>,
    registry: Arc<TypeRegistry<R>>,
    sanitizer: QuerySanitizer,
    mode: MatchMode,
    per_page: u64,
    metrics: Option<Arc<Metrics>>,
}

impl<R> Searchable<R> {
    /// Create a search service with an empty registry
    pub fn new(backend: Arc<dyn Backend>, settings: &SearchSettings) -> Self {
        Self {
            backend,
            registry: Arc::new(TypeRegistry::new()),
            sanitizer: QuerySanitizer::new(settings),
            mode: MatchMode::from_settings(settings),
            per_page: settings.per_page.max(1),
            metrics: None,
        }
    }

    /// Use a registry shared with other services
    pub fn with_registry(mut self, registry: Arc<TypeRegistry<R>>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry<R>> {
        &self.registry
    }

    /// Replace the registered types
    pub fn register_types(&self, types: Vec<SearchableType<R>>) {
        self.registry.register(types);
    }

    pub fn list_types(&self) -> Vec<Arc<SearchableType<R>>> {
        self.registry.list()
    }

    pub fn default_per_page(&self) -> u64 {
        self.per_page
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Start a search with an ad-hoc filter for every type
    pub fn with_filter<F>(&self, filter: F) -> PendingSearch<'_, R>
    where
        F: Fn(TextMatchQuery) -> Option<TextMatchQuery> + Send + Sync + 'static,
    {
        PendingSearch::new(self).with_filter(filter)
    }

    /// Start a search that skips every predefined filter
    pub fn without_filters(&self) -> PendingSearch<'_, R> {
        PendingSearch::new(self).without_filters()
    }

    /// Start a search that skips the predefined filters of the named types
    pub fn without_filters_for<I, S>(&self, names: I) -> PendingSearch<'_, R>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PendingSearch::new(self).without_filters_for(names)
    }

    /// Start a search that eager loads relations of one type
    pub fn with_eager_load(&self, type_name: impl Into<String>, load: EagerLoad) -> PendingSearch<'_, R> {
        PendingSearch::new(self).with_eager_load(type_name, load)
    }

    /// Search every registered type.
    ///
    /// `per_page` falls back to the configured default. Pages are 1-indexed.
    pub async fn search(
        &self,
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        self.search_with(&SearchOptions::default(), query, per_page, page)
            .await
    }

    pub async fn search_with(
        &self,
        options: &SearchOptions,
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        let types = self.registry.list();
        self.run(&types, options, query, per_page, page).await
    }

    /// Search a chosen subset of types. The registry is not consulted.
    ///
    /// Several types are merged and capped like a full search; a single type
    /// is paginated by the backend.
    pub async fn search_types(
        &self,
        types: &[Arc<SearchableType<R>>],
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        self.search_types_with(&SearchOptions::default(), types, query, per_page, page)
            .await
    }

    pub async fn search_types_with(
        &self,
        options: &SearchOptions,
        types: &[Arc<SearchableType<R>>],
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        self.run(types, options, query, per_page, page).await
    }

    /// Search one type only
    pub async fn search_single(
        &self,
        searchable: &Arc<SearchableType<R>>,
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        self.search_single_with(&SearchOptions::default(), searchable, query, per_page, page)
            .await
    }

    pub async fn search_single_with(
        &self,
        options: &SearchOptions,
        searchable: &Arc<SearchableType<R>>,
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        let types = [Arc::clone(searchable)];
        self.run(&types, options, query, per_page, page).await
    }

    /// Look up registered types by name, keeping the order given
    pub fn resolve_types<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Arc<SearchableType<R>>>, SearchError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.registry
                    .get(name)
                    .ok_or_else(|| SearchError::UnknownType(name.to_string()))
            })
            .collect()
    }

    /// Search registered types by name
    pub async fn search_named<S: AsRef<str>>(
        &self,
        names: &[S],
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        let types = self.resolve_types(names)?;
        self.search_types(&types, query, per_page, page).await
    }

    async fn run(
        &self,
        types: &[Arc<SearchableType<R>>],
        options: &SearchOptions,
        raw: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        let per_page = per_page.unwrap_or(self.per_page);
        if per_page == 0 || page == 0 {
            return Err(SearchError::InvalidPage { per_page, page });
        }

        let clean = match self.sanitizer.prepare(raw) {
            Ok(clean) => clean,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected();
                }
                debug!("Rejected search '{}': {}", raw, e);
                return Err(e);
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_search();
        }

        let term = self.sanitizer.match_term(&clean);
        let builder = QueryBuilder::new(&term, self.mode, per_page, page, types.len(), options);

        let mut requests = Vec::with_capacity(types.len());
        for (index, searchable) in types.iter().enumerate() {
            match builder.build(searchable)? {
                Some(query) => requests.push((index, searchable, query)),
                None => debug!("Type {} excluded by its filter", searchable.name()),
            }
        }

        info!(
            "Executing search '{}' on {} of {} types",
            term,
            requests.len(),
            types.len()
        );

        if types.len() == 1 {
            let Some((index, searchable, query)) = requests.pop() else {
                return Ok(SearchResult::empty(per_page, page));
            };

            let query = query.paginate(per_page, page);
            let (set, timing) = self.fetch(searchable, &query).await?;
            let items = set
                .rows
                .into_iter()
                .map(|row| hydrate(searchable, index, row))
                .collect::<Result<Vec<_>, _>>()?;

            return Ok(SearchResult::new(items, set.total, per_page, page).with_timings(vec![timing]));
        }

        let fetched = try_join_all(requests.iter().map(|(index, searchable, query)| async move {
            let (set, timing) = self.fetch(searchable, query).await?;
            Ok::<_, SearchError>((*index, set, timing))
        }))
        .await?;

        let mut container = ResultContainer::new();
        for (index, set, timing) in fetched {
            container.add_match_set(index, set);
            container.add_timing(timing);
        }

        let total = container.total();
        let timings = container.timings().to_vec();
        let items = container
            .into_page(per_page, page)
            .into_iter()
            .map(|candidate| hydrate(&types[candidate.source], candidate.source, candidate.row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchResult::new(items, total, per_page, page).with_timings(timings))
    }

    /// Run one type's query against the backend
    async fn fetch(
        &self,
        searchable: &SearchableType<R>,
        query: &TextMatchQuery,
    ) -> Result<(MatchSet, Timing), SearchError> {
        let type_name = searchable.name();
        let start = Instant::now();

        debug!(
            "Fetching {} from {} backend (limit {:?}, offset {:?})",
            type_name,
            self.backend.name(),
            query.limit,
            query.offset
        );

        match self.backend.execute(query).await {
            Ok(set) => {
                let elapsed = start.elapsed();
                if let Some(metrics) = &self.metrics {
                    metrics.record_fetch(type_name, elapsed, set.len());
                }
                debug!(
                    "Type {} returned {} of {} matches in {:?}",
                    type_name,
                    set.len(),
                    set.total,
                    elapsed
                );

                let timing = Timing {
                    source: type_name.to_string(),
                    time_ms: elapsed.as_millis() as u64,
                    result_count: set.len(),
                };
                Ok((set, timing))
            }
            Err(source) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_error(type_name);
                }
                warn!("Search failed for type {}: {}", type_name, source);
                Err(SearchError::Backend {
                    type_name: type_name.to_string(),
                    source,
                })
            }
        }
    }
}

fn hydrate<R>(
    searchable: &SearchableType<R>,
    index: usize,
    row: Row,
) -> Result<ScoredRecord<R>, SearchError> {
    let record = searchable
        .decode(&row)
        .map_err(|source| SearchError::Decode {
            type_name: searchable.name().to_string(),
            source,
        })?;

    Ok(ScoredRecord {
        record,
        score: row.score,
        source: searchable.name().to_string(),
        source_index: index,
        relations: row.relation_names(),
    })
}

/// A search call with options attached, consumed by running it
pub struct PendingSearch<'a, R> {
    searchable: &'a Searchable<R>,
    options: SearchOptions,
}

impl<'a, R> PendingSearch<'a, R> {
    fn new(searchable: &'a Searchable<R>) -> Self {
        Self {
            searchable,
            options: SearchOptions::default(),
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(TextMatchQuery) -> Option<TextMatchQuery> + Send + Sync + 'static,
    {
        self.options = self.options.with_filter(filter);
        self
    }

    pub fn without_filters(mut self) -> Self {
        self.options = self.options.without_filters();
        self
    }

    pub fn without_filters_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.without_filters_for(names);
        self
    }

    pub fn with_eager_load(mut self, type_name: impl Into<String>, load: EagerLoad) -> Self {
        self.options = self.options.with_eager_load(type_name, load);
        self
    }

    pub async fn search(
        self,
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        self.searchable
            .search_with(&self.options, query, per_page, page)
            .await
    }

    pub async fn search_single(
        self,
        searchable: &Arc<SearchableType<R>>,
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        self.searchable
            .search_single_with(&self.options, searchable, query, per_page, page)
            .await
    }

    pub async fn search_types(
        self,
        types: &[Arc<SearchableType<R>>],
        query: &str,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<SearchResult<R>, SearchError> {
        self.searchable
            .search_types_with(&self.options, types, query, per_page, page)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, Comparison, Condition, Constrained};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns fixed scores per collection and records what it was asked
    #[derive(Default)]
    struct StubBackend {
        scores: HashMap<String, Vec<f64>>,
        delays: HashMap<String, u64>,
        failing: Option<String>,
        queries: Mutex<Vec<TextMatchQuery>>,
        calls: AtomicUsize,
    }

    impl StubBackend {
        fn with_scores(mut self, collection: &str, scores: &[f64]) -> Self {
            self.scores.insert(collection.to_string(), scores.to_vec());
            self
        }

        fn with_delay(mut self, collection: &str, ms: u64) -> Self {
            self.delays.insert(collection.to_string(), ms);
            self
        }

        fn failing(mut self, collection: &str) -> Self {
            self.failing = Some(collection.to_string());
            self
        }

        fn queries(&self) -> Vec<TextMatchQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        async fn execute(&self, query: &TextMatchQuery) -> Result<MatchSet, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());

            if let Some(ms) = self.delays.get(&query.collection) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.failing.as_deref() == Some(query.collection.as_str()) {
                return Err(BackendError::InvalidQuery("boom".to_string()));
            }

            let scores = self.scores.get(&query.collection).cloned().unwrap_or_default();
            let offset = query.offset.unwrap_or(0) as usize;
            let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
            let rows = scores
                .iter()
                .enumerate()
                .skip(offset)
                .take(limit)
                .map(|(i, score)| {
                    let columns = json!({"id": i, "from": query.collection});
                    Row::new(columns.as_object().unwrap().clone(), *score)
                })
                .collect();

            Ok(MatchSet {
                rows,
                total: scores.len() as u64,
            })
        }
    }

    fn searchable(name: &str) -> SearchableType<Value> {
        SearchableType::deserialized(name, format!("{}s", name), vec!["title".into()])
    }

    fn published_only() -> Vec<Condition> {
        vec![Condition::NotNull("published_at".into())]
    }

    /// A type whose predefined filter hides unpublished rows
    fn published(name: &str) -> SearchableType<Value> {
        searchable(name).with_filter(|query| Some(query.where_not_null("published_at")))
    }

    fn service(backend: Arc<StubBackend>, names: &[&str]) -> Searchable<Value> {
        let service = Searchable::new(backend, &SearchSettings::default());
        service.register_types(names.iter().map(|n| searchable(n)).collect());
        service
    }

    fn scores(result: &SearchResult<Value>) -> Vec<f64> {
        result.iter().map(|item| item.score).collect()
    }

    #[tokio::test]
    async fn test_merges_by_score() {
        let backend = Arc::new(
            StubBackend::default()
                .with_scores("posts", &[5.0, 3.0, 1.0])
                .with_scores("articles", &[4.0, 2.0]),
        );
        let service = service(backend, &["post", "article"]);

        let result = service.search("lorem", None, 1).await.unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(scores(&result), vec![5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(result.items[1].source, "article");
        assert_eq!(result.timings.len(), 2);
    }

    #[tokio::test]
    async fn test_tie_order_ignores_completion_order() {
        let backend = Arc::new(
            StubBackend::default()
                .with_scores("posts", &[2.0])
                .with_scores("articles", &[2.0])
                .with_delay("posts", 30),
        );
        let service = service(backend, &["post", "article"]);

        let result = service.search("lorem", None, 1).await.unwrap();
        let sources: Vec<&str> = result.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["post", "article"]);
    }

    #[tokio::test]
    async fn test_page_slicing() {
        let backend = Arc::new(
            StubBackend::default()
                .with_scores("posts", &[7.0, 5.0, 3.0, 1.0])
                .with_scores("articles", &[6.0, 4.0, 2.0]),
        );
        let service = service(backend, &["post", "article"]);

        let result = service.search("lorem", Some(3), 2).await.unwrap();
        assert_eq!(result.total, 7);
        assert_eq!(scores(&result), vec![4.0, 3.0, 2.0]);
        assert_eq!(result.last_page(), 3);
    }

    #[tokio::test]
    async fn test_candidate_cap() {
        let backend = Arc::new(StubBackend::default());
        let service = service(Arc::clone(&backend), &["post", "article", "video"]);

        service.search("lorem", Some(5), 2).await.unwrap();
        for query in backend.queries() {
            assert_eq!(query.limit, Some(30));
            assert_eq!(query.offset, None);
        }
    }

    #[tokio::test]
    async fn test_single_type_paginates_in_backend() {
        let backend = Arc::new(StubBackend::default().with_scores("posts", &[5.0, 4.0, 3.0, 2.0, 1.0]));
        let service = service(Arc::clone(&backend), &["post"]);

        let result = service.search("lorem", Some(2), 2).await.unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(scores(&result), vec![3.0, 2.0]);

        let queries = backend.queries();
        assert_eq!(queries[0].limit, Some(2));
        assert_eq!(queries[0].offset, Some(2));
    }

    #[tokio::test]
    async fn test_too_short_makes_no_calls() {
        let backend = Arc::new(StubBackend::default().with_scores("posts", &[1.0]));
        let metrics = Arc::new(Metrics::new());
        let service = service(Arc::clone(&backend), &["post", "article"]).with_metrics(Arc::clone(&metrics));

        let err = service.search("  a()  ", None, 1).await.unwrap_err();
        assert!(matches!(err, SearchError::QueryTooShort { min: 3, actual: 1 }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(metrics.get_rejected_searches(), 1);
        assert_eq!(metrics.get_total_searches(), 0);
    }

    #[tokio::test]
    async fn test_invalid_page() {
        let backend = Arc::new(StubBackend::default());
        let service = service(backend, &["post"]);

        assert!(matches!(
            service.search("lorem", Some(0), 1).await,
            Err(SearchError::InvalidPage { per_page: 0, page: 1 })
        ));
        assert!(matches!(
            service.search("lorem", None, 0).await,
            Err(SearchError::InvalidPage { page: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_aborts() {
        let backend = Arc::new(
            StubBackend::default()
                .with_scores("posts", &[1.0])
                .failing("articles"),
        );
        let metrics = Arc::new(Metrics::new());
        let service = service(backend, &["post", "article"]).with_metrics(Arc::clone(&metrics));

        let err = service.search("lorem", None, 1).await.unwrap_err();
        assert!(matches!(err, SearchError::Backend { ref type_name, .. } if type_name == "article"));
        assert_eq!(metrics.get_type_stats()["article"].errors, 1);
    }

    #[tokio::test]
    async fn test_search_single_leaves_registry_alone() {
        let backend = Arc::new(
            StubBackend::default()
                .with_scores("posts", &[3.0])
                .with_scores("videos", &[9.0]),
        );
        let service = service(backend, &["post", "article"]);
        let video = Arc::new(searchable("video"));

        let result = service.search_single(&video, "lorem", None, 1).await.unwrap();
        assert_eq!(scores(&result), vec![9.0]);
        assert!(result.iter().all(|item| item.source == "video"));
        assert_eq!(service.registry().names(), vec!["post", "article"]);
    }

    #[tokio::test]
    async fn test_search_named() {
        let backend = Arc::new(StubBackend::default().with_scores("articles", &[2.0, 1.0]));
        let service = service(backend, &["post", "article"]);

        let result = service.search_named(&["article"], "lorem", None, 1).await.unwrap();
        assert_eq!(result.total, 2);

        let err = service
            .search_named(&["article", "video"], "lorem", None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::UnknownType(ref name) if name == "video"));
    }

    #[tokio::test]
    async fn test_search_types_merges_a_subset() {
        let backend = Arc::new(
            StubBackend::default()
                .with_scores("posts", &[5.0, 3.0, 1.0])
                .with_scores("articles", &[9.0])
                .with_scores("videos", &[4.0, 2.0]),
        );
        let service = service(Arc::clone(&backend), &["post", "article", "video"]);
        let subset = service.resolve_types(&["post", "video"]).unwrap();

        let result = service.search_types(&subset, "lorem", Some(2), 1).await.unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(scores(&result), vec![5.0, 4.0]);
        assert!(result.iter().all(|item| item.source != "article"));

        let queries = backend.queries();
        let collections: Vec<&str> = queries.iter().map(|q| q.collection.as_str()).collect();
        assert_eq!(collections.len(), 2);
        assert!(!collections.contains(&"articles"));
        // Two types, two per page, first page
        assert!(queries.iter().all(|q| q.limit == Some(4) && q.offset.is_none()));
        assert_eq!(service.registry().names(), vec!["post", "article", "video"]);
    }

    #[tokio::test]
    async fn test_pending_search_over_a_subset() {
        let backend = Arc::new(StubBackend::default());
        let service = Searchable::new(Arc::clone(&backend) as Arc<dyn Backend>, &SearchSettings::default());
        service.register_types(vec![published("post"), published("video"), searchable("article")]);
        let subset = service.resolve_types(&["post", "video"]).unwrap();

        service
            .without_filters_for(["video"])
            .search_types(&subset, "lorem", None, 1)
            .await
            .unwrap();

        let queries = backend.queries();
        assert_eq!(queries.len(), 2);
        for query in queries {
            match query.collection.as_str() {
                "posts" => assert_eq!(query.conditions, published_only()),
                "videos" => assert!(query.conditions.is_empty()),
                other => panic!("unexpected collection {}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_filter_excluding_every_type() {
        let backend = Arc::new(StubBackend::default().with_scores("posts", &[1.0]));
        let service = service(Arc::clone(&backend), &["post", "article"]);

        let result = service.with_filter(|_| None).search("lorem", None, 1).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_options_do_not_leak() {
        let backend = Arc::new(StubBackend::default());
        let service = service(Arc::clone(&backend), &["post", "article"]);

        service
            .with_filter(|query| Some(query.where_gt("id", 1)))
            .search("lorem", None, 1)
            .await
            .unwrap();
        service.search("lorem", None, 1).await.unwrap();

        let queries = backend.queries();
        assert_eq!(queries.len(), 4);
        assert!(queries[..2].iter().all(|q| q.conditions == adhoc_only()));
        assert!(queries[2..].iter().all(|q| q.conditions.is_empty()));
    }

    fn adhoc_only() -> Vec<Condition> {
        vec![Condition::Compare {
            column: "id".into(),
            op: Comparison::Gt,
            value: json!(1),
        }]
    }

    #[tokio::test]
    async fn test_options_reset_after_rejected_query() {
        let backend = Arc::new(StubBackend::default());
        let service = Searchable::new(Arc::clone(&backend) as Arc<dyn Backend>, &SearchSettings::default());
        service.register_types(vec![published("post"), searchable("article")]);

        let err = service
            .with_filter(|query| Some(query.where_gt("id", 1)))
            .without_filters()
            .search("x", None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::QueryTooShort { .. }));
        assert!(backend.queries().is_empty());

        service.search("lorem", None, 1).await.unwrap();

        let queries = backend.queries();
        assert_eq!(queries.len(), 2);
        for query in queries {
            match query.collection.as_str() {
                "posts" => assert_eq!(query.conditions, published_only()),
                _ => assert!(query.conditions.is_empty()),
            }
        }
    }

    #[tokio::test]
    async fn test_options_reset_after_backend_failure() {
        let backend = Arc::new(StubBackend::default().failing("articles"));
        let service = Searchable::new(Arc::clone(&backend) as Arc<dyn Backend>, &SearchSettings::default());
        service.register_types(vec![published("post"), searchable("article")]);

        let err = service
            .with_filter(|query| Some(query.where_gt("id", 1)))
            .without_filters()
            .search("lorem", None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Backend { .. }));

        let queries = backend.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| q.conditions == adhoc_only()));

        let post = service.resolve_types(&["post"]).unwrap();
        service.search_types(&post, "lorem", None, 1).await.unwrap();

        let queries = backend.queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2].conditions, published_only());
    }

    #[tokio::test]
    async fn test_term_gets_wildcards() {
        let backend = Arc::new(StubBackend::default());
        let service = service(Arc::clone(&backend), &["post"]);

        service.search("  Lorem   ipsum ", None, 1).await.unwrap();
        assert_eq!(backend.queries()[0].term, "*Lorem ipsum*");
    }
}
