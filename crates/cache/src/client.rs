use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;

use shelf_http::{ApiResult, FetchError, Transport};
use shelf_kernel::settings::CacheSettings;
use shelf_kernel::{Endpoint, RequestSpec, Tag};

use crate::key::QueryKey;
use crate::snapshot::{decode, QuerySnapshot, QueryStatus};
use crate::store::{CacheStore, Eviction, Fetch, IssueMode};
use crate::subscription::Subscription;

/// Runs endpoints against a transport and keeps query results in a shared store.
///
/// Clones share the same store. Fetches run on spawned tasks, so a caller that
/// stops waiting does not cancel the request.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Shared>,
}

struct Shared {
    store: Mutex<CacheStore>,
    transport: Arc<dyn Transport>,
    keep_unused: Duration,
}

impl QueryClient {
    pub fn new(transport: Arc<dyn Transport>, settings: &CacheSettings) -> Self {
        Self::with_keep_unused(transport, settings.keep_unused())
    }

    pub fn with_keep_unused(transport: Arc<dyn Transport>, keep_unused: Duration) -> Self {
        Self {
            inner: Arc::new(Shared {
                store: Mutex::new(CacheStore::new()),
                transport,
                keep_unused,
            }),
        }
    }

    /// Cached result if fulfilled, otherwise fetch (or join the fetch in flight).
    pub async fn query<E: Endpoint>(&self, arg: &E::Arg) -> ApiResult<E::Output> {
        self.run_query::<E>(arg, IssueMode::CacheFirst).await
    }

    /// Fetch again even if fulfilled data is cached.
    pub async fn refetch<E: Endpoint>(&self, arg: &E::Arg) -> ApiResult<E::Output> {
        self.run_query::<E>(arg, IssueMode::Refetch).await
    }

    /// Keep an entry alive and observe its updates until the handle is dropped.
    pub fn subscribe<E: Endpoint>(&self, arg: &E::Arg) -> ApiResult<Subscription<E>> {
        let (key, receiver) = self.attach::<E>(arg, IssueMode::CacheFirst)?;
        let guard = SubscriberGuard {
            client: self.clone(),
            key: key.clone(),
        };
        Ok(Subscription::new(key, receiver, guard))
    }

    /// Run a write. Tags are invalidated whenever the server answered.
    pub async fn mutate<E: Endpoint>(&self, arg: &E::Arg) -> ApiResult<E::Output> {
        let descriptor = E::DESCRIPTOR;
        let request = E::request(arg)?;

        tracing::debug!(endpoint = descriptor.name, path = %request.path(), "running mutation");
        let result = self.inner.transport.execute(&request).await;

        let answered = match &result {
            Ok(_) => true,
            Err(err) => err.server_responded(),
        };
        if answered && !descriptor.invalidates.is_empty() {
            self.invalidate(descriptor.invalidates);
        }

        decode(&result?)
    }

    /// Refetch every cached query providing one of `tags`. Returns the number refetched.
    pub fn invalidate(&self, tags: &[Tag]) -> usize {
        let fetches = self.lock().invalidate(tags);
        let count = fetches.len();

        tracing::debug!(tags = ?tags, refetching = count, "tags invalidated");
        for fetch in fetches {
            self.spawn_fetch(fetch);
        }
        count
    }

    /// Current state of a query without issuing a request.
    pub fn snapshot<E: Endpoint>(&self, arg: &E::Arg) -> Option<QuerySnapshot> {
        let key = QueryKey::new(E::DESCRIPTOR.name, arg).ok()?;
        self.lock().snapshot(&key)
    }

    pub fn cached_entries(&self) -> usize {
        self.lock().len()
    }

    /// Forget every cached query.
    pub fn reset(&self) {
        self.lock().reset();
        tracing::info!("query cache reset");
    }

    async fn run_query<E: Endpoint>(&self, arg: &E::Arg, mode: IssueMode) -> ApiResult<E::Output> {
        let (key, mut receiver) = self.attach::<E>(arg, mode)?;
        // Held while waiting so the entry cannot be evicted under us.
        let _guard = SubscriberGuard {
            client: self.clone(),
            key,
        };

        let snapshot = settle(&mut receiver).await?;
        snapshot.outcome()
    }

    fn attach<E: Endpoint>(
        &self,
        arg: &E::Arg,
        mode: IssueMode,
    ) -> ApiResult<(QueryKey, watch::Receiver<QuerySnapshot>)> {
        let descriptor = E::DESCRIPTOR;
        let key = QueryKey::new(descriptor.name, arg).map_err(|err| {
            FetchError::custom(format!("cannot key query {}: {err}", descriptor.name))
        })?;
        let request: RequestSpec = E::request(arg)?;

        let issued = {
            let mut store = self.lock();
            let issued = store.issue(&key, &request, descriptor.provides, mode);
            store.add_subscriber(&key);
            issued
        };

        if let Some(fetch) = issued.fetch {
            self.spawn_fetch(fetch);
        }

        Ok((key, issued.receiver))
    }

    fn spawn_fetch(&self, fetch: Fetch) {
        match Handle::try_current() {
            Ok(handle) => {
                let client = self.clone();
                handle.spawn(async move { client.run_fetch(fetch).await });
            }
            Err(_) => {
                let error = FetchError::custom("no async runtime available to run the request");
                self.lock().resolve(&fetch.key, fetch.request_id, Err(error));
            }
        }
    }

    async fn run_fetch(self, fetch: Fetch) {
        let result: ApiResult<Value> = self.inner.transport.execute(&fetch.request).await;

        if let Err(err) = &result {
            tracing::warn!(query = %fetch.key, status = %err.status, error = %err.message, "query failed");
        }

        self.lock().resolve(&fetch.key, fetch.request_id, result);
    }

    fn release(&self, key: &QueryKey) {
        let Some(generation) = self.lock().remove_subscriber(key) else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            return;
        };

        let client = self.clone();
        let key = key.clone();
        let delay = self.inner.keep_unused;
        handle.spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                match client.lock().evict_if_idle(&key, generation) {
                    Eviction::Evicted => {
                        tracing::debug!(query = %key, "unused query evicted");
                        break;
                    }
                    Eviction::Retained => break,
                    Eviction::InFlight => continue,
                }
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        self.inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts as a subscriber until dropped.
pub(crate) struct SubscriberGuard {
    client: QueryClient,
    key: QueryKey,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.client.release(&self.key);
    }
}

/// Wait until the entry leaves `Pending`.
pub(crate) async fn settle(
    receiver: &mut watch::Receiver<QuerySnapshot>,
) -> ApiResult<QuerySnapshot> {
    receiver
        .wait_for(|snapshot| snapshot.status != QueryStatus::Pending)
        .await
        .map(|snapshot| snapshot.clone())
        .map_err(|_| FetchError::custom("cache entry dropped before the query settled"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use shelf_kernel::{EndpointDescriptor, EndpointKind, Method};
    use tokio::sync::Semaphore;

    const ITEMS: Tag = Tag::new("items");

    struct ListItems;

    impl Endpoint for ListItems {
        type Arg = ();
        type Output = Vec<String>;

        const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
            name: "listItems",
            kind: EndpointKind::Query,
            method: Method::Get,
            path: "/items",
            body: None,
            provides: &[ITEMS],
            invalidates: &[],
        };
    }

    struct TouchItems;

    impl Endpoint for TouchItems {
        type Arg = ();
        type Output = Value;

        const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
            name: "touchItems",
            kind: EndpointKind::Mutation,
            method: Method::Post,
            path: "/touch",
            body: None,
            provides: &[],
            invalidates: &[ITEMS],
        };
    }

    type Handler = Box<dyn Fn(&RequestSpec, usize) -> ApiResult<Value> + Send + Sync>;

    /// Transport whose calls can be held until the test releases them.
    struct ScriptedTransport {
        calls: AtomicUsize,
        gated: bool,
        gates: Mutex<HashMap<usize, Arc<Semaphore>>>,
        handler: Handler,
    }

    impl ScriptedTransport {
        fn new(gated: bool, handler: Handler) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gated,
                gates: Mutex::new(HashMap::new()),
                handler,
            })
        }

        fn gate(&self, call: usize) -> Arc<Semaphore> {
            self.gates
                .lock()
                .unwrap()
                .entry(call)
                .or_insert_with(|| Arc::new(Semaphore::new(0)))
                .clone()
        }

        fn release(&self, call: usize) {
            self.gate(call).add_permits(1);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn wait_for_calls(&self, count: usize) {
            while self.calls() < count {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: &RequestSpec) -> ApiResult<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.gated {
                self.gate(call).acquire().await.unwrap().forget();
            }
            (self.handler)(request, call)
        }
    }

    fn versioned() -> Handler {
        Box::new(|request, call| match request.method {
            Method::Post => Ok(json!({ "touched": true })),
            _ => Ok(json!([format!("v{call}")])),
        })
    }

    fn client(transport: Arc<ScriptedTransport>) -> QueryClient {
        QueryClient::with_keep_unused(transport, Duration::from_secs(60))
    }

    async fn settle_quietly() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn concurrent_identical_queries_share_one_request() {
        let transport = ScriptedTransport::new(true, versioned());
        let client = client(transport.clone());

        let (first, second, _) = tokio::join!(
            client.query::<ListItems>(&()),
            client.query::<ListItems>(&()),
            async {
                transport.wait_for_calls(1).await;
                transport.release(0);
            }
        );

        assert_eq!(first.unwrap(), vec!["v0"]);
        assert_eq!(second.unwrap(), vec!["v0"]);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn fulfilled_query_is_served_from_cache() {
        let transport = ScriptedTransport::new(false, versioned());
        let client = client(transport.clone());

        client.query::<ListItems>(&()).await.unwrap();
        client.query::<ListItems>(&()).await.unwrap();
        assert_eq!(transport.calls(), 1);

        assert_eq!(client.refetch::<ListItems>(&()).await.unwrap(), vec!["v1"]);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn mutation_refetches_with_stale_data_visible() {
        let transport = ScriptedTransport::new(true, versioned());
        let client = client(transport.clone());

        let mut subscription = client.subscribe::<ListItems>(&()).unwrap();
        transport.release(0);
        assert_eq!(subscription.settled().await.unwrap(), vec!["v0"]);

        transport.release(1);
        client.mutate::<TouchItems>(&()).await.unwrap();

        let state = subscription.state();
        assert_eq!(state.status, QueryStatus::Pending);
        assert!(state.stale);
        assert!(state.is_fetching);
        assert!(!state.is_loading);
        assert_eq!(state.data.unwrap(), vec!["v0"]);

        transport.release(2);
        assert_eq!(subscription.settled().await.unwrap(), vec!["v2"]);
        assert!(!subscription.state().stale);
    }

    #[tokio::test]
    async fn later_invalidation_wins_even_if_answered_first() {
        let transport = ScriptedTransport::new(true, versioned());
        let client = client(transport.clone());

        transport.release(0);
        client.query::<ListItems>(&()).await.unwrap();

        assert_eq!(client.invalidate(&[ITEMS]), 1);
        transport.wait_for_calls(2).await;
        assert_eq!(client.invalidate(&[ITEMS]), 1);
        transport.wait_for_calls(3).await;

        transport.release(2);
        settle_quietly().await;
        transport.release(1);
        settle_quietly().await;

        let snapshot = client.snapshot::<ListItems>(&()).unwrap();
        assert_eq!(snapshot.status, QueryStatus::Fulfilled);
        assert_eq!(*snapshot.data.unwrap(), json!(["v2"]));
    }

    #[tokio::test]
    async fn abandoned_query_still_fills_the_cache() {
        let transport = ScriptedTransport::new(true, versioned());
        let client = client(transport.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), client.query::<ListItems>(&())).await;
        assert!(abandoned.is_err());

        transport.release(0);
        settle_quietly().await;

        let snapshot = client.snapshot::<ListItems>(&()).unwrap();
        assert_eq!(snapshot.status, QueryStatus::Fulfilled);
        assert_eq!(client.query::<ListItems>(&()).await.unwrap(), vec!["v0"]);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn rejected_query_is_retried_on_next_issue() {
        let transport = ScriptedTransport::new(
            false,
            Box::new(|_, call| match call {
                0 => Err(FetchError::http(503, "warming up", None)),
                _ => Ok(json!(["ready"])),
            }),
        );
        let client = client(transport.clone());

        let err = client.query::<ListItems>(&()).await.unwrap_err();
        assert_eq!(err.http_status(), Some(503));

        assert_eq!(client.query::<ListItems>(&()).await.unwrap(), vec!["ready"]);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn transport_failure_does_not_invalidate() {
        let transport = ScriptedTransport::new(
            false,
            Box::new(|request, call| match request.method {
                Method::Post => Err(FetchError::network("connection reset")),
                _ => Ok(json!([format!("v{call}")])),
            }),
        );
        let client = client(transport.clone());

        client.query::<ListItems>(&()).await.unwrap();
        assert!(client.mutate::<TouchItems>(&()).await.is_err());
        settle_quietly().await;

        assert_eq!(transport.calls(), 2);
        assert_eq!(client.query::<ListItems>(&()).await.unwrap(), vec!["v0"]);
    }

    #[tokio::test]
    async fn http_error_on_mutation_still_invalidates() {
        let transport = ScriptedTransport::new(
            false,
            Box::new(|request, call| match request.method {
                Method::Post => Err(FetchError::http(409, "conflict", None)),
                _ => Ok(json!([format!("v{call}")])),
            }),
        );
        let client = client(transport.clone());

        client.query::<ListItems>(&()).await.unwrap();
        assert!(client.mutate::<TouchItems>(&()).await.is_err());

        assert_eq!(client.query::<ListItems>(&()).await.unwrap(), vec!["v2"]);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn unused_entries_are_evicted_after_keep_window() {
        let transport = ScriptedTransport::new(false, versioned());
        let client = QueryClient::with_keep_unused(transport.clone(), Duration::from_millis(5));

        client.query::<ListItems>(&()).await.unwrap();
        let subscription = client.subscribe::<ListItems>(&()).unwrap();
        settle_quietly().await;
        assert_eq!(client.cached_entries(), 1);

        drop(subscription);
        settle_quietly().await;
        assert_eq!(client.cached_entries(), 0);
    }

    #[tokio::test]
    async fn reset_forgets_everything() {
        let transport = ScriptedTransport::new(false, versioned());
        let client = client(transport.clone());

        client.query::<ListItems>(&()).await.unwrap();
        client.reset();
        assert!(client.snapshot::<ListItems>(&()).is_none());

        assert_eq!(client.query::<ListItems>(&()).await.unwrap(), vec!["v1"]);
    }
}
