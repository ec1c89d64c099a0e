use std::marker::PhantomData;

use tokio::sync::watch;

use shelf_http::{ApiResult, FetchError};
use shelf_kernel::Endpoint;

use crate::client::{settle, SubscriberGuard};
use crate::key::QueryKey;
use crate::snapshot::{QuerySnapshot, QueryState};

/// Live view of one cached query. Dropping it unsubscribes; the entry is
/// evicted once it has had no subscribers for the keep-unused window.
pub struct Subscription<E: Endpoint> {
    key: QueryKey,
    receiver: watch::Receiver<QuerySnapshot>,
    _guard: SubscriberGuard,
    _endpoint: PhantomData<fn() -> E>,
}

impl<E: Endpoint> Subscription<E> {
    pub(crate) fn new(
        key: QueryKey,
        receiver: watch::Receiver<QuerySnapshot>,
        guard: SubscriberGuard,
    ) -> Self {
        Self {
            key,
            receiver,
            _guard: guard,
            _endpoint: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.receiver.borrow().clone()
    }

    pub fn state(&self) -> QueryState<E::Output> {
        QueryState::from_snapshot(&self.receiver.borrow())
    }

    /// Wait for the next transition of the entry.
    pub async fn changed(&mut self) -> ApiResult<QueryState<E::Output>> {
        self.receiver
            .changed()
            .await
            .map_err(|_| FetchError::custom("cache entry dropped"))?;
        Ok(self.state())
    }

    /// Wait until no request is in flight and return the outcome.
    pub async fn settled(&mut self) -> ApiResult<E::Output> {
        settle(&mut self.receiver).await?.outcome()
    }
}
