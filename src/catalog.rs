//! Caller-side actions against the lending API.
//!
//! Every action validates its input first, runs the endpoint through the
//! shared query cache and unwraps the response envelope.

use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use shelf_cache::{QueryClient, Subscription};
use shelf_http::{ApiClient, ServerEnvelope};
use shelf_kernel::Settings;

use crate::error::ActionError;
use crate::modules::books::{
    Book, BookForm, BookPatch, CreateBook, DeleteBook, EditBook, EditBookArgs, GetBookById,
    GetBooks,
};
use crate::modules::borrow::{BorrowBook, BorrowForm, BorrowRecord, GetBorrowSummary};

#[derive(Clone)]
pub struct Catalog {
    client: QueryClient,
}

impl Catalog {
    pub fn new(client: QueryClient) -> Self {
        Self { client }
    }

    /// Build the HTTP client and cache from loaded settings.
    pub fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let api = ApiClient::new(&settings.api).context("failed to set up the lending API client")?;
        tracing::info!(base_url = %api.base_url(), "lending API client ready");

        Ok(Self::new(QueryClient::new(Arc::new(api), &settings.cache)))
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// Book list, from cache when fulfilled.
    pub async fn books(&self) -> Result<Vec<Book>, ActionError> {
        accept(self.client.query::<GetBooks>(&()).await?)
    }

    /// Book list, always fetched again.
    pub async fn refresh_books(&self) -> Result<Vec<Book>, ActionError> {
        accept(self.client.refetch::<GetBooks>(&()).await?)
    }

    /// Live book list; refetched whenever a mutation invalidates it.
    pub fn watch_books(&self) -> Result<BookListWatch, ActionError> {
        Ok(BookListWatch {
            subscription: self.client.subscribe::<GetBooks>(&())?,
        })
    }

    pub async fn book(&self, id: &str) -> Result<Book, ActionError> {
        accept(self.client.query::<GetBookById>(&id.to_string()).await?)
    }

    /// Create a book. The stored book is returned when the server echoes it.
    pub async fn create_book(&self, form: &BookForm) -> Result<Option<Book>, ActionError> {
        let draft = form.validate_create()?;
        tracing::info!(title = %draft.title, copies = draft.copies, "creating book");

        let data = accept(self.client.mutate::<CreateBook>(&draft).await?)?;
        let book = stored_book(data);
        match &book {
            Some(book) => tracing::info!(book_id = %book.id, "book created"),
            None => tracing::info!("book created"),
        }
        Ok(book)
    }

    /// Save every field of the edit form.
    pub async fn edit_book(&self, id: &str, form: &BookForm) -> Result<Option<Book>, ActionError> {
        let draft = form.validate_edit()?;
        self.update_book(id, BookPatch::from(draft)).await
    }

    /// Send only the fields set on `patch`.
    pub async fn update_book(
        &self,
        id: &str,
        patch: BookPatch,
    ) -> Result<Option<Book>, ActionError> {
        tracing::info!(book_id = %id, copies = ?patch.copies, "updating book");
        let args = EditBookArgs {
            id: id.to_string(),
            patch,
        };
        let data = accept_empty(self.client.mutate::<EditBook>(&args).await?)?;
        Ok(data.and_then(stored_book))
    }

    pub async fn delete_book(&self, id: &str) -> Result<(), ActionError> {
        tracing::info!(book_id = %id, "deleting book");
        accept_empty(self.client.mutate::<DeleteBook>(&id.to_string()).await?)?;
        Ok(())
    }

    /// Borrow copies of `book`, checked against its current stock.
    pub async fn borrow_book(&self, book: &Book, form: &BorrowForm) -> Result<(), ActionError> {
        let request = form.validate(book)?;
        tracing::info!(
            book_id = %request.book_id,
            quantity = request.quantity,
            due_date = %request.due_date,
            "borrowing book"
        );

        let _: Option<Value> = accept_empty(self.client.mutate::<BorrowBook>(&request).await?)?;
        Ok(())
    }

    pub async fn borrow_summary(&self) -> Result<Vec<BorrowRecord>, ActionError> {
        accept(self.client.query::<GetBorrowSummary>(&()).await?)
    }
}

/// Subscription to the book list that applies the same envelope checks as
/// [`Catalog::books`]. Dropping it releases the cache entry.
pub struct BookListWatch {
    subscription: Subscription<GetBooks>,
}

impl BookListWatch {
    /// Last received list, kept while a refetch is in flight.
    pub fn books(&self) -> Option<Result<Vec<Book>, ActionError>> {
        self.subscription.state().data.map(accept)
    }

    /// The list is being refetched after an invalidation.
    pub fn is_stale(&self) -> bool {
        self.subscription.snapshot().stale
    }

    pub fn is_fetching(&self) -> bool {
        self.subscription.snapshot().is_fetching()
    }

    /// Wait until no request is in flight.
    pub async fn settled(&mut self) -> Result<Vec<Book>, ActionError> {
        accept(self.subscription.settled().await?)
    }

    /// Wait for the next change of the list.
    pub async fn changed(&mut self) -> Result<(), ActionError> {
        self.subscription.changed().await?;
        Ok(())
    }

    pub fn subscription(&self) -> &Subscription<GetBooks> {
        &self.subscription
    }
}

/// `data` as a book, if it is one; write receipts and other shapes give `None`.
fn stored_book(data: Value) -> Option<Book> {
    match serde_json::from_value(data) {
        Ok(book) => Some(book),
        Err(err) => {
            tracing::debug!(error = %err, "write response carried no book");
            None
        }
    }
}

fn accept<T>(envelope: ServerEnvelope<T>) -> Result<T, ActionError> {
    Ok(envelope.into_data()?)
}

fn accept_empty<T>(envelope: ServerEnvelope<T>) -> Result<Option<T>, ActionError> {
    Ok(envelope.into_result()?)
}
