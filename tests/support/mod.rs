//! In-process mock of the lending API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use shelf_console::Catalog;
use shelf_kernel::Settings;

type Reply = (StatusCode, Json<Value>);

#[derive(Default)]
pub struct MockLibrary {
    books: Mutex<Vec<Value>>,
    loans: Mutex<Vec<(String, u64)>>,
    next_id: AtomicUsize,
    requests: AtomicUsize,
    list_calls: AtomicUsize,
    last_body: Mutex<Option<Value>>,
    canned: Mutex<Option<(u16, Value)>>,
    acknowledge_writes: AtomicBool,
    list_delay: Mutex<Duration>,
}

impl MockLibrary {
    pub fn seeded() -> Arc<Self> {
        let library = Arc::new(Self::default());
        library.insert(json!({
            "title": "The Hobbit",
            "author": "J.R.R. Tolkien",
            "genre": "FANTASY",
            "isbn": "9780547928227",
            "description": "There and back again",
            "copies": 3,
            "available": true
        }));
        library.insert(json!({
            "title": "A Brief History of Time",
            "author": "Stephen Hawking",
            "genre": "SCIENCE",
            "isbn": "9780553380163",
            "description": "From the big bang to black holes",
            "copies": 1,
            "available": true
        }));
        library
    }

    /// Total requests served.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    /// Answer every following request with `status`.
    pub fn fail_with(&self, status: u16) {
        self.respond_with(
            status,
            json!({ "success": false, "message": "Internal server error" }),
        );
    }

    /// Answer every following request with `body` and `status`.
    pub fn respond_with(&self, status: u16, body: Value) {
        *self.canned.lock().unwrap() = Some((status, body));
    }

    /// Creates and updates still apply, but answer with a write receipt
    /// instead of the stored book.
    pub fn acknowledge_writes(&self) {
        self.acknowledge_writes.store(true, Ordering::SeqCst);
    }

    fn receipt(&self, receipt: Value) -> Option<Reply> {
        self.acknowledge_writes.load(Ordering::SeqCst).then(|| {
            (
                StatusCode::OK,
                Json(json!({ "success": true, "message": "Write acknowledged", "data": receipt })),
            )
        })
    }

    pub fn delay_lists(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = delay;
    }

    /// Add a book behind the client's back.
    pub fn insert(&self, mut book: Value) -> String {
        let id = format!("b{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        book["_id"] = json!(id);
        self.books.lock().unwrap().push(book);
        id
    }

    fn enter(&self, body: Option<&Value>) -> Option<Reply> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(body) = body {
            *self.last_body.lock().unwrap() = Some(body.clone());
        }
        let (status, body) = self.canned.lock().unwrap().clone()?;
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Some((status, Json(body)))
    }

    fn find(&self, id: &str) -> Option<Value> {
        self.books
            .lock()
            .unwrap()
            .iter()
            .find(|book| book["_id"] == id)
            .cloned()
    }
}

fn success(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn failure(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "success": false, "message": message })))
}

async fn list_books(State(library): State<Arc<MockLibrary>>) -> Reply {
    library.list_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(reply) = library.enter(None) {
        return reply;
    }
    let delay = *library.list_delay.lock().unwrap();
    tokio::time::sleep(delay).await;

    let books = library.books.lock().unwrap().clone();
    success(Value::Array(books))
}

async fn create_book(State(library): State<Arc<MockLibrary>>, Json(body): Json<Value>) -> Reply {
    if let Some(reply) = library.enter(Some(&body)) {
        return reply;
    }
    let id = library.insert(body);
    if let Some(reply) = library.receipt(json!({ "acknowledged": true, "insertedId": id })) {
        return reply;
    }
    let book = library.find(&id).unwrap_or(Value::Null);
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Book created successfully", "data": book })),
    )
}

async fn get_book(State(library): State<Arc<MockLibrary>>, Path(id): Path<String>) -> Reply {
    if let Some(reply) = library.enter(None) {
        return reply;
    }
    match library.find(&id) {
        Some(book) => success(book),
        None => failure(StatusCode::NOT_FOUND, "Book not found"),
    }
}

async fn update_book(
    State(library): State<Arc<MockLibrary>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if let Some(reply) = library.enter(Some(&body)) {
        return reply;
    }
    let mut books = library.books.lock().unwrap();
    let Some(book) = books.iter_mut().find(|book| book["_id"] == id) else {
        return failure(StatusCode::NOT_FOUND, "Book not found");
    };
    if let (Some(target), Some(fields)) = (book.as_object_mut(), body.as_object()) {
        for (field, value) in fields {
            target.insert(field.clone(), value.clone());
        }
    }
    let book = book.clone();
    drop(books);

    library
        .receipt(json!({ "acknowledged": true, "modifiedCount": 1 }))
        .unwrap_or_else(|| success(book))
}

async fn delete_book(State(library): State<Arc<MockLibrary>>, Path(id): Path<String>) -> Reply {
    if let Some(reply) = library.enter(None) {
        return reply;
    }
    let mut books = library.books.lock().unwrap();
    let before = books.len();
    books.retain(|book| book["_id"] != id);
    if books.len() == before {
        return failure(StatusCode::NOT_FOUND, "Book not found");
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Book deleted successfully", "data": null })),
    )
}

async fn borrow_book(State(library): State<Arc<MockLibrary>>, Json(body): Json<Value>) -> Reply {
    if let Some(reply) = library.enter(Some(&body)) {
        return reply;
    }
    let book_id = body["bookId"].as_str().unwrap_or_default().to_string();
    let quantity = body["quantity"].as_u64().unwrap_or_default();

    {
        let mut books = library.books.lock().unwrap();
        let Some(book) = books.iter_mut().find(|book| book["_id"] == book_id) else {
            return failure(StatusCode::NOT_FOUND, "Book not found");
        };
        let copies = book["copies"].as_u64().unwrap_or_default();
        if quantity > copies {
            return failure(StatusCode::BAD_REQUEST, "Not enough copies available");
        }
        book["copies"] = json!(copies - quantity);
        book["available"] = json!(copies - quantity > 0);
    }

    library.loans.lock().unwrap().push((book_id.clone(), quantity));
    success(json!({ "book": book_id, "quantity": quantity, "dueDate": body["dueDate"] }))
}

async fn borrow_summary(State(library): State<Arc<MockLibrary>>) -> Reply {
    if let Some(reply) = library.enter(None) {
        return reply;
    }
    let loans = library.loans.lock().unwrap().clone();
    let mut rows: Vec<(String, u64)> = Vec::new();
    for (book_id, quantity) in loans {
        match rows.iter_mut().find(|(id, _)| *id == book_id) {
            Some(row) => row.1 += quantity,
            None => rows.push((book_id, quantity)),
        }
    }

    let summary = rows
        .into_iter()
        .map(|(book_id, total)| {
            let book = library.find(&book_id).unwrap_or(Value::Null);
            json!({
                "totalQuantity": total,
                "book": { "title": book["title"], "isbn": book["isbn"] }
            })
        })
        .collect();
    success(Value::Array(summary))
}

/// Serve the mock on an ephemeral port and return its API base URL.
pub async fn serve(library: Arc<MockLibrary>) -> String {
    let app = Router::new()
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/borrow", get(borrow_summary).post(borrow_book))
        .with_state(library);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

/// A catalog wired to a freshly served mock.
pub async fn catalog(library: Arc<MockLibrary>) -> Catalog {
    let mut settings = Settings::default();
    settings.api.base_url = serve(library).await;
    Catalog::connect(&settings).unwrap()
}
