pub mod form;
pub mod models;

use serde_json::Value;

use shelf_http::ServerEnvelope;
use shelf_kernel::{Endpoint, EndpointDescriptor, EndpointKind, EndpointRegistry, Method};

use super::books::BOOKS;

pub use form::BorrowForm;
pub use models::{BorrowRecord, BorrowRequest, BorrowedBook};

/// `POST /borrow`; borrowing changes stock, so the book list is refetched.
pub struct BorrowBook;

impl Endpoint for BorrowBook {
    type Arg = BorrowRequest;
    type Output = ServerEnvelope<Value>;

    const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
        name: "borrowBook",
        kind: EndpointKind::Mutation,
        method: Method::Post,
        path: "/borrow",
        body: Some("BorrowRequest"),
        provides: &[],
        invalidates: &[BOOKS],
    };

    fn body(request: &Self::Arg) -> Result<Option<Value>, serde_json::Error> {
        serde_json::to_value(request).map(Some)
    }
}

/// `GET /borrow`
pub struct GetBorrowSummary;

impl Endpoint for GetBorrowSummary {
    type Arg = ();
    type Output = ServerEnvelope<Vec<BorrowRecord>>;

    const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
        name: "getBorrowSummary",
        kind: EndpointKind::Query,
        method: Method::Get,
        path: "/borrow",
        body: None,
        provides: &[],
        invalidates: &[],
    };
}

/// Register the borrow endpoints with the registry
pub fn register(registry: &mut EndpointRegistry) {
    registry.register::<BorrowBook>();
    registry.register::<GetBorrowSummary>();
}
