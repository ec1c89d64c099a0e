pub mod form;
pub mod models;

use serde::Serialize;
use serde_json::Value;

use shelf_http::ServerEnvelope;
use shelf_kernel::{Endpoint, EndpointDescriptor, EndpointKind, EndpointRegistry, Method, Tag};

pub use form::BookForm;
pub use models::{Book, BookDraft, BookPatch, Genre};

/// Every cached view of the book list carries this tag.
pub const BOOKS: Tag = Tag::new("books");

/// `GET /books`
pub struct GetBooks;

impl Endpoint for GetBooks {
    type Arg = ();
    type Output = ServerEnvelope<Vec<Book>>;

    const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
        name: "getBooks",
        kind: EndpointKind::Query,
        method: Method::Get,
        path: "/books",
        body: None,
        provides: &[BOOKS],
        invalidates: &[],
    };
}

/// `GET /books/{id}`
pub struct GetBookById;

impl Endpoint for GetBookById {
    type Arg = String;
    type Output = ServerEnvelope<Book>;

    const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
        name: "getBookById",
        kind: EndpointKind::Query,
        method: Method::Get,
        path: "/books/{id}",
        body: None,
        provides: &[],
        invalidates: &[],
    };

    fn path_params(id: &Self::Arg) -> Vec<(&'static str, String)> {
        vec![("id", id.clone())]
    }
}

/// `POST /books`
///
/// Invalidates nothing, so a cached list does not show the new book until it
/// is refetched. `data` is usually the stored book but its shape is not
/// guaranteed.
pub struct CreateBook;

impl Endpoint for CreateBook {
    type Arg = BookDraft;
    type Output = ServerEnvelope<Value>;

    const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
        name: "createBook",
        kind: EndpointKind::Mutation,
        method: Method::Post,
        path: "/books",
        body: Some("BookDraft"),
        provides: &[],
        invalidates: &[],
    };

    fn body(draft: &Self::Arg) -> Result<Option<Value>, serde_json::Error> {
        serde_json::to_value(draft).map(Some)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditBookArgs {
    pub id: String,
    pub patch: BookPatch,
}

/// `PUT /books/{id}`
pub struct EditBook;

impl Endpoint for EditBook {
    type Arg = EditBookArgs;
    type Output = ServerEnvelope<Value>;

    const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
        name: "editBook",
        kind: EndpointKind::Mutation,
        method: Method::Put,
        path: "/books/{id}",
        body: Some("BookPatch"),
        provides: &[],
        invalidates: &[BOOKS],
    };

    fn path_params(args: &Self::Arg) -> Vec<(&'static str, String)> {
        vec![("id", args.id.clone())]
    }

    fn body(args: &Self::Arg) -> Result<Option<Value>, serde_json::Error> {
        serde_json::to_value(&args.patch).map(Some)
    }
}

/// `DELETE /books/{id}`
pub struct DeleteBook;

impl Endpoint for DeleteBook {
    type Arg = String;
    type Output = ServerEnvelope<Value>;

    const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
        name: "deleteBook",
        kind: EndpointKind::Mutation,
        method: Method::Delete,
        path: "/books/{id}",
        body: None,
        provides: &[],
        invalidates: &[BOOKS],
    };

    fn path_params(id: &Self::Arg) -> Vec<(&'static str, String)> {
        vec![("id", id.clone())]
    }
}

/// Register the book endpoints with the registry
pub fn register(registry: &mut EndpointRegistry) {
    registry.register::<GetBooks>();
    registry.register::<GetBookById>();
    registry.register::<CreateBook>();
    registry.register::<EditBook>();
    registry.register::<DeleteBook>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_request_targets_book_and_recomputes_availability() {
        let request = EditBook::request(&EditBookArgs {
            id: "b42".to_string(),
            patch: BookPatch::new().copies(0),
        })
        .unwrap();

        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path(), "/books/b42");
        assert_eq!(request.body.unwrap()["available"], false);
    }

    #[test]
    fn delete_without_id_cannot_be_built() {
        assert!(DeleteBook::request(&String::new()).is_err());
    }

    #[test]
    fn only_the_list_provides_books() {
        assert_eq!(GetBooks::DESCRIPTOR.provides, &[BOOKS]);
        assert!(GetBookById::DESCRIPTOR.provides.is_empty());
        assert!(CreateBook::DESCRIPTOR.invalidates.is_empty());
        assert_eq!(DeleteBook::DESCRIPTOR.invalidates, &[BOOKS]);
    }
}
