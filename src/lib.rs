//! Book lending catalog.
//!
//! Domain models and endpoint definitions for the lending API, client-side
//! form validation, and the [`Catalog`] actions that tie them to the query
//! cache.

pub mod catalog;
pub mod error;
pub mod modules;
pub mod notice;
pub mod validation;

pub use catalog::{BookListWatch, Catalog};
pub use error::{ActionError, FailureKind};
pub use notice::{Action, Notice, NoticeLevel};
pub use validation::{FieldError, ValidationErrors};
