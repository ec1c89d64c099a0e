//! User-facing messages for every action outcome.

use std::fmt;

use crate::error::{ActionError, FailureKind};
use crate::validation::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LoadBooks,
    LoadBook,
    CreateBook,
    EditBook,
    DeleteBook,
    BorrowBook,
    LoadSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: Option<String>,
    /// Underlying cause, e.g. the server's message.
    pub detail: Option<String>,
    pub fields: Vec<FieldError>,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            text: None,
            detail: None,
            fields: Vec::new(),
        }
    }

    pub fn error(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            text: Some(text.into()),
            detail: None,
            fields: Vec::new(),
        }
    }

    /// Notice for an outcome; successful reads need none.
    pub fn for_outcome<T>(action: Action, outcome: &Result<T, ActionError>) -> Option<Self> {
        match outcome {
            Ok(_) => success_title(action).map(Notice::success),
            Err(err) => Some(Self::for_error(action, err)),
        }
    }

    pub fn for_error(action: Action, err: &ActionError) -> Self {
        if let Some(errors) = err.validation() {
            return Self {
                fields: errors.fields().to_vec(),
                ..Notice::error("Please fix the highlighted fields.", err.to_string())
            };
        }

        let notice = match (action, err.kind()) {
            (Action::CreateBook, _) => {
                Notice::error("Something went wrong", "Unable to add book. Please try again.")
            }
            (Action::EditBook, FailureKind::Network) => {
                Notice::error("Error!", "Failed to save changes.")
            }
            (Action::EditBook, _) => {
                Notice::error("Something went wrong!", "Please try again later.")
            }
            (Action::DeleteBook, _) => Notice::error("Error", "Failed to delete the book."),
            (Action::BorrowBook, _) => Notice::error("Error", "Failed to borrow the book."),
            (Action::LoadBooks, _) => Notice::error("Error", "Failed to load books."),
            (Action::LoadBook, _) => Notice::error("Error", "Failed to load the book."),
            (Action::LoadSummary, _) => Notice::error("Error", "Failed to load the borrow summary."),
        };

        Self {
            detail: Some(err.to_string()),
            ..notice
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

fn success_title(action: Action) -> Option<&'static str> {
    match action {
        Action::CreateBook => Some("Book added successfully!"),
        Action::EditBook => Some("Save Changes Successful!"),
        Action::DeleteBook => Some("Book deleted successfully!"),
        Action::BorrowBook => Some("Book borrowed successfully!"),
        Action::LoadBooks | Action::LoadBook | Action::LoadSummary => None,
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.title)?;
        if let Some(text) = &self.text {
            write!(f, " {text}")?;
        }
        for field in &self.fields {
            write!(f, "\n  - {field}")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\n  ({detail})")?;
        }
        Ok(())
    }
}
