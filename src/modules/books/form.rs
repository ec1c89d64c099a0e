use super::models::{Book, BookDraft, Genre};
use crate::validation::{required, ValidationErrors};

/// Raw book input, as typed by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub description: String,
    pub copies: String,
}

/// Create and edit apply different copy rules and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Edit,
}

struct Messages {
    title: &'static str,
    author: &'static str,
    genre: &'static str,
    isbn: &'static str,
    description: &'static str,
    copies: &'static str,
}

const CREATE_MESSAGES: Messages = Messages {
    title: "Title is required",
    author: "Author is required",
    genre: "Genre is required",
    isbn: "ISBN is required",
    description: "Description is required",
    copies: "Copies required",
};

const EDIT_MESSAGES: Messages = Messages {
    title: "Title is required!",
    author: "Author name is required!",
    genre: "Genre is required!",
    isbn: "ISBN number is required!",
    description: "Description is required!",
    copies: "Copies is required",
};

impl BookForm {
    /// Prefill an edit form from the stored book.
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.to_string(),
            isbn: book.isbn.clone(),
            description: book.description.clone(),
            copies: book.copies.to_string(),
        }
    }

    /// New books need at least one copy.
    pub fn validate_create(&self) -> Result<BookDraft, ValidationErrors> {
        self.validate(Mode::Create)
    }

    /// Edits accept zero copies; a non-numeric value counts as zero.
    pub fn validate_edit(&self) -> Result<BookDraft, ValidationErrors> {
        self.validate(Mode::Edit)
    }

    fn validate(&self, mode: Mode) -> Result<BookDraft, ValidationErrors> {
        let messages = match mode {
            Mode::Create => &CREATE_MESSAGES,
            Mode::Edit => &EDIT_MESSAGES,
        };
        let mut errors = ValidationErrors::new();

        let title = required(&mut errors, "title", &self.title, messages.title);
        let author = required(&mut errors, "author", &self.author, messages.author);
        let genre = required(&mut errors, "genre", &self.genre, messages.genre).and_then(|raw| {
            raw.parse::<Genre>()
                .map_err(|_| errors.push("genre", genre_message()))
                .ok()
        });
        let isbn = required(&mut errors, "isbn", &self.isbn, messages.isbn);
        let description =
            required(&mut errors, "description", &self.description, messages.description);
        let copies = required(&mut errors, "copies", &self.copies, messages.copies)
            .and_then(|raw| parse_copies(&raw, mode).map_err(|msg| errors.push("copies", msg)).ok());

        errors.finish(|| {
            Some(BookDraft {
                title: title?,
                author: author?,
                genre: genre?,
                isbn: isbn?,
                description: description?,
                copies: copies?,
            })
        })
    }
}

fn genre_message() -> String {
    let names: Vec<_> = Genre::ALL.iter().map(Genre::as_str).collect();
    format!("Genre must be one of {}", names.join(", "))
}

fn parse_copies(raw: &str, mode: Mode) -> Result<u32, &'static str> {
    match mode {
        Mode::Create => match raw.parse::<i64>() {
            Err(_) => Err("Copies must be a whole number"),
            Ok(n) if n < 1 => Err("Minimum 1 copy"),
            Ok(n) => u32::try_from(n).map_err(|_| "Copies is too large"),
        },
        Mode::Edit => match raw.parse::<i64>() {
            Err(_) => Ok(0),
            Ok(n) if n < 0 => Err("Copies must be 0 or positive number."),
            Ok(n) => u32::try_from(n).map_err(|_| "Copies is too large"),
        },
    }
}
