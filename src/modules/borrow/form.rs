use super::models::{parse_date, BorrowRequest};
use crate::modules::books::Book;
use crate::validation::{required, ValidationErrors};

/// Raw loan input for a specific book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowForm {
    pub quantity: String,
    pub due_date: String,
}

impl BorrowForm {
    pub fn new(quantity: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            quantity: quantity.into(),
            due_date: due_date.into(),
        }
    }

    /// Check the input against the book's current stock.
    pub fn validate(&self, book: &Book) -> Result<BorrowRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !book.available || book.copies == 0 {
            errors.push("quantity", "This book is not available");
        }

        let quantity = required(&mut errors, "quantity", &self.quantity, "Quantity is required")
            .and_then(|raw| match raw.parse::<i64>() {
                Err(_) => {
                    errors.push("quantity", "Quantity must be a whole number");
                    None
                }
                Ok(n) if n < 1 => {
                    errors.push("quantity", "Quantity must be at least 1");
                    None
                }
                Ok(n) if n > i64::from(book.copies) => {
                    errors.push("quantity", format!("Only {} copies available", book.copies));
                    None
                }
                Ok(n) => u32::try_from(n).ok(),
            });

        let due_date = required(&mut errors, "dueDate", &self.due_date, "Due date is required")
            .and_then(|raw| {
                let date = parse_date(&raw);
                if date.is_none() {
                    errors.push("dueDate", "Due date must be a valid date (YYYY-MM-DD)");
                }
                date
            });

        errors.finish(|| {
            Some(BorrowRequest {
                book_id: book.id.clone(),
                quantity: quantity?,
                due_date: due_date?,
            })
        })
    }
}
