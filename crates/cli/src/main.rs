//! `shelf`: command-line front end for the book lending catalog.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use shelf_console::modules::books::{Book, BookForm};
use shelf_console::modules::borrow::{BorrowForm, BorrowRecord};
use shelf_console::{modules, Action, ActionError, Catalog, Notice};
use shelf_kernel::{EndpointKind, Settings, Tag};

/// Browse and manage the book lending catalog.
#[derive(Parser)]
#[command(name = "shelf", version, about = "Book lending catalog client")]
struct Cli {
    /// Lending API base URL, overriding configuration.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with books.
    #[command(subcommand)]
    Books(BookCommands),

    /// Borrow copies of a book.
    Borrow {
        book_id: String,

        #[arg(long)]
        quantity: String,

        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due_date: String,
    },

    /// Show copies borrowed per book.
    Summary,

    /// Print the endpoint catalogue and audit warnings. Works offline.
    Endpoints,
}

#[derive(Subcommand)]
enum BookCommands {
    /// List all books.
    List,

    /// Show one book.
    Show { id: String },

    /// Add a new book.
    Add(NewBook),

    /// Change fields of a book; unset flags keep their stored value.
    Edit {
        id: String,

        #[command(flatten)]
        changes: BookChanges,
    },

    /// Delete a book.
    Delete {
        id: String,

        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct NewBook {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    /// FICTION, NON_FICTION, SCIENCE, HISTORY, BIOGRAPHY or FANTASY.
    #[arg(long)]
    genre: String,
    #[arg(long)]
    isbn: String,
    #[arg(long)]
    description: String,
    #[arg(long, default_value = "1")]
    copies: String,
}

#[derive(Args)]
struct BookChanges {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    copies: Option<String>,
}

impl From<NewBook> for BookForm {
    fn from(book: NewBook) -> Self {
        BookForm {
            title: book.title,
            author: book.author,
            genre: book.genre,
            isbn: book.isbn,
            description: book.description,
            copies: book.copies,
        }
    }
}

impl BookChanges {
    fn apply(self, form: &mut BookForm) {
        let fields = [
            (self.title, &mut form.title),
            (self.author, &mut form.author),
            (self.genre, &mut form.genre),
            (self.isbn, &mut form.isbn),
            (self.description, &mut form.description),
            (self.copies, &mut form.copies),
        ];
        for (change, field) in fields {
            if let Some(value) = change {
                *field = value;
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::load().context("failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    if let Some(api_url) = cli.api_url {
        settings.api.base_url = api_url;
    }

    tracing::debug!(env = ?settings.environment, base_url = %settings.api.base_url, "shelf starting");

    let catalog = match cli.command {
        Commands::Endpoints => return Ok(print_endpoints()),
        _ => Catalog::connect(&settings)?,
    };

    let code = match cli.command {
        Commands::Books(BookCommands::List) => match catalog.books().await {
            Ok(books) => {
                print_books(&books);
                ExitCode::SUCCESS
            }
            Err(err) => fail(Action::LoadBooks, &err),
        },

        Commands::Books(BookCommands::Show { id }) => match catalog.book(&id).await {
            Ok(book) => {
                print_book(&book);
                ExitCode::SUCCESS
            }
            Err(err) => fail(Action::LoadBook, &err),
        },

        Commands::Books(BookCommands::Add(book)) => {
            let outcome = catalog.create_book(&BookForm::from(book)).await;
            if let Ok(Some(book)) = &outcome {
                println!("id: {}", book.id);
            }
            report(Action::CreateBook, &outcome)
        }

        Commands::Books(BookCommands::Edit { id, changes }) => {
            let book = match catalog.book(&id).await {
                Ok(book) => book,
                Err(err) => return Ok(fail(Action::LoadBook, &err)),
            };
            let mut form = BookForm::from_book(&book);
            changes.apply(&mut form);

            report(Action::EditBook, &catalog.edit_book(&id, &form).await)
        }

        Commands::Books(BookCommands::Delete { id, yes }) => {
            if !yes {
                eprintln!("refusing to delete book {id} without --yes");
                return Ok(ExitCode::FAILURE);
            }
            report(Action::DeleteBook, &catalog.delete_book(&id).await)
        }

        Commands::Borrow {
            book_id,
            quantity,
            due_date,
        } => {
            let book = match catalog.book(&book_id).await {
                Ok(book) => book,
                Err(err) => return Ok(fail(Action::LoadBook, &err)),
            };
            let form = BorrowForm::new(quantity, due_date);
            report(Action::BorrowBook, &catalog.borrow_book(&book, &form).await)
        }

        Commands::Summary => match catalog.borrow_summary().await {
            Ok(records) => {
                print_summary(&records);
                ExitCode::SUCCESS
            }
            Err(err) => fail(Action::LoadSummary, &err),
        },

        Commands::Endpoints => ExitCode::SUCCESS,
    };

    Ok(code)
}

fn report<T>(action: Action, outcome: &Result<T, ActionError>) -> ExitCode {
    match Notice::for_outcome(action, outcome) {
        Some(notice) if notice.is_error() => {
            eprintln!("{notice}");
            ExitCode::FAILURE
        }
        Some(notice) => {
            println!("{notice}");
            ExitCode::SUCCESS
        }
        None => ExitCode::SUCCESS,
    }
}

fn fail(action: Action, err: &ActionError) -> ExitCode {
    eprintln!("{}", Notice::for_error(action, err));
    ExitCode::FAILURE
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("No books found.");
        return;
    }

    println!(
        "{:<26} {:<32} {:<22} {:<12} {:>6} {:<9}",
        "ID", "TITLE", "AUTHOR", "GENRE", "COPIES", "AVAILABLE"
    );
    println!("{}", "-".repeat(112));

    for book in books {
        println!(
            "{:<26} {:<32} {:<22} {:<12} {:>6} {:<9}",
            clip(&book.id, 26),
            clip(&book.title, 32),
            clip(&book.author, 22),
            book.genre.as_str(),
            book.copies,
            if book.available { "yes" } else { "no" }
        );
    }
}

fn print_book(book: &Book) {
    println!("id:          {}", book.id);
    println!("title:       {}", book.title);
    println!("author:      {}", book.author);
    println!("genre:       {}", book.genre);
    println!("isbn:        {}", book.isbn);
    println!("copies:      {}", book.copies);
    println!("available:   {}", book.available);
    if !book.description.is_empty() {
        println!("description: {}", book.description);
    }
}

fn print_summary(records: &[BorrowRecord]) {
    if records.is_empty() {
        println!("No borrowed books.");
        return;
    }

    println!("{:<40} {:<17} {:>8}", "TITLE", "ISBN", "BORROWED");
    println!("{}", "-".repeat(67));

    for record in records {
        println!(
            "{:<40} {:<17} {:>8}",
            clip(&record.book.title, 40),
            record.book.isbn,
            record.total_quantity
        );
    }
}

fn print_endpoints() -> ExitCode {
    let registry = modules::registry();

    println!(
        "{:<18} {:<9} {:<7} {:<14} {:<14} {:<14}",
        "NAME", "KIND", "METHOD", "PATH", "PROVIDES", "INVALIDATES"
    );
    println!("{}", "-".repeat(81));

    for descriptor in registry.descriptors() {
        let kind = match descriptor.kind {
            EndpointKind::Query => "query",
            EndpointKind::Mutation => "mutation",
        };
        println!(
            "{:<18} {:<9} {:<7} {:<14} {:<14} {:<14}",
            descriptor.name,
            kind,
            descriptor.method.as_str(),
            descriptor.path,
            tag_list(descriptor.provides),
            tag_list(descriptor.invalidates)
        );
    }

    for finding in registry.audit() {
        tracing::warn!(%finding, "endpoint audit");
        println!("warning: {finding}");
    }

    ExitCode::SUCCESS
}

fn tag_list(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "-".to_string();
    }
    tags.iter().map(Tag::to_string).collect::<Vec<_>>().join(",")
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
