use assert_cmd::Command;

fn shelf() -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.env_remove("SHELF_ENV")
        .env("SHELF_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env("SHELF__API__BASE_URL", "http://127.0.0.1:9/api")
        .env("RUST_LOG", "error");
    cmd
}

fn stdout(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn help_lists_commands() {
    let mut cmd = shelf();
    cmd.arg("--help");
    cmd.assert().success();

    let text = stdout(&mut cmd);
    for command in ["books", "borrow", "summary", "endpoints"] {
        assert!(text.contains(command), "missing {command} in help:\n{text}");
    }
}

#[test]
fn endpoints_prints_catalogue_offline() {
    let mut cmd = shelf();
    cmd.arg("endpoints");
    cmd.assert().success();

    let text = stdout(&mut cmd);
    assert!(text.contains("getBooks"));
    assert!(text.contains("/books/{id}"));
    assert!(text.contains("getBorrowSummary"));
    assert!(text.contains("warning: mutation 'createBook'"));
}

#[test]
fn delete_requires_confirmation() {
    shelf()
        .args(["books", "delete", "b1"])
        .assert()
        .failure();
}

#[test]
fn unknown_environment_is_rejected() {
    shelf().env("SHELF_ENV", "moon").arg("endpoints").assert().failure();
}

fn stderr_of(cmd: &mut Command) -> (Option<i32>, String) {
    let output = cmd.output().unwrap();
    (output.status.code(), String::from_utf8(output.stderr).unwrap())
}

fn add_book(copies: &str) -> Command {
    let mut cmd = shelf();
    cmd.args([
        "books",
        "add",
        "--title",
        "Dune",
        "--author",
        "Frank Herbert",
        "--genre",
        "FICTION",
        "--isbn",
        "9780441172719",
        "--description",
        "Spice and sand",
        "--copies",
        copies,
    ]);
    cmd
}

#[test]
fn unreachable_server_prints_notice_and_exits_one() {
    let (code, stderr) = stderr_of(shelf().args(["books", "list"]));

    assert_eq!(code, Some(1));
    assert!(stderr.contains("Failed to load books."), "stderr was:\n{stderr}");
}

#[test]
fn invalid_copies_fail_before_any_request() {
    let (code, stderr) = stderr_of(&mut add_book("0"));

    assert_eq!(code, Some(1));
    assert!(stderr.contains("Please fix the highlighted fields."), "stderr was:\n{stderr}");
    assert!(stderr.contains("copies: Minimum 1 copy"));
    // Validation failed first, so the unreachable server was never tried.
    assert!(!stderr.contains("Unable to add book"));
}

#[test]
fn add_requires_description() {
    let (code, stderr) = stderr_of(shelf().args([
        "books",
        "add",
        "--title",
        "Dune",
        "--author",
        "Frank Herbert",
        "--genre",
        "FICTION",
        "--isbn",
        "9780441172719",
    ]));

    assert_eq!(code, Some(2));
    assert!(stderr.contains("--description"), "stderr was:\n{stderr}");
}
