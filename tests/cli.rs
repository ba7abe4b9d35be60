mod common;

use predicates::prelude::*;

fn command(server: &common::FixtureServer) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("verse-import");
    cmd.env("VERSE_IMPORT_VEDABASE_BASE", server.vedabase_base())
        .env("VERSE_IMPORT_GITABASE_BASE", server.gitabase_base())
        .env("VERSE_IMPORT_THROTTLE_MS", "0")
        .env("VERSE_IMPORT_MAX_ATTEMPTS", "1")
        .env_remove("VERSE_IMPORT_PROXY_URL");
    cmd
}

#[test]
fn plan_prints_segments_in_window() {
    let server = common::spawn_fixture_server(common::gita_pages());
    command(&server)
        .args(["plan", "--book", "gita", "--chapter", "1", "--verses", "2-3"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""segment": "2""#))
        .stdout(predicate::str::contains(r#""segment": "3-4""#))
        .stdout(predicate::str::contains("/vb/en/library/bg/1/3-4/"))
        .stdout(predicate::str::contains("/gb/ua/BG/1/2"))
        .stdout(predicate::str::contains("/vb/en/library/bg/1/1/").not())
        .stdout(predicate::str::contains("Observing the Armies"));
}

#[test]
fn import_then_show_chapter() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(common::gita_pages());
    let temp = tempfile::TempDir::new()?;
    let store = temp.path().join("store");
    let report = temp.path().join("report.json");

    command(&server)
        .args(["import", "--book", "gita", "--chapters", "1", "--store"])
        .arg(&store)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""chapters_succeeded": 1"#))
        .stdout(predicate::str::contains(r#""verses_written": 3"#));

    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&report)?)?;
    assert_eq!(saved["book_slug"], "gita");
    assert_eq!(saved["skipped"][0]["segment"], "3-4");

    command(&server)
        .args(["show", "--book", "bg", "--chapter", "1", "--store"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("Огляд армій"))
        .stdout(predicate::str::contains("Sañjaya said: O King"));
    Ok(())
}

#[test]
fn import_into_unregistered_canto_fails() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(common::gita_pages());
    let temp = tempfile::TempDir::new()?;

    command(&server)
        .args(["import", "--book", "sb", "--canto", "2", "--chapters", "1-2"])
        .args(["--secondary", "none", "--store"])
        .arg(temp.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("canto 2 of bhagavatam is not registered"))
        .stderr(predicate::str::contains("no usable chapters"));
    Ok(())
}

#[test]
fn canto_add_registers_once() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(common::gita_pages());
    let temp = tempfile::TempDir::new()?;

    for _ in 0..2 {
        command(&server)
            .args(["canto", "add", "--book", "sb", "--number", "1"])
            .args(["--title-en", "Creation", "--store"])
            .arg(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""canto_number": 1"#));
    }

    let library: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp.path().join("library.json"))?)?;
    assert_eq!(library["cantos"].as_array().map(Vec::len), Some(1));

    command(&server)
        .args(["show", "--book", "sb", "--canto", "1", "--chapter", "1", "--store"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not stored"));
    Ok(())
}

#[test]
fn import_file_splits_chapters() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(Default::default());
    let temp = tempfile::TempDir::new()?;
    let book = temp.path().join("gita.txt");

    let mut text = String::from("ГЛАВА ДРУГА\nЗміст Ґіти\n");
    for n in 1..=3 {
        text.push_str(&format!(
            "ТЕКСТ {n}\nсанджайа у ва\u{301}ча\nПЕРЕКЛАД\nСанджая сказав {n}.\nПОЯСНЕННЯ\nКоментар до вірша {n}.\n\n"
        ));
    }
    std::fs::write(&book, text)?;

    command(&server)
        .args(["import-file", "--book", "gita", "--language", "uk", "--path"])
        .arg(&book)
        .arg("--store")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""verses_written": 3"#));

    command(&server)
        .args(["show", "--book", "gita", "--chapter", "2", "--store"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Зміст Ґіти"))
        .stdout(predicate::str::contains("Санджая сказав 3."));
    Ok(())
}

#[test]
fn import_file_keeps_prose_chapters() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(Default::default());
    let temp = tempfile::TempDir::new()?;
    let book = temp.path().join("gita.txt");

    let mut text = String::from("ГЛАВА ПЕРША\nВступ\nПро Бгаґавад-ґіту.\n\nДругий абзац вступу.\n");
    text.push_str("ГЛАВА ДРУГА\nЗміст Ґіти\n");
    for n in 1..=3 {
        text.push_str(&format!("ТЕКСТ {n}\nПЕРЕКЛАД\nСанджая сказав {n}.\n\n"));
    }
    std::fs::write(&book, text)?;

    command(&server)
        .args(["import-file", "--book", "gita", "--path"])
        .arg(&book)
        .arg("--store")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""chapters_succeeded": 2"#))
        .stdout(predicate::str::contains(r#""verses_written": 3"#));

    let output = command(&server)
        .args(["show", "--book", "gita", "--chapter", "1", "--store"])
        .arg(temp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let view: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(view["chapter"]["chapter_type"], "text");
    assert_eq!(view["chapter"]["title_uk"], "Вступ");
    assert_eq!(
        view["chapter"]["content_uk"],
        "Про Бгаґавад-ґіту.\n\nДругий абзац вступу."
    );
    assert_eq!(view["verses"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[test]
fn rust_log_debug_emits_parsed_cli() {
    let server = common::spawn_fixture_server(Default::default());
    command(&server)
        .env("RUST_LOG", "debug")
        .args(["plan", "--book", "nosuchbook", "--chapter", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsed cli"))
        .stderr(predicate::str::contains("unknown book: nosuchbook"));
}
