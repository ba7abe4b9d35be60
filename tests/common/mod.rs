#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub struct FixtureServer {
    pub base_url: String,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FixtureServer {
    pub fn vedabase_base(&self) -> String {
        format!("{}/vb/", self.base_url)
    }

    pub fn gitabase_base(&self) -> String {
        format!("{}/gb/", self.base_url)
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn vedabase_verse(script: &str, translit: &str, translation: &str) -> String {
    format!(
        r#"<!doctype html>
<html><body>
  <div class="av-devanagari"><div class="text-center">{script}</div></div>
  <div class="av-verse_text"><div class="text-center italic"><em>{translit}</em></div></div>
  <div class="av-synonyms"><div class="text-justify">
    <span class="inline"><em>dharma-kṣetre</em> — in the place of pilgrimage;</span>
  </div></div>
  <div class="av-translation"><strong>{translation}</strong></div>
  <div class="av-purport"><p>This purport paragraph explains the verse in detail.</p></div>
</body></html>
"#
    )
}

fn gitabase_verse(synonyms: &str, translation: &str) -> String {
    format!(
        r#"<!doctype html>
<html><body><div class="container">
  <div class="row"><div><div class="dia_text">{synonyms}</div></div></div>
  <h4><b>{translation}</b></h4>
</div></body></html>
"#
    )
}

/// Pages for Bhagavad-gita chapter 1 on both sites. Gitabase lacks the
/// joined segment `3-4`.
pub fn gita_pages() -> HashMap<String, String> {
    let mut pages = HashMap::new();
    pages.insert(
        "/vb/en/library/bg/1/".to_owned(),
        r#"<!doctype html>
<html><body>
  <h1>Chapter 1: Observing the Armies</h1>
  <a href="/vb/en/library/bg/">Bhagavad-gita</a>
  <a href="/vb/en/library/bg/2/">Next chapter</a>
  <a href="/vb/en/library/bg/1/1/">Text 1</a>
  <a href="2/">Text 2</a>
  <a href="3-4/">Texts 3-4</a>
</body></html>
"#
        .to_owned(),
    );
    pages.insert(
        "/vb/en/library/bg/1/1/".to_owned(),
        vedabase_verse(
            "धर्मक्षेत्रे कुरुक्षेत्रे",
            "dharma-kṣetre kuru-kṣetre samavetā yuyutsavaḥ",
            "Dhṛtarāṣṭra said: O Sañjaya, what did my sons do?",
        ),
    );
    pages.insert(
        "/vb/en/library/bg/1/2/".to_owned(),
        vedabase_verse(
            "दृष्ट्वा तु पाण्डवानीकं",
            "dṛṣṭvā tu pāṇḍavānīkaṁ vyūḍhaṁ",
            "Sañjaya said: O King, after looking over the army.",
        ),
    );
    pages.insert(
        "/vb/en/library/bg/1/3-4/".to_owned(),
        vedabase_verse(
            "पश्यैतां पाण्डुपुत्राणाम्",
            "paśyaitāṁ pāṇḍu-putrāṇām ācārya mahatīṁ camūm",
            "O my teacher, behold the great army of the sons of Pāṇḍu.",
        ),
    );
    pages.insert(
        "/gb/ua/BG/1".to_owned(),
        "<!doctype html><html><body><h1>Огляд армій</h1></body></html>".to_owned(),
    );
    pages.insert(
        "/gb/ua/BG/1/1".to_owned(),
        gitabase_verse("дгарма-кшетре — на святому місці", "Дгрітараштра сказав: О Санджайо..."),
    );
    pages.insert(
        "/gb/ua/BG/1/2".to_owned(),
        gitabase_verse("дрштва — побачивши", "Санджая сказав: О царю..."),
    );
    pages
}

fn vedabase_translation_only(translation: &str) -> String {
    format!(
        r#"<!doctype html>
<html><body>
  <div class="av-translation"><strong>{translation}</strong></div>
</body></html>
"#
    )
}

/// Chapter 1 plus a chapter 2 whose English pages carry only a translation.
/// Gitabase has verse 1 of chapter 2 with synonyms and lacks verse 2.
pub fn gita_pages_with_sparse_chapter() -> HashMap<String, String> {
    let mut pages = gita_pages();
    pages.insert(
        "/vb/en/library/bg/2/".to_owned(),
        r#"<!doctype html>
<html><body>
  <h1>Chapter 2: Contents of the Gītā Summarized</h1>
  <a href="1/">Text 1</a>
  <a href="2/">Text 2</a>
</body></html>
"#
        .to_owned(),
    );
    pages.insert(
        "/vb/en/library/bg/2/1/".to_owned(),
        vedabase_translation_only("Sañjaya said: Seeing Arjuna full of compassion."),
    );
    pages.insert(
        "/vb/en/library/bg/2/2/".to_owned(),
        vedabase_translation_only("The Supreme Personality of Godhead said: My dear Arjuna."),
    );
    pages.insert(
        "/gb/ua/BG/2".to_owned(),
        "<!doctype html><html><body><h1>Зміст Ґіти</h1></body></html>".to_owned(),
    );
    pages.insert(
        "/gb/ua/BG/2/1".to_owned(),
        gitabase_verse("там — тоді; крпайа — співчуттям", "Санджая сказав: Побачивши Арджуну..."),
    );
    pages
}

pub fn spawn_fixture_server(pages: HashMap<String, String>) -> FixtureServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            let path = url.split('?').next().unwrap_or(&url);
            let response = match pages.get(path) {
                Some(body) => {
                    let header = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"text/html; charset=utf-8"[..],
                    )
                    .expect("build header");
                    tiny_http::Response::from_string(body.clone()).with_header(header)
                }
                None => tiny_http::Response::from_string("not found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    FixtureServer {
        base_url,
        shutdown_tx,
        handle: Some(handle),
    }
}
