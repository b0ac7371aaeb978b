//! Scraper tests against a local listing page.

use axum::{extract::Path, http::StatusCode, response::Html, routing::get, Router};

use libran_gpt::scrape::{scrape, ScrapeSummary};

const LISTING: &str = r#"
<html><body>
  <a href="/files/Hansard%20Report%2C%20Day%201.pdf">Day 1</a>
  <a href="/files/missing.pdf">Day 2</a>
  <a href="/about">About</a>
</body></html>
"#;

async fn listing() -> Html<&'static str> {
    Html(LISTING)
}

async fn file(Path(name): Path<String>) -> Result<Vec<u8>, StatusCode> {
    if name.starts_with("Hansard") {
        Ok(b"%PDF-1.4\n%day one\n".to_vec())
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn spawn() -> String {
    let app = Router::new()
        .route("/listing", get(listing))
        .route("/files/{name}", get(file));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/listing", addr)
}

#[tokio::test]
async fn failed_download_is_counted_and_run_continues() {
    let url = spawn().await;
    let dir = tempfile::tempdir().unwrap();

    let summary = scrape(&url, dir.path(), None, 5).await.unwrap();

    assert_eq!(
        summary,
        ScrapeSummary {
            found: 2,
            downloaded: 1,
            failed: 1
        }
    );
    let saved = dir.path().join("Hansard_Report_Day_1.pdf");
    assert_eq!(std::fs::read(saved).unwrap(), b"%PDF-1.4\n%day one\n");
    assert!(!dir.path().join("missing.pdf").exists());
}

#[tokio::test]
async fn limit_caps_downloads() {
    let url = spawn().await;
    let dir = tempfile::tempdir().unwrap();

    let summary = scrape(&url, dir.path(), Some(1), 5).await.unwrap();

    assert_eq!(summary.found, 1);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.failed, 0);
}
