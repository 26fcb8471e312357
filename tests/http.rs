use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use notes_web::backup::SystemClock;
use notes_web::config::AppConfig;
use notes_web::web;
use tempfile::TempDir;
use time::UtcOffset;
use tower::ServiceExt;

fn test_app(dir: &Path) -> Router {
    let config = AppConfig {
        notes_dir: dir.to_path_buf(),
        ..AppConfig::default()
    };
    web::app(&config, Arc::new(SystemClock::with_offset(UtcOffset::UTC)))
}

async fn send(app: &Router, request: Request<Body>) -> anyhow::Result<(StatusCode, String)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, String::from_utf8(body.to_vec())?))
}

fn get(uri: &str) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder().uri(uri).body(Body::empty())?)
}

fn autosave(content: &str) -> anyhow::Result<Request<Body>> {
    let body = format!("content={}", urlencoding::encode(content));
    Ok(Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("X-Requested-With", "XMLHttpRequest")
        .body(Body::from(body))?)
}

fn backup_names(dir: &Path) -> anyhow::Result<Vec<String>> {
    let backups = dir.join("notes_backups");
    if !backups.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(backups)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn editor_page_initialises_empty_document() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let app = test_app(temp.path());

    let (status, body) = send(&app, get("/")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<textarea name=\"content\">"));
    assert!(body.contains("0 backups available"));
    assert_eq!(fs::read_to_string(temp.path().join("notes.txt"))?, "");
    Ok(())
}

#[tokio::test]
async fn autosave_returns_timestamp_and_skips_first_backup() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let app = test_app(temp.path());

    let (status, stamp) = send(&app, autosave("hello world")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stamp.len(), "2006-01-02 15:04:05".len());
    assert_eq!(
        fs::read_to_string(temp.path().join("notes.txt"))?,
        "hello world"
    );
    assert!(backup_names(temp.path())?.is_empty());
    Ok(())
}

#[tokio::test]
async fn regular_post_redirects_to_editor() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let app = test_app(temp.path());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("content=typed+by+hand"))?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/")
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("notes.txt"))?,
        "typed by hand"
    );
    Ok(())
}

#[tokio::test]
async fn missing_content_field_saves_empty_document() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let app = test_app(temp.path());
    send(&app, autosave("something")?).await?;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("X-Requested-With", "XMLHttpRequest")
        .body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fs::read_to_string(temp.path().join("notes.txt"))?, "");
    Ok(())
}

#[tokio::test]
async fn second_save_backs_up_and_backup_is_viewable() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let app = test_app(temp.path());

    send(&app, autosave("<first> & draft")?).await?;
    send(&app, autosave("second draft")?).await?;

    let names = backup_names(temp.path())?;
    assert_eq!(names.len(), 1);
    let name = &names[0];
    assert!(name.starts_with("notes_") && name.ends_with(".bak"));

    let (status, editor) = send(&app, get("/")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(editor.contains(&format!("<option value=\"{name}\">")));
    assert!(editor.contains("1 backups available"));

    let (status, viewer) = send(&app, get(&format!("/backup/{name}"))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(viewer.contains("&lt;first&gt; &amp; draft"));
    assert!(viewer.contains("Restore This Version"));
    Ok(())
}

#[tokio::test]
async fn restore_saves_backup_content_and_backs_up_current() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let app = test_app(temp.path());

    send(&app, autosave("original")?).await?;
    send(&app, autosave("mistake")?).await?;
    let names = backup_names(temp.path())?;
    let backup = fs::read_to_string(temp.path().join("notes_backups").join(&names[0]))?;
    assert_eq!(backup, "original");

    send(&app, autosave(&backup)?).await?;
    assert_eq!(
        fs::read_to_string(temp.path().join("notes.txt"))?,
        "original"
    );
    let mut contents = Vec::new();
    for name in backup_names(temp.path())? {
        contents.push(fs::read_to_string(
            temp.path().join("notes_backups").join(name),
        )?);
    }
    assert!(contents.iter().any(|content| content == "mistake"));
    Ok(())
}

#[tokio::test]
async fn backup_route_rejects_unsafe_or_unknown_names() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("secret.bak"), "outside")?;
    let app = test_app(temp.path());

    let (status, body) = send(&app, get("/backup/notes.txt")?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid backup file type");

    let (status, body) = send(&app, get("/backup/..%2Fsecret.bak")?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid backup filename");

    let (status, body) = send(&app, get("/backup/notes_20000101_000000.bak")?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Backup file not found");
    Ok(())
}

#[tokio::test]
async fn autosave_keeps_form_reserved_characters() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let app = test_app(temp.path());

    let content = "a+b & c=d\n100% done\n";
    let (status, _) = send(&app, autosave(content)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fs::read_to_string(temp.path().join("notes.txt"))?, content);
    Ok(())
}
