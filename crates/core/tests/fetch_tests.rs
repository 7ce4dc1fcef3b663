//! Fetcher and engine integration tests against a local HTTP server
use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use pagewalk_core::*;

#[derive(Clone)]
struct Reply {
    status: u16,
    body: Vec<u8>,
    content_type: &'static str,
}

fn html(status: u16, body: &str) -> Reply {
    Reply { status, body: body.as_bytes().to_vec(), content_type: "text/html; charset=utf-8" }
}

struct TestServer {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    /// Serves the replies of each path in order, repeating the last one.
    fn start(routes: Vec<(&str, Vec<Reply>)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let routes: HashMap<String, Vec<Reply>> = routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect();
        let hits = Arc::new(Mutex::new(HashMap::<String, usize>::new()));
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();

        let counter = Arc::clone(&hits);
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

                let path = request.url().to_string();
                let seen = {
                    let mut hits = counter.lock().unwrap();
                    let entry = hits.entry(path.clone()).or_insert(0);
                    *entry += 1;
                    *entry
                };

                let reply = routes
                    .get(&path)
                    .and_then(|replies| replies.get(seen - 1).or_else(|| replies.last()))
                    .cloned()
                    .unwrap_or_else(|| html(404, "not found"));

                let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
                    .expect("build header");
                let response = tiny_http::Response::from_data(reply.body)
                    .with_status_code(reply.status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self { base_url, hits, shutdown, handle: Some(handle) }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn fast_config(max_retries: u32) -> FetchConfig {
    FetchConfig { timeout: 5, max_retries, retry_delay_ms: 10, ..FetchConfig::default() }
}

#[tokio::test]
async fn test_503_exhausts_retries() {
    let server = TestServer::start(vec![("/busy", vec![html(503, "")])]);

    let result = fetch(&server.url("/busy"), &fast_config(2)).await;

    assert!(!result.succeeded);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.status, Some(503));
    assert!(result.raw_markup.is_empty());
    assert!(result.error.is_some());
    assert_eq!(server.hits("/busy"), 3);
}

#[tokio::test]
async fn test_soft_blocked_403_returns_body() {
    let server = TestServer::start(vec![("/guarded", vec![html(403, "<p>Still the chapter</p>")])]);

    let result = fetch(&server.url("/guarded"), &fast_config(2)).await;

    assert!(result.succeeded);
    assert_eq!(result.status, Some(403));
    assert!(result.raw_markup.contains("Still the chapter"));
    assert_eq!(server.hits("/guarded"), 1);
}

#[tokio::test]
async fn test_503_with_body_is_soft_block() {
    let server = TestServer::start(vec![("/cf", vec![html(503, "<p>Checking your browser</p>")])]);

    let result = fetch(&server.url("/cf"), &fast_config(2)).await;

    assert!(result.succeeded);
    assert_eq!(server.hits("/cf"), 1);
}

#[tokio::test]
async fn test_404_fails_without_retry() {
    let server = TestServer::start(vec![]);

    let result = fetch(&server.url("/missing"), &fast_config(2)).await;

    assert!(!result.succeeded);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.status, Some(404));
    assert_eq!(server.hits("/missing"), 1);
}

#[tokio::test]
async fn test_transient_error_then_success() {
    let server = TestServer::start(vec![("/flaky", vec![html(500, "oops"), html(200, "<p>Recovered</p>")])]);

    let result = fetch(&server.url("/flaky"), &fast_config(2)).await;

    assert!(result.succeeded);
    assert_eq!(result.attempts, 2);
    assert!(result.raw_markup.contains("Recovered"));
}

#[tokio::test]
async fn test_declared_charset_is_decoded() {
    let (body, _, _) = encoding_rs::GBK.encode("<html><head><title>第三章</title></head><body><p>雨夜</p></body></html>");
    let reply = Reply { status: 200, body: body.into_owned(), content_type: "text/html; charset=gbk" };
    let server = TestServer::start(vec![("/gbk", vec![reply])]);

    let result = fetch(&server.url("/gbk"), &fast_config(0)).await;

    assert!(result.succeeded);
    assert!(result.raw_markup.contains("第三章"));
    assert!(result.raw_markup.contains("雨夜"));
}

fn chapter_page(n: u32, next: Option<&str>) -> Reply {
    let paragraphs = (1..=4)
        .map(|i| {
            format!(
                "<p>Paragraph {i} of chapter {n}. The caravan moved on through the dunes, slowly, patiently, \
                 and the drivers sang the old songs to keep the camels calm under the white sky.</p>"
            )
        })
        .collect::<String>();
    let next_link = next.map(|href| format!(r#"<a href="{href}">Next chapter</a>"#)).unwrap_or_default();
    html(
        200,
        &format!(
            r#"<html><head><title>Chapter {n}</title></head><body>
                <div class="chapter-content">{paragraphs}</div>
                <div class="pager">{next_link}</div>
            </body></html>"#
        ),
    )
}

#[tokio::test]
async fn test_engine_collects_book_over_http() {
    let server = TestServer::start(vec![
        ("/book/chapter-1.html", vec![chapter_page(1, Some("chapter-2.html"))]),
        ("/book/chapter-2.html", vec![chapter_page(2, Some("/book/chapter-3.html"))]),
        ("/book/chapter-3.html", vec![chapter_page(3, None)]),
    ]);
    let config = EngineConfig::builder().max_retries(0).retry_delay_ms(10).build();
    let engine = Engine::new(config).unwrap();

    let chapters = engine.collect_book(&server.url("/book/chapter-1.html"), None).await.unwrap();

    assert_eq!(chapters.len(), 3);
    assert_eq!(chapters.iter().map(|c| c.chapter).collect::<Vec<_>>(), vec![Some(1), Some(2), Some(3)]);
    assert!(chapters[2].text.contains("chapter 3"));
    assert_eq!(server.hits("/book/chapter-4.html"), 1);
    assert_eq!(engine.inspect_memory().cached_urls.len(), 3);
}

#[tokio::test]
async fn test_engine_book_respects_cap() {
    let server = TestServer::start(vec![
        ("/book/chapter-1.html", vec![chapter_page(1, Some("chapter-2.html"))]),
        ("/book/chapter-2.html", vec![chapter_page(2, Some("chapter-3.html"))]),
    ]);
    let engine = Engine::new(EngineConfig::builder().max_retries(0).build()).unwrap();

    let chapters = engine.collect_book(&server.url("/book/chapter-1.html"), Some(1)).await.unwrap();

    assert_eq!(chapters.len(), 1);
    assert_eq!(server.hits("/book/chapter-2.html"), 0);
}
