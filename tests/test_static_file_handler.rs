use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::read::GzDecoder;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{HeaderMap, Request, StatusCode};
use md5::{Digest, Md5};
use staticache::configuration::configuration::Configuration;
use staticache::error::static_cache_error::DeclineReason;
use staticache::http::request_response::serve_request::ServeRequest;
use staticache::http::static_file_handler::{HandleOutcome, StaticFileHandler};
use std::io::Read;
use std::path::Path;
use std::time::{Duration, SystemTime};

struct Served {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

fn md5_base64(content: &[u8]) -> String {
    STANDARD.encode(Md5::digest(content))
}

fn gunzip(content: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::new();
    GzDecoder::new(content).read_to_end(&mut decoded).unwrap();
    decoded
}

fn header<'a>(served: &'a Served, name: &str) -> Option<&'a str> {
    served.headers.get(name).map(|v| v.to_str().unwrap())
}

async fn create_handler(dir: &Path, configure: impl FnOnce(&mut Configuration)) -> StaticFileHandler {
    let mut configuration = Configuration::new();
    configuration.dir = dir.display().to_string();
    configure(&mut configuration);
    configuration.sanitize();
    configuration.validate().unwrap();
    StaticFileHandler::new(&configuration).await.unwrap()
}

async fn try_send(handler: &StaticFileHandler, method: &str, uri: &str, headers: &[(&str, &str)]) -> Result<Served, DeclineReason> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = ServeRequest::new(builder.body(Bytes::new()).unwrap());

    match handler.handle_request(&request).await {
        HandleOutcome::Handled(response) => {
            let response = response.into_hyper();
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            Ok(Served { status, headers, body })
        }
        HandleOutcome::Declined(reason) => Err(reason),
    }
}

async fn send(handler: &StaticFileHandler, method: &str, uri: &str, headers: &[(&str, &str)]) -> Served {
    match try_send(handler, method, uri, headers).await {
        Ok(served) => served,
        Err(reason) => panic!("Expected {} {} to be served but it was declined: {:?}", method, uri, reason),
    }
}

fn write_file(dir: &Path, name: &str, content: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_serves_file_with_headers() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "hello.txt", b"hello world");
    let handler = create_handler(dir.path(), |c| c.max_age = 3600).await;

    let served = send(&handler, "GET", "/hello.txt", &[]).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body, Bytes::from_static(b"hello world"));
    assert_eq!(header(&served, "content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(header(&served, "content-length"), Some("11"));
    assert_eq!(header(&served, "cache-control"), Some("public, max-age=3600"));
    assert!(header(&served, "last-modified").is_some());
    assert!(header(&served, "content-encoding").is_none());
}

#[tokio::test]
async fn test_content_md5_matches_independent_digest() {
    let dir = tempfile::tempdir().unwrap();
    let content = b"The quick brown fox jumps over the lazy dog";
    write_file(dir.path(), "fox.txt", content);
    let handler = create_handler(dir.path(), |_| {}).await;

    let served = send(&handler, "GET", "/fox.txt", &[]).await;
    let expected = md5_base64(content);
    assert_eq!(header(&served, "content-md5"), Some(expected.as_str()));
    assert_eq!(header(&served, "etag"), Some(format!("\"{}\"", expected).as_str()));
}

#[tokio::test]
async fn test_repeated_requests_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "app.js", b"console.log('hi');");
    let handler = create_handler(dir.path(), |_| {}).await;

    let first = send(&handler, "GET", "/app.js", &[]).await;
    let second = send(&handler, "GET", "/app.js", &[]).await;
    for name in ["etag", "content-md5", "content-length", "last-modified"] {
        assert_eq!(header(&first, name), header(&second, name), "Header {} changed between requests", name);
    }
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_hidden_files_are_declined() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), ".env", b"SECRET=1");
    write_file(dir.path(), "sub/.htpasswd", b"admin:x");
    let handler = create_handler(dir.path(), |_| {}).await;

    for uri in ["/.env", "/sub/.htpasswd", "/%2eenv", "/.missing"] {
        assert!(try_send(&handler, "GET", uri, &[]).await.is_err(), "{} should be declined", uri);
    }
}

#[tokio::test]
async fn test_traversal_is_declined() {
    let outer = tempfile::tempdir().unwrap();
    write_file(outer.path(), "secret.txt", b"outside");
    write_file(outer.path(), "public/index.html", b"inside");
    let handler = create_handler(&outer.path().join("public"), |_| {}).await;

    for uri in ["/../secret.txt", "/%2e%2e/secret.txt", "/%2E%2E%2Fsecret.txt", "/a/../../secret.txt", "/..%5Csecret.txt"] {
        assert!(try_send(&handler, "GET", uri, &[]).await.is_err(), "{} should be declined", uri);
    }
}

#[tokio::test]
async fn test_malformed_escape_is_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let handler = create_handler(dir.path(), |_| {}).await;
    assert_eq!(try_send(&handler, "GET", "/bad%zzname", &[]).await.err(), Some(DeclineReason::DecodeFailure));
}

#[tokio::test]
async fn test_conditional_get_and_head() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "page.html", b"<h1>page</h1>");
    let handler = create_handler(dir.path(), |_| {}).await;

    let served = send(&handler, "GET", "/page.html", &[]).await;
    let etag = header(&served, "etag").unwrap().to_string();

    for method in ["GET", "HEAD"] {
        let not_modified = send(&handler, method, "/page.html", &[("if-none-match", &etag)]).await;
        assert_eq!(not_modified.status, StatusCode::NOT_MODIFIED);
        assert!(not_modified.body.is_empty());
        assert_eq!(header(&not_modified, "etag"), Some(etag.as_str()));
    }

    let modified = send(&handler, "GET", "/page.html", &[("if-none-match", "\"something-else\"")]).await;
    assert_eq!(modified.status, StatusCode::OK);
    assert_eq!(modified.body, Bytes::from_static(b"<h1>page</h1>"));

    let last_modified = header(&served, "last-modified").unwrap().to_string();
    let not_modified = send(&handler, "GET", "/page.html", &[("if-modified-since", &last_modified)]).await;
    assert_eq!(not_modified.status, StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_head_has_headers_but_no_body() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "data.json", b"{\"a\":1}");
    let handler = create_handler(dir.path(), |_| {}).await;

    let served = send(&handler, "HEAD", "/data.json", &[]).await;
    assert_eq!(served.status, StatusCode::OK);
    assert!(served.body.is_empty());
    assert_eq!(header(&served, "content-length"), Some("7"));
    assert_eq!(header(&served, "content-type"), Some("application/json; charset=utf-8"));
}

#[tokio::test]
async fn test_head_and_get_agree_on_encoding_headers() {
    let dir = tempfile::tempdir().unwrap();
    let content: Vec<u8> = (0..2000).map(|i| b"abcdefghij"[i % 10]).collect();
    write_file(dir.path(), "big.txt", &content);

    for buffer in [true, false] {
        let handler = create_handler(dir.path(), |c| {
            c.gzip = true;
            c.buffer = buffer;
        })
        .await;
        let gzip = [("accept-encoding", "gzip")];

        let first_head = send(&handler, "HEAD", "/big.txt", &gzip).await;
        let get = send(&handler, "GET", "/big.txt", &gzip).await;
        let second_head = send(&handler, "HEAD", "/big.txt", &gzip).await;

        for served in [&first_head, &get, &second_head] {
            assert_eq!(header(served, "content-encoding"), Some("gzip"), "buffer={}", buffer);
        }
        assert_eq!(header(&first_head, "content-length"), header(&get, "content-length"), "buffer={}", buffer);
        assert_eq!(header(&second_head, "content-length"), header(&get, "content-length"), "buffer={}", buffer);
        if buffer {
            assert_eq!(header(&get, "content-length"), Some(get.body.len().to_string().as_str()));
        } else {
            assert!(header(&get, "content-length").is_none());
        }
        assert!(first_head.body.is_empty());
        assert_eq!(gunzip(&get.body), content);

        // Without negotiation both describe the uncompressed bytes
        let plain_head = send(&handler, "HEAD", "/big.txt", &[]).await;
        let plain_get = send(&handler, "GET", "/big.txt", &[]).await;
        assert!(header(&plain_head, "content-encoding").is_none());
        assert_eq!(header(&plain_head, "content-length"), Some("2000"));
        assert_eq!(header(&plain_head, "content-length"), header(&plain_get, "content-length"));
    }
}

#[tokio::test]
async fn test_gzip_negotiation_buffered() {
    let dir = tempfile::tempdir().unwrap();
    let content: Vec<u8> = (0..2000).map(|i| b"abcdefghij"[i % 10]).collect();
    write_file(dir.path(), "big.txt", &content);
    let handler = create_handler(dir.path(), |c| c.gzip = true).await;

    let served = send(&handler, "GET", "/big.txt", &[("accept-encoding", "gzip")]).await;
    assert_eq!(header(&served, "content-encoding"), Some("gzip"));
    assert_eq!(header(&served, "vary"), Some("Accept-Encoding"));
    assert_eq!(header(&served, "content-length"), Some(served.body.len().to_string().as_str()));
    assert_eq!(gunzip(&served.body), content);
    // Validators always describe the uncompressed bytes
    assert_eq!(header(&served, "content-md5"), Some(md5_base64(&content).as_str()));

    let plain = send(&handler, "GET", "/big.txt", &[("accept-encoding", "")]).await;
    assert!(header(&plain, "content-encoding").is_none());
    assert_eq!(plain.body, Bytes::from(content.clone()));
    assert_eq!(header(&plain, "content-length"), Some("2000"));

    let no_header = send(&handler, "GET", "/big.txt", &[]).await;
    assert!(header(&no_header, "content-encoding").is_none());
    assert_eq!(no_header.body, Bytes::from(content));
}

#[tokio::test]
async fn test_gzip_skipped_for_small_and_incompressible_files() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "small.txt", b"tiny");
    write_file(dir.path(), "image.png", &[0u8; 4096]);
    let handler = create_handler(dir.path(), |c| c.gzip = true).await;

    for uri in ["/small.txt", "/image.png"] {
        let served = send(&handler, "GET", uri, &[("accept-encoding", "gzip")]).await;
        assert!(header(&served, "content-encoding").is_none(), "{} should not be compressed", uri);
        assert_eq!(header(&served, "vary"), Some("Accept-Encoding"));
    }
}

#[tokio::test]
async fn test_gzip_negotiation_streamed() {
    let dir = tempfile::tempdir().unwrap();
    let content = "streamed line of text\n".repeat(200);
    write_file(dir.path(), "stream.txt", content.as_bytes());
    let handler = create_handler(dir.path(), |c| {
        c.gzip = true;
        c.buffer = false;
    })
    .await;

    let served = send(&handler, "GET", "/stream.txt", &[("accept-encoding", "gzip, deflate")]).await;
    assert_eq!(header(&served, "content-encoding"), Some("gzip"));
    assert!(header(&served, "content-length").is_none());
    assert_eq!(gunzip(&served.body), content.as_bytes());

    let plain = send(&handler, "GET", "/stream.txt", &[]).await;
    assert!(header(&plain, "content-encoding").is_none());
    assert_eq!(header(&plain, "content-length"), Some(content.len().to_string().as_str()));
    assert_eq!(plain.body, Bytes::from(content));
}

#[tokio::test]
async fn test_streamed_hash_is_available_after_first_full_response() {
    let dir = tempfile::tempdir().unwrap();
    let content = b"streamed file content";
    write_file(dir.path(), "stream.txt", content);
    let handler = create_handler(dir.path(), |c| c.buffer = false).await;

    let first = send(&handler, "GET", "/stream.txt", &[]).await;
    assert_eq!(first.body, Bytes::from_static(content));
    assert!(header(&first, "etag").is_none());
    assert!(header(&first, "content-md5").is_none());

    let second = send(&handler, "GET", "/stream.txt", &[]).await;
    assert_eq!(header(&second, "content-md5"), Some(md5_base64(content).as_str()));
    assert_eq!(header(&second, "etag"), Some(format!("\"{}\"", md5_base64(content)).as_str()));
}

#[tokio::test]
async fn test_streamed_file_change_invalidates_hash() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "live.txt", b"version one");
    let handler = create_handler(dir.path(), |c| c.buffer = false).await;

    send(&handler, "GET", "/live.txt", &[]).await;
    let hashed = send(&handler, "GET", "/live.txt", &[]).await;
    assert!(header(&hashed, "etag").is_some());

    let path = dir.path().join("live.txt");
    std::fs::write(&path, b"version two, longer").unwrap();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(10)).unwrap();

    let changed = send(&handler, "GET", "/live.txt", &[]).await;
    assert!(header(&changed, "etag").is_none());
    assert_eq!(header(&changed, "content-length"), Some("19"));
    assert_eq!(changed.body, Bytes::from_static(b"version two, longer"));

    let rehashed = send(&handler, "GET", "/live.txt", &[]).await;
    assert_eq!(header(&rehashed, "content-md5"), Some(md5_base64(b"version two, longer").as_str()));
}

#[tokio::test]
async fn test_buffered_file_is_frozen_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "frozen.txt", b"original");
    let handler = create_handler(dir.path(), |_| {}).await;

    let path = dir.path().join("frozen.txt");
    std::fs::write(&path, b"changed on disk").unwrap();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(10)).unwrap();

    let served = send(&handler, "GET", "/frozen.txt", &[]).await;
    assert_eq!(served.body, Bytes::from_static(b"original"));
}

#[tokio::test]
async fn test_directory_index_fallback() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<h1>home</h1>");
    write_file(dir.path(), "docs/index.html", b"<h1>docs</h1>");
    std::fs::create_dir_all(dir.path().join("empty")).unwrap();
    let handler = create_handler(dir.path(), |_| {}).await;

    let root = send(&handler, "GET", "/", &[]).await;
    assert_eq!(root.body, Bytes::from_static(b"<h1>home</h1>"));
    assert_eq!(header(&root, "content-type"), Some("text/html; charset=utf-8"));

    let docs = send(&handler, "GET", "/docs/", &[]).await;
    assert_eq!(docs.body, Bytes::from_static(b"<h1>docs</h1>"));

    // `/` and `/index.html` share a record
    let direct = send(&handler, "GET", "/index.html", &[]).await;
    assert_eq!(header(&direct, "etag"), header(&root, "etag"));
    assert_eq!(handler.get_cache().get_current_item_count(), 2);

    assert_eq!(try_send(&handler, "GET", "/empty", &[]).await.err(), Some(DeclineReason::NotFound));
}

#[tokio::test]
async fn test_root_without_index_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "other.txt", b"other");
    let handler = create_handler(dir.path(), |_| {}).await;
    assert_eq!(try_send(&handler, "GET", "/", &[]).await.err(), Some(DeclineReason::NotFound));
}

#[tokio::test]
async fn test_dynamic_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let handler = create_handler(dir.path(), |c| c.dynamic = true).await;
    assert_eq!(handler.get_cache().get_current_item_count(), 0);

    write_file(dir.path(), "late.txt", b"arrived later");
    let served = send(&handler, "GET", "/late.txt", &[]).await;
    assert_eq!(served.body, Bytes::from_static(b"arrived later"));
    assert_eq!(handler.get_cache().get_current_item_count(), 1);
}

#[tokio::test]
async fn test_preload_only_mode_does_not_discover() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "early.txt", b"present at start");
    let handler = create_handler(dir.path(), |c| {
        c.dynamic = false;
        c.preload = true;
    })
    .await;

    write_file(dir.path(), "late.txt", b"arrived later");
    assert_eq!(send(&handler, "GET", "/early.txt", &[]).await.status, StatusCode::OK);
    assert_eq!(try_send(&handler, "GET", "/late.txt", &[]).await.err(), Some(DeclineReason::NotFound));
}

#[tokio::test]
async fn test_lazy_mode_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", b"a");
    let handler = create_handler(dir.path(), |c| {
        c.preload = false;
        c.dynamic = true;
    })
    .await;

    assert_eq!(handler.get_cache().get_current_item_count(), 0);
    send(&handler, "GET", "/a.txt", &[]).await;
    assert_eq!(handler.get_cache().get_current_item_count(), 1);
}

#[tokio::test]
async fn test_query_string_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "index.ts", b"export {}");
    let handler = create_handler(dir.path(), |_| {}).await;

    let served = send(&handler, "GET", "/index.ts?query=string", &[]).await;
    assert_eq!(served.body, Bytes::from_static(b"export {}"));
}

#[tokio::test]
async fn test_percent_encoded_names() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "中文.txt", b"unicode name");
    write_file(dir.path(), "with space.txt", b"spaced");
    let handler = create_handler(dir.path(), |_| {}).await;

    assert_eq!(send(&handler, "GET", "/%E4%B8%AD%E6%96%87.txt", &[]).await.body, Bytes::from_static(b"unicode name"));
    assert_eq!(send(&handler, "GET", "/with%20space.txt", &[]).await.body, Bytes::from_static(b"spaced"));
    assert_eq!(send(&handler, "GET", "//with%20space.txt", &[]).await.body, Bytes::from_static(b"spaced"));
}

#[tokio::test]
async fn test_other_methods_are_declined() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", b"a");
    let handler = create_handler(dir.path(), |_| {}).await;

    assert_eq!(try_send(&handler, "PUT", "/a.txt", &[]).await.err(), Some(DeclineReason::NotOwned));
    assert_eq!(try_send(&handler, "POST", "/a.txt", &[]).await.err(), Some(DeclineReason::NotOwned));
}

#[tokio::test]
async fn test_prefix_serving() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "css/site.css", b"body {}");
    let handler = create_handler(dir.path(), |c| c.prefix = "/static/".to_string()).await;

    assert_eq!(send(&handler, "GET", "/static/css/site.css", &[]).await.body, Bytes::from_static(b"body {}"));
    assert_eq!(try_send(&handler, "GET", "/css/site.css", &[]).await.err(), Some(DeclineReason::NotOwned));
    assert_eq!(try_send(&handler, "GET", "/staticx/css/site.css", &[]).await.err(), Some(DeclineReason::NotOwned));
}

#[tokio::test]
async fn test_extra_headers_on_304() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", b"a");
    let handler = create_handler(dir.path(), |c| {
        c.extra_headers = vec![[("X-Served-By".to_string(), "staticache".to_string())].into_iter().collect()];
    })
    .await;

    let served = send(&handler, "GET", "/a.txt", &[]).await;
    let etag = header(&served, "etag").unwrap().to_string();
    let not_modified = send(&handler, "GET", "/a.txt", &[("if-none-match", &etag)]).await;
    assert_eq!(not_modified.status, StatusCode::NOT_MODIFIED);
    assert_eq!(header(&not_modified, "x-served-by"), Some("staticache"));
}
