use manga_core::ErrorKind;
use manga_engine::{FetchSettings, Fetcher, ReqwestFetcher};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> ReqwestFetcher {
    ReqwestFetcher::new(FetchSettings::default()).unwrap()
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_returns_body_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/1.png"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3, 4], "image/png"))
        .mount(&server)
        .await;

    let url = format!("{}/img/1.png", server.uri());
    let output = fetcher().fetch(&url).await.expect("fetch ok");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, url);
    assert_eq!(output.metadata.status, 200);
    assert_eq!(output.metadata.content_type.as_deref(), Some("image/png"));
    assert_eq!(output.metadata.byte_len, 4);
    assert_eq!(output.bytes.as_ref(), &[1u8, 2, 3, 4]);
}

#[tokio::test]
async fn http_statuses_map_to_failure_kinds() {
    let server = MockServer::start().await;
    serve(&server, "/gone", ResponseTemplate::new(404)).await;
    serve(&server, "/busy", ResponseTemplate::new(503)).await;
    serve(&server, "/slow-down", ResponseTemplate::new(429)).await;
    serve(&server, "/denied", ResponseTemplate::new(403)).await;

    let fetcher = fetcher();
    for (route, kind) in [
        ("/gone", ErrorKind::NotFound),
        ("/busy", ErrorKind::TransientNetwork),
        ("/slow-down", ErrorKind::TransientNetwork),
        ("/denied", ErrorKind::Blocked),
    ] {
        let err = fetcher
            .fetch(&format!("{}{}", server.uri(), route))
            .await
            .unwrap_err();
        assert_eq!(err.kind, kind, "{route}");
        assert!(err.status.is_some());
    }
}

#[tokio::test]
async fn challenge_body_is_blocked() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/manga",
        ResponseTemplate::new(503).set_body_raw(
            "<html><head><title>Just a moment...</title></head><body class=\"cf-chl-bypass\"></body></html>",
            "text/html",
        ),
    )
    .await;

    let err = fetcher()
        .fetch(&format!("{}/manga", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Blocked);
    assert_eq!(err.status, Some(503));
}

#[tokio::test]
async fn oversized_response_is_rejected() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/big.jpg",
        ResponseTemplate::new(200).set_body_raw(vec![0u8; 4096], "image/jpeg"),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings {
        max_bytes: 1024,
        ..FetchSettings::default()
    })
    .unwrap();
    let err = fetcher
        .fetch(&format!("{}/big.jpg", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(err.message.contains("too large"));
}

#[tokio::test]
async fn invalid_url_is_a_parse_error() {
    let err = fetcher().fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn connection_refused_is_transient() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = fetcher()
        .fetch(&format!("http://127.0.0.1:{port}/x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransientNetwork);
}
