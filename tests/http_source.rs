// tests/http_source.rs
//
// ClerkHttpSource against a local axum server that behaves like the clerk
// archive: existing rolls are served as text/xml, missing ones as a 200 HTML
// "not found" page.
//
// Covered:
// - HEAD probes (xml = exists, html/404 = absent, 5xx = transport error)
// - GET fetch + decode of a published document
// - request timeout surfaces as a transport error
// - full range ingest over HTTP, output parses back in year-descending order

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::Value as Json;

use rollcall_ingest::ingest::providers::clerk_http::ClerkHttpSource;
use rollcall_ingest::ingest::providers::fixture::sample_vote_xml;
use rollcall_ingest::ingest::{ingest_range, IngestConfig, IngestError, Presence, RecordSource};

const ROLL_031: &str = include_str!("fixtures/roll031.xml");
const NOT_FOUND: &str = include_str!("fixtures/not_found.html");

#[derive(Clone)]
enum Doc {
    Xml(String),
    NotFound,
    ServerError,
    Slow(Duration),
}

#[derive(Clone, Default)]
struct Archive {
    docs: Arc<HashMap<(u16, u32), Doc>>,
    hits: Arc<AtomicUsize>,
}

impl Archive {
    fn new(docs: HashMap<(u16, u32), Doc>) -> Self {
        Self {
            docs: Arc::new(docs),
            hits: Arc::default(),
        }
    }
}

fn xml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

fn html_not_found() -> Response {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        NOT_FOUND,
    )
        .into_response()
}

async fn roll(State(archive): State<Archive>, Path((year, file)): Path<(u16, String)>) -> Response {
    archive.hits.fetch_add(1, Ordering::SeqCst);
    let seq = file
        .strip_prefix("roll")
        .and_then(|s| s.strip_suffix(".xml"))
        .and_then(|s| s.parse::<u32>().ok());
    let Some(seq) = seq else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match archive.docs.get(&(year, seq)).cloned() {
        Some(Doc::Xml(body)) => xml(body),
        Some(Doc::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Some(Doc::ServerError) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Some(Doc::Slow(delay)) => {
            tokio::time::sleep(delay).await;
            xml(sample_vote_xml(year, seq))
        }
        None => html_not_found(),
    }
}

/// Serve `archive` on an ephemeral port; returns the base URL.
async fn serve(archive: Archive) -> String {
    let app = Router::new()
        .route("/evs/{year}/{file}", get(roll))
        .with_state(archive);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/evs")
}

fn cfg(base_url: String) -> IngestConfig {
    IngestConfig {
        base_url,
        max_retries: 1,
        retry_backoff_ms: 0,
        request_timeout_secs: 2,
        ..IngestConfig::default()
    }
    .sanitized()
}

fn votes(year: u16, seqs: impl IntoIterator<Item = u32>) -> Vec<((u16, u32), Doc)> {
    seqs.into_iter()
        .map(|s| ((year, s), Doc::Xml(sample_vote_xml(year, s))))
        .collect()
}

#[tokio::test]
async fn probe_classifies_responses() {
    let mut docs: HashMap<_, _> = votes(2023, [1]).into_iter().collect();
    docs.insert((2023, 2), Doc::NotFound);
    docs.insert((2023, 3), Doc::ServerError);
    let base = serve(Archive::new(docs)).await;
    let src = ClerkHttpSource::from_config(&cfg(base)).expect("client");

    assert_eq!(src.probe(2023, 1).await.unwrap(), Presence::Exists);
    assert_eq!(src.probe(2023, 2).await.unwrap(), Presence::Absent);
    // No entry: the archive answers 200 with an HTML page.
    assert_eq!(src.probe(2023, 9).await.unwrap(), Presence::Absent);

    let err = src.probe(2023, 3).await.unwrap_err();
    assert!(
        matches!(err, IngestError::Transport { .. }),
        "5xx must not read as absent: {err}"
    );
}

#[tokio::test]
async fn fetch_decodes_published_document() {
    let docs = HashMap::from([((2023, 31), Doc::Xml(ROLL_031.to_string()))]);
    let base = serve(Archive::new(docs)).await;
    let src = ClerkHttpSource::from_config(&cfg(base)).expect("client");

    let v = src.fetch(2023, 31).await.expect("fetch roll 31");
    assert_eq!(v.congress(), 118);
    assert_eq!(v.rollcall_number(), 31);
    assert_eq!(v.result(), "Passed");
    assert_eq!(v.action_time(), "2:31 PM");
    assert_eq!(v.totals().overall.yea, 219);
    let parties: Vec<&str> = v.totals().by_party.iter().map(|p| p.party.as_str()).collect();
    assert_eq!(parties, ["Republican", "Democratic", "Independent"]);
}

#[tokio::test]
async fn fetch_of_html_page_is_a_decode_error() {
    let base = serve(Archive::default()).await;
    let src = ClerkHttpSource::from_config(&cfg(base)).expect("client");

    let err = src.fetch(2023, 500).await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::Decode {
            year: 2023,
            sequence: 500,
            ..
        }
    ));
}

#[tokio::test]
async fn slow_response_times_out_as_transport_error() {
    let docs = HashMap::from([((2023, 1), Doc::Slow(Duration::from_secs(5)))]);
    let base = serve(Archive::new(docs)).await;
    let mut c = cfg(base);
    c.request_timeout_secs = 1;
    let src = ClerkHttpSource::from_config(&c).expect("client");

    let err = src.fetch(2023, 1).await.unwrap_err();
    assert!(matches!(err, IngestError::Transport { .. }), "got {err}");
}

#[tokio::test]
async fn range_over_http_writes_years_newest_first() {
    let docs: HashMap<_, _> = votes(2021, 1..=3)
        .into_iter()
        .chain(votes(2022, 1..=5))
        .chain(votes(2023, 1..=2))
        .collect();
    let archive = Archive::new(docs);
    let hits = archive.hits.clone();
    let c = cfg(serve(archive).await);
    let src = ClerkHttpSource::from_config(&c).expect("client");

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("votes.json");
    let summary = ingest_range(&src, 2021, 2023, &out, &c)
        .await
        .expect("range");

    assert!(summary.is_clean(), "{summary:?}");
    assert_eq!(summary.total_written(), 10);
    assert!(hits.load(Ordering::SeqCst) > 10);

    let text = std::fs::read_to_string(&out).unwrap();
    let arr: Vec<Json> = serde_json::from_str(&text).expect("output is a JSON array");
    let keys: Vec<(u64, u64)> = arr
        .iter()
        .map(|v| {
            (
                v["congress"].as_u64().unwrap(),
                v["rollcallNumber"].as_u64().unwrap(),
            )
        })
        .collect();
    // 2023 (118th, 1st) -> 2022 (117th, 2nd) -> 2021 (117th, 1st)
    assert_eq!(
        keys,
        [
            (118, 1),
            (118, 2),
            (117, 1),
            (117, 2),
            (117, 3),
            (117, 4),
            (117, 5),
            (117, 1),
            (117, 2),
            (117, 3),
        ]
    );
    let sessions: Vec<&str> = arr.iter().map(|v| v["session"].as_str().unwrap()).collect();
    assert_eq!(&sessions[..2], ["1st", "1st"]);
    assert_eq!(&sessions[2..7], ["2nd"; 5]);
}
