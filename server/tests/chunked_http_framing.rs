use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use api::descriptor::{LocationKey, LocationKind};
use api::{ObjectDescriptor, ObjectId, CHUNK_SIZE};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::link_store::MemoryLinkStore;
use common::upstream::MockUpstream;
use common::GatewayConfig;
use http_body_util::BodyExt;
use server::http::svc::router;
use server::state::AppState;
use tower::ServiceExt;

const OBJECT_ID: ObjectId = 7;
const HASH: &str = "chunky";

/// A range that starts mid-chunk and ends mid-chunk several chunks later, so
/// the Chunk Generator has to stitch upstream reads from five separate 1 MiB
/// chunk fetches into one contiguous response body.
#[tokio::test]
async fn response_spanning_several_upstream_chunks_is_stitched_without_gaps() {
    let fixture: Vec<u8> = (0u32..).map(|i| (i % 251) as u8).take((6 * CHUNK_SIZE) as usize).collect();
    let upstream = Arc::new(MockUpstream::new());
    upstream.insert(
        ObjectDescriptor::new(
            OBJECT_ID,
            1,
            format!("{HASH}xxxx"),
            fixture.len() as u64,
            "video/mp4".into(),
            "clip.bin".into(),
            LocationKind::Document,
            LocationKey::default(),
        )
        .unwrap(),
        fixture.clone(),
    );
    let state = Arc::new(AppState::new(
        Arc::new(GatewayConfig::for_testing()),
        Arc::new(MemoryLinkStore::new()),
        upstream,
    ));

    let from = CHUNK_SIZE / 2;
    let to = 5 * CHUNK_SIZE + CHUNK_SIZE / 3;

    let req = Request::builder()
        .uri(format!("/{HASH}{OBJECT_ID}"))
        .header(header::RANGE, format!("bytes={from}-{to}"))
        .extension(axum::extract::ConnectInfo(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::new(127, 0, 0, 1),
            9999,
        ))))
        .body(Body::empty())
        .unwrap();

    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);

    let expected_len = to - from + 1;
    assert_eq!(
        resp.headers()[header::CONTENT_LENGTH].to_str().unwrap(),
        expected_len.to_string()
    );

    // A response with a known Content-Length must never also claim chunked
    // transfer encoding.
    assert!(resp.headers().get(header::TRANSFER_ENCODING).is_none());

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.len() as u64, expected_len);
    assert_eq!(&body[..], &fixture[from as usize..=to as usize]);
}
