use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use api::descriptor::{LocationKey, LocationKind};
use api::link::{LinkDisplay, LinkRecord, Token};
use api::{ObjectDescriptor, ObjectId};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::link_store::MemoryLinkStore;
use common::upstream::MockUpstream;
use common::GatewayConfig;
use http_body_util::BodyExt;
use server::http::svc::router;
use server::state::AppState;
use tower::ServiceExt;

fn descriptor(object_id: ObjectId, size: u64) -> ObjectDescriptor {
    ObjectDescriptor::new(
        object_id,
        1,
        "abcdefGHIJ".into(),
        size,
        "video/mp4".into(),
        "clip.mp4".into(),
        LocationKind::Document,
        LocationKey::default(),
    )
    .unwrap()
}

fn peer() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 9999))
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .extension(axum::extract::ConnectInfo(peer()))
        .body(Body::empty())
        .unwrap()
}

async fn state_with_object(object_id: ObjectId, bytes: Vec<u8>) -> Arc<AppState> {
    let upstream = Arc::new(MockUpstream::new());
    upstream.insert(descriptor(object_id, bytes.len() as u64), bytes);
    Arc::new(AppState::new(
        Arc::new(GatewayConfig::for_testing()),
        Arc::new(MemoryLinkStore::new()),
        upstream,
    ))
}

#[tokio::test]
async fn liveness_reports_ok() {
    let state = state_with_object(1, b"hello".to_vec()).await;
    let resp = router(state).oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("\"service\""));
}

#[tokio::test]
async fn robots_txt_disallows_everything() {
    let state = state_with_object(1, b"hello".to_vec()).await;
    let resp = router(state).oneshot(get("/robots.txt")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("Disallow: /"));
}

#[tokio::test]
async fn unmapped_path_falls_through_to_not_found() {
    let state = state_with_object(1, b"hello".to_vec()).await;
    let resp = router(state).oneshot(get("/this/does/not/exist/at/all")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn prepare_renders_the_display_file_name() {
    let state = state_with_object(2, b"hello".to_vec()).await;
    let token = Token::generate();
    state
        .link_store
        .put(LinkRecord {
            token: token.clone(),
            object_id: 2,
            display: LinkDisplay {
                file_name: "vacation.mp4".into(),
                ..Default::default()
            },
            domain_tag: None,
            thumbnail_url: None,
            created_at: 0,
        })
        .await
        .unwrap();

    let path = format!("/prepare/{token}");
    let resp = router(state).oneshot(get(&path)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("vacation.mp4"));
}

#[tokio::test]
async fn watch_embeds_a_compact_stream_url() {
    let state = state_with_object(3, b"hello".to_vec()).await;
    let token = Token::generate();
    state
        .link_store
        .put(LinkRecord {
            token: token.clone(),
            object_id: 3,
            display: LinkDisplay::default(),
            domain_tag: None,
            thumbnail_url: None,
            created_at: 0,
        })
        .await
        .unwrap();

    let path = format!("/watch/{token}");
    let resp = router(state).oneshot(get(&path)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("<video"));
}

#[tokio::test]
async fn split_form_with_bare_id_and_query_hash_streams_the_object() {
    let state = state_with_object(4, b"0123456789".to_vec()).await;
    let resp = router(state)
        .oneshot(get("/4?hash=abcdef"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"0123456789");
}

#[tokio::test]
async fn split_form_with_bare_id_and_wrong_hash_is_forbidden() {
    let state = state_with_object(5, b"0123456789".to_vec()).await;
    let resp = router(state).oneshot(get("/5?hash=WRONGHASH")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn oversized_object_is_rejected_with_413() {
    let upstream = Arc::new(MockUpstream::new());
    let huge = descriptor(6, api::MAX_OBJECT_SIZE + 1);
    upstream.insert(huge, Vec::new());
    let state = Arc::new(AppState::new(
        Arc::new(GatewayConfig::for_testing()),
        Arc::new(MemoryLinkStore::new()),
        upstream,
    ));

    let resp = router(state).oneshot(get("/abcdef6")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
