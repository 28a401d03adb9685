//! Remote extraction against a local HTTP server.

mod common;

use std::io::Write;
use std::sync::Arc;

use common::sample;
use runxar::{FetchConfig, HttpRangeReader, RemoteXar, RetryPolicy, XarArchive, XarError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PKG_PATH: &str = "/Installer.pkg";

/// Serve the archive prefix and one exact range per member.
async fn serve(bytes: &[u8], members: &[(u64, u64)]) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PKG_PATH))
        .and(header("Range", "bytes=0-"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(bytes.to_vec()))
        .mount(&server)
        .await;

    for &(start, len) in members {
        let end = start + len;
        Mock::given(method("GET"))
            .and(path(PKG_PATH))
            .and(header("Range", format!("bytes={}-{}", start, end - 1).as_str()))
            .respond_with(
                ResponseTemplate::new(206)
                    .set_body_bytes(bytes[start as usize..end as usize].to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    server
}

fn remote(server: &MockServer, config: &FetchConfig) -> RemoteXar<HttpRangeReader> {
    let url = format!("{}{}", server.uri(), PKG_PATH);
    let reader = HttpRangeReader::new(url, config).unwrap();
    RemoteXar::new(Arc::new(reader), config.retry.clone())
}

#[tokio::test]
async fn remote_and_local_extraction_agree() {
    let built = sample().build();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&built.bytes).unwrap();
    let local = XarArchive::open_path(file.path()).await.unwrap();

    let ranges: Vec<(u64, u64)> = local
        .entries()
        .iter()
        .filter(|e| e.data_size > 0)
        .map(|e| {
            let loc = local.index().location.member_location(e).unwrap();
            (loc.absolute_offset, loc.length)
        })
        .collect();
    let server = serve(&built.bytes, &ranges).await;

    let config = FetchConfig::default().with_chunk_size(100);
    let remote = remote(&server, &config);
    let index = remote.fetch_toc().await.unwrap();
    assert_eq!(&index, local.index());

    for entry in local.entries() {
        let from_http = remote.extract_with(&index, &entry.name).await.unwrap();
        let from_disk = local.extract(&entry.name).await.unwrap();
        assert_eq!(&from_http[..], &from_disk[..], "{}", entry.name);
    }
}

#[tokio::test]
async fn chunk_size_does_not_change_the_manifest() {
    let built = sample().padding(0).build();
    let server = serve(&built.bytes, &[]).await;

    let mut indexes = Vec::new();
    for chunk_size in [1, 13, 64, 1 << 20] {
        let config = FetchConfig::default().with_chunk_size(chunk_size);
        indexes.push(remote(&server, &config).fetch_toc().await.unwrap());
    }
    assert!(indexes.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(indexes[0].location.start_offset, 28);
}

#[tokio::test]
async fn extract_fetches_toc_then_exact_member_range() {
    let built = sample().build();
    let local = XarArchive::open(Arc::new(runxar::MemorySource::new(built.bytes.clone(), 64)))
        .await
        .unwrap();
    let loc = local.index().locate("Scripts").unwrap();
    let server = serve(&built.bytes, &[(loc.absolute_offset, loc.length)]).await;

    let remote = remote(&server, &FetchConfig::default());
    let scripts = remote.extract("Scripts").await.unwrap();
    assert_eq!(&scripts[..], b"\x1f\x8b\x08\x00compressed scripts");
}

#[tokio::test]
async fn missing_member_is_not_found() {
    let built = sample().build();
    let server = serve(&built.bytes, &[]).await;
    let remote = remote(&server, &FetchConfig::default());
    assert!(matches!(
        remote.extract("Bom").await,
        Err(XarError::MemberNotFound(name)) if name == "Bom"
    ));
}

#[tokio::test]
async fn not_found_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PKG_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = FetchConfig::default().with_retry(RetryPolicy::unbounded());
    assert!(matches!(
        remote(&server, &config).fetch_toc().await,
        Err(XarError::Http { status: 404, .. })
    ));
}

#[tokio::test]
async fn server_ignoring_member_range_is_an_error() {
    let built = sample().build();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PKG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(built.bytes.clone()))
        .mount(&server)
        .await;

    let remote = remote(&server, &FetchConfig::default());
    // A plain 200 is fine for the prefix stream...
    let index = remote.fetch_toc().await.unwrap();
    // ...but not for a member range.
    assert!(matches!(
        remote.extract_with(&index, "Scripts").await,
        Err(XarError::Http { status: 200, .. })
    ));
}

#[tokio::test]
async fn non_xar_resource_is_bad_magic() {
    let server = MockServer::start().await;
    let mut body = b"<!DOCTYPE html><html>".to_vec();
    body.resize(4096, b' ');
    Mock::given(method("GET"))
        .and(path(PKG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(1)
        .mount(&server)
        .await;

    let config = FetchConfig::default().with_retry(RetryPolicy::unbounded());
    assert!(matches!(
        remote(&server, &config).fetch_toc().await,
        Err(XarError::BadMagic(_))
    ));
}

#[tokio::test]
async fn unreachable_host_gives_up_after_ceiling() {
    // Nothing listens on the discard port of localhost in test environments.
    let config = FetchConfig::default().with_retry(RetryPolicy::with_max_attempts(2));
    let reader = HttpRangeReader::new("http://127.0.0.1:9/Installer.pkg".to_string(), &config)
        .unwrap();
    let remote = RemoteXar::new(Arc::new(reader), config.retry.clone());
    assert!(matches!(
        remote.fetch_toc().await,
        Err(XarError::TransportUnavailable(_))
    ));
}

#[tokio::test]
async fn transferred_bytes_are_counted() {
    let built = sample().build();
    let server = serve(&built.bytes, &[]).await;
    let url = format!("{}{}", server.uri(), PKG_PATH);
    let reader = Arc::new(HttpRangeReader::new(url, &FetchConfig::default()).unwrap());
    let remote = RemoteXar::new(reader.clone(), RetryPolicy::default());

    assert_eq!(reader.transferred_bytes(), 0);
    remote.fetch_toc().await.unwrap();
    assert!(reader.transferred_bytes() >= built.toc_end());
}
