//! Streaming uploads of multi-megabyte files through `/upload`, which spools
//! the body to disk and streams it back.

mod common;

use std::io::Write;

use courier_core::{Payload, TransportKind};
use tempfile::NamedTempFile;

use common::{client, spawn_server};

const FILE_SIZE: usize = 8 * 1024 * 1024 + 123;

fn source_file() -> (NamedTempFile, Vec<u8>) {
    let contents: Vec<u8> = (0..FILE_SIZE)
        .map(|i| ((i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 56) as u8)
        .collect();
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&contents).unwrap();
    file.flush().unwrap();
    (file, contents)
}

#[tokio::test]
async fn file_path_upload_echoes_identical_bytes() {
    let addr = spawn_server();
    let (file, contents) = source_file();
    for kind in [TransportKind::Stream, TransportKind::Buffered] {
        let response = client(kind, addr)
            .upload("/upload", file.path())
            .await
            .unwrap();
        let echoed = response.bytes().expect("opaque body");
        assert_eq!(echoed.len(), contents.len(), "{kind:?}");
        assert!(echoed.as_ref() == contents.as_slice(), "{kind:?}: bytes differ");
    }
}

#[tokio::test]
async fn open_file_upload_echoes_identical_bytes() {
    let addr = spawn_server();
    let (file, contents) = source_file();
    let opened = tokio::fs::File::open(file.path()).await.unwrap();

    let response = client(TransportKind::Stream, addr)
        .upload("/upload", Payload::from(opened))
        .await
        .unwrap();
    assert!(response.bytes().unwrap().as_ref() == contents.as_slice());
}

#[tokio::test]
async fn missing_upload_source_rejects_without_status() {
    let addr = spawn_server();
    let err = client(TransportKind::Stream, addr)
        .upload("/upload", Payload::file("/no/such/file.bin"))
        .await
        .unwrap_err();
    assert!(matches!(err, courier_core::QueryError::Source { .. }));
    assert_eq!(err.status(), None);
}
