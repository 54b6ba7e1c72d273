//! Integration test: copy validation against a local S3-style HTTP server,
//! then a resumed run from the written report.

mod common;

use common::object_server::ObjectServer;
use dval_core::checksum::DigestAlgorithm;
use dval_core::compare::Strategy;
use dval_core::config::{HttpConfig, StorageBackend, StorageConfig};
use dval_core::http::HttpClient;
use dval_core::location::S3Location;
use dval_core::report::{read_rows, ReportWriter, Status};
use dval_core::store::{Buckets, ObjectStore};
use dval_core::validators::copy::{
    plan_from_listing, plan_from_previous, validate_copy, CopyRow, CopyWork, PREVIOUS_RUN_NOTE,
};
use tempfile::tempdir;

fn buckets_for(server: &ObjectServer) -> Buckets {
    let storage = StorageConfig {
        backend: StorageBackend::Http,
        endpoint: server.endpoint(),
        root: None,
        token_env: None,
    };
    Buckets::new(&storage, HttpClient::new(&HttpConfig::default())).unwrap()
}

fn seed(server: &ObjectServer) {
    let fifty: Vec<u8> = (0u8..50).collect();
    server.put("src", "run/a.txt", b"alpha", "abc");
    server.put("dst", "run/a.txt", b"alpha", "abc");
    server.put("src", "run/b.txt", &[1u8; 100], "x");
    server.put("dst", "run/b.txt", &[1u8; 200], "y");
    server.put("src", "run/c.txt", &fifty, "p");
    server.put("dst", "run/c.txt", &fifty, "q-2");
    server.put("src", "run/missing.txt", b"lost", "m");
    server.put("src", "other/skip.txt", b"not in prefix", "s");
    // dst needs at least one object so the bucket exists
    server.put("dst", "other/skip.txt", b"not in prefix", "s");
}

#[test]
fn http_store_head_list_and_stream() {
    let server = ObjectServer::start(2);
    seed(&server);
    let mut buckets = buckets_for(&server);
    let src = buckets.get("src").unwrap();

    let info = src.head("run/a.txt").unwrap();
    assert_eq!(info.size, 5);
    assert_eq!(info.tag.as_deref(), Some("abc"));
    assert!(src.head("run/nope.txt").unwrap_err().is_not_found());

    // four objects under "run/" at two per page: two listing requests
    let keys: Vec<String> = src.list("run/").unwrap().into_iter().map(|o| o.key).collect();
    assert_eq!(keys, vec!["run/a.txt", "run/b.txt", "run/c.txt", "run/missing.txt"]);
    let listings = server
        .requests()
        .iter()
        .filter(|r| r.contains("list-type=2"))
        .count();
    assert_eq!(listings, 2);

    let mut body = Vec::new();
    assert_eq!(src.stream("run/a.txt", &mut body).unwrap(), 5);
    assert_eq!(body, b"alpha");
}

#[test]
fn copy_validation_report_then_resume() {
    let server = ObjectServer::start(3);
    seed(&server);
    let out = tempdir().unwrap();
    let report_path = out.path().join("copy-file-validation-1.csv");
    let strategy = Strategy::tiered(DigestAlgorithm::Md5, 8);

    let mut buckets = buckets_for(&server);
    let work = plan_from_listing(&mut buckets, &S3Location::parse("s3://src/run").unwrap(), "dst").unwrap();
    assert_eq!(work.len(), 4);
    let mut report = ReportWriter::<CopyRow>::create(&report_path, b',').unwrap();
    let summary = validate_copy(work, &mut buckets, &strategy, &mut report, 1).unwrap();
    drop(report);

    assert_eq!(summary.progress.processed, 4);
    assert_eq!(summary.progress.succeeded, 2);
    let rows: Vec<CopyRow> = read_rows(&report_path, b',').unwrap();
    let reasons: Vec<(&str, Status, &str)> = rows
        .iter()
        .map(|r| (r.file_name.as_str(), r.result, r.reason.as_str()))
        .collect();
    assert_eq!(reasons[0], ("run/a.txt", Status::Succeeded, "tags match"));
    assert_eq!(reasons[1], ("run/b.txt", Status::Failed, "size mismatch"));
    assert_eq!(reasons[2], ("run/c.txt", Status::Succeeded, "digests match"));
    assert_eq!(reasons[3].1, Status::Failed);
    assert!(reasons[3].2.starts_with("not found"), "{}", reasons[3].2);

    // size mismatch and missing copies never fetched object bodies
    let gets: Vec<String> = server
        .requests()
        .into_iter()
        .filter(|r| r.starts_with("GET") && !r.contains("list-type"))
        .collect();
    assert_eq!(gets, vec!["GET /src/run/c.txt", "GET /dst/run/c.txt"]);

    // fix both failures, then resume from the report
    server.put("dst", "run/b.txt", &[1u8; 100], "x");
    server.put("dst", "run/missing.txt", b"lost", "m");
    let work = plan_from_previous(&report_path).unwrap();
    let replays = work.iter().filter(|w| matches!(w, CopyWork::Replay(_))).count();
    assert_eq!(replays, 2);

    let second_path = out.path().join("copy-file-validation-2.csv");
    let mut buckets = buckets_for(&server);
    let mut report = ReportWriter::<CopyRow>::create(&second_path, b',').unwrap();
    let summary = validate_copy(work, &mut buckets, &strategy, &mut report, 0).unwrap();
    drop(report);

    assert_eq!(summary.progress.succeeded, 4);
    assert!(summary.failed_keys.is_empty());
    let second: Vec<CopyRow> = read_rows(&second_path, b',').unwrap();
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].reason, format!("tags match{}", PREVIOUS_RUN_NOTE));
    assert_eq!(second[1].reason, "tags match");
    assert_eq!(second[1].file_size, 100);
    assert_eq!(second[2].reason, format!("digests match{}", PREVIOUS_RUN_NOTE));
    assert_eq!(second[3].reason, "tags match");
}

#[test]
fn tags_only_comparison_over_http() {
    let server = ObjectServer::start(10);
    seed(&server);
    let mut buckets = buckets_for(&server);
    let work = plan_from_listing(&mut buckets, &S3Location::parse("src").unwrap(), "dst").unwrap();
    let mut report = ReportWriter::<CopyRow, Vec<u8>>::from_writer(Vec::new(), b',').unwrap();
    let summary = validate_copy(work, &mut buckets, &Strategy::tags_only(), &mut report, 0).unwrap();
    assert_eq!(
        summary.failed_keys,
        vec!["run/b.txt", "run/c.txt", "run/missing.txt"]
    );
    assert_eq!(summary.progress.succeeded, 2);
}
