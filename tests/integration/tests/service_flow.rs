//! Integration test: issuance and verification services over real sockets.

use serde_json::json;
use std::sync::Arc;

use kubecred_integration_tests::{
    hash_of, open_sqlite, post_json, spawn_issuance, spawn_pair, spawn_verification, temp_dir,
};
use kubecred_store::{CredentialStore, MemoryStore, VerificationLog};

// =========================================================================
// Issue then verify
// =========================================================================

#[tokio::test]
async fn test_issue_then_verify() {
    let pair = spawn_pair().await;

    let (status, issued) = post_json(
        format!("{}/issue", pair.issuance.base_url),
        json!({"credential": "MyS3cur3P@ssw0rd!"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(issued["worker_id"], "W1");
    assert_eq!(issued["credential_hash"], hash_of("MyS3cur3P@ssw0rd!"));

    let (status, verdict) = post_json(
        format!("{}/verify", pair.verification.base_url),
        json!({"credential": "MyS3cur3P@ssw0rd!"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(verdict["isValid"], true);
    assert_eq!(verdict["issuedBy"], "W1");
    assert_eq!(verdict["issuedAt"], issued["issued_at"]);

    let (status, verdict) = post_json(
        format!("{}/verify", pair.verification.base_url),
        json!({"credential": "WrongPass!"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(verdict["isValid"], false);
    assert_eq!(verdict["message"], "credential not found - verified by V1");

    assert_eq!(pair.log.entry_count().unwrap(), 2);
}

#[tokio::test]
async fn test_issued_at_stable_on_sqlite() {
    let dir = temp_dir("issued-at");
    let issuance = spawn_issuance("W1", open_sqlite(&dir.join("issuance.db"))).await;
    let verification = spawn_verification(
        "V1",
        kubecred_integration_tests::SECRET,
        &issuance.base_url,
        Arc::new(MemoryStore::new()),
    )
    .await;

    let (status, issued) = post_json(
        format!("{}/issue", issuance.base_url),
        json!({"credential": "MyS3cur3P@ssw0rd!"}),
    )
    .await;
    assert_eq!(status, 200);

    let (_, checked) = post_json(
        format!("{}/check", issuance.base_url),
        json!({"credential_hash": issued["credential_hash"]}),
    )
    .await;
    let (_, verdict) = post_json(
        format!("{}/verify", verification.base_url),
        json!({"credential": "MyS3cur3P@ssw0rd!"}),
    )
    .await;

    assert!(issued["issued_at"].is_string());
    assert_eq!(checked["issued_at"], issued["issued_at"]);
    assert_eq!(verdict["issuedAt"], issued["issued_at"]);

    verification.stop().await;
    issuance.stop().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_second_issue_rejected() {
    let pair = spawn_pair().await;
    let url = format!("{}/issue", pair.issuance.base_url);

    let (first, _) = post_json(url.clone(), json!({"credential": "once"})).await;
    let (second, body) = post_json(url, json!({"credential": "once"})).await;
    assert_eq!(first, 200);
    assert_eq!(second, 400);
    assert_eq!(body["message"], "credential already issued");
}

// =========================================================================
// Verification log
// =========================================================================

#[tokio::test]
async fn test_history_records_every_attempt() {
    let pair = spawn_pair().await;
    post_json(
        format!("{}/issue", pair.issuance.base_url),
        json!({"credential": "audited"}),
    )
    .await;

    for _ in 0..3 {
        post_json(
            format!("{}/verify", pair.verification.base_url),
            json!({"credential": "audited"}),
        )
        .await;
    }

    let hash = hash_of("audited");
    let body: serde_json::Value = reqwest::get(format!(
        "{}/history/{}",
        pair.verification.base_url, hash
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e["is_valid"] == true));
    assert!(entries.iter().all(|e| e["verified_by"] == "V1"));
}

#[tokio::test]
async fn test_malformed_verify_writes_nothing() {
    let pair = spawn_pair().await;
    let url = format!("{}/verify", pair.verification.base_url);

    for payload in [json!({}), json!({"credential": ""}), json!({"credential": [1]})] {
        let (status, body) = post_json(url.clone(), payload).await;
        assert_eq!(status, 400);
        assert_eq!(body["message"], "invalid credential format");
    }
    assert_eq!(pair.log.entry_count().unwrap(), 0);
}

// =========================================================================
// Peer failure
// =========================================================================

#[tokio::test]
async fn test_issuance_down_is_server_error() {
    let pair = spawn_pair().await;
    pair.issuance.stop().await;

    let (status, body) = post_json(
        format!("{}/verify", pair.verification.base_url),
        json!({"credential": "MyS3cur3P@ssw0rd!"}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["isValid"], false);
    assert_eq!(body["message"], "verification error by V1");

    // An unanswered check must not show up as a recorded negative.
    assert_eq!(pair.log.entry_count().unwrap(), 0);
}

#[tokio::test]
async fn test_mismatched_secret_never_validates() {
    let issuance = spawn_issuance("W1", Arc::new(MemoryStore::new())).await;
    let verification = spawn_verification(
        "V1",
        "some-other-secret",
        &issuance.base_url,
        Arc::new(MemoryStore::new()),
    )
    .await;

    post_json(
        format!("{}/issue", issuance.base_url),
        json!({"credential": "shared"}),
    )
    .await;
    let (status, verdict) = post_json(
        format!("{}/verify", verification.base_url),
        json!({"credential": "shared"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(verdict["isValid"], false);
}

// =========================================================================
// Uniqueness under concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issue_single_winner() {
    let pair = spawn_pair().await;
    let url = format!("{}/issue", pair.issuance.base_url);

    let mut handles = Vec::new();
    for _ in 0..24 {
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            post_json(url, json!({"credential": "contended"})).await.0
        }));
    }

    let mut ok = 0;
    let mut rejected = 0;
    for h in handles {
        match h.await.unwrap() {
            200 => ok += 1,
            400 => rejected += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(rejected, 23);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_workers_share_sqlite_file() {
    let dir = temp_dir("shared");
    let db = dir.join("issuance.db");
    let store_a = open_sqlite(&db);
    let store_b = open_sqlite(&db);
    let worker_a = spawn_issuance("W-A", store_a.clone()).await;
    let worker_b = spawn_issuance("W-B", store_b).await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let base = if i % 2 == 0 {
            worker_a.base_url.clone()
        } else {
            worker_b.base_url.clone()
        };
        handles.push(tokio::spawn(async move {
            post_json(format!("{}/issue", base), json!({"credential": "one-of-many"}))
                .await
                .0
        }));
    }
    let mut winners = 0;
    for h in handles {
        if h.await.unwrap() == 200 {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(store_a.record_count().unwrap(), 1);

    // Either worker answers the check with the winner's attribution.
    let (_, on_a) = post_json(
        format!("{}/check", worker_a.base_url),
        json!({"credential_hash": hash_of("one-of-many")}),
    )
    .await;
    let (_, on_b) = post_json(
        format!("{}/check", worker_b.base_url),
        json!({"credential_hash": hash_of("one-of-many")}),
    )
    .await;
    assert_eq!(on_a["exists"], true);
    assert_eq!(on_a, on_b);

    worker_a.stop().await;
    worker_b.stop().await;
    std::fs::remove_dir_all(&dir).ok();
}
