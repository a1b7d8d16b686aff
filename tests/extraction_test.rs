//! End-to-end pipeline tests against a real SQLCipher store

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use serde_json::{json, Value};
use signal_history_rust::error::SignalHistoryError;
use signal_history_rust::service::{run_extraction, ExtractionContext};
use signal_history_rust::utils::PathRewriter;
use tempfile::TempDir;

const KEY: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
const OWNER_E164: &str = "+15550001";

fn default_items() -> Vec<Value> {
    let mut items: Vec<Value> = [
        "lastAttemptedToRefreshProfilesAt",
        "lastHeartbeat",
        "lastStartup",
        "nextSignedKeyRotationTime",
        "synced_at",
    ]
    .iter()
    .map(|id| json!({"id": id, "value": 1_609_459_200_000i64}))
    .collect();
    items.push(json!({"id": "accountE164", "value": OWNER_E164}));
    items
}

fn seed_profile(dir: &Path, conversations: &[Value], messages: &[Value], items: &[Value]) {
    fs::create_dir_all(dir.join("sql")).expect("mkdir sql failed");
    fs::create_dir_all(dir.join("logs")).expect("mkdir logs failed");
    fs::write(
        dir.join("config.json"),
        json!({"key": KEY}).to_string(),
    )
    .expect("write config failed");

    let conn = Connection::open(dir.join("sql/db.sqlite")).expect("open store failed");
    conn.execute_batch(&format!("PRAGMA key = \"x'{KEY}'\";"))
        .expect("key store failed");
    conn.execute_batch(
        "CREATE TABLE messages (json TEXT);
         CREATE TABLE conversations (json TEXT);
         CREATE TABLE items (json TEXT);",
    )
    .expect("create tables failed");
    for (table, rows) in [
        ("conversations", conversations),
        ("messages", messages),
        ("items", items),
    ] {
        for row in rows {
            conn.execute(
                &format!("INSERT INTO {table} (json) VALUES (?1)"),
                [row.to_string()],
            )
            .expect("insert failed");
        }
    }
}

fn context(source: &TempDir, output: &TempDir) -> ExtractionContext {
    ExtractionContext {
        source_dir: source.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        rewriter: PathRewriter::new(true),
    }
}

fn read_artifact(output: &TempDir, name: &str) -> Value {
    let content =
        fs::read_to_string(output.path().join(name)).unwrap_or_else(|e| panic!("{name}: {e}"));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("{name}: {e}"))
}

#[tokio::test]
async fn test_full_run_produces_artifact_set() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    let conversations = vec![json!({
        "id": "c1",
        "name": "Alice",
        "e164": "+15550002",
        "type": "private",
        "messageCount": 2,
        "sentMessageCount": 1
    })];
    let messages = vec![json!({
        "type": "incoming",
        "conversationId": "c1",
        "sent_at": 1_609_459_200_000i64,
        "body": "hi"
    })];
    seed_profile(source.path(), &conversations, &messages, &default_items());
    fs::write(
        source.path().join("logs/app.log"),
        "{\"level\": 30}\n",
    )
    .expect("write log failed");

    run_extraction(&context(&source, &output)).await.expect("run failed");

    let contacts = read_artifact(&output, "contacts.json");
    assert_eq!(contacts["c1"][0], "Alice");

    let normalized = read_artifact(&output, "messages.json");
    assert_eq!(normalized[0]["UserInfo"], "Alice");
    assert_eq!(normalized[0]["SentUTC"], "2021-01-01 00:00:00.000000 UTC");

    let convos = read_artifact(&output, "convos.json");
    assert_eq!(convos.as_array().expect("array").len(), 1);
    // Raw passthrough keeps each row as a one-element array of JSON text
    assert!(convos[0][0].as_str().expect("raw text").contains("\"id\":\"c1\""));

    let items = read_artifact(&output, "items.json");
    assert_eq!(items["lastHeartbeat"], "2021-01-01 00:00:00.000000 UTC");
    assert_eq!(items["accountE164"], OWNER_E164);

    let config = read_artifact(&output, "config.json");
    assert_eq!(config["key"], KEY);

    let app_logs = read_artifact(&output, "applogs.json");
    assert_eq!(app_logs, json!([{"level": 30}]));
    assert_eq!(read_artifact(&output, "mainlogs.json"), json!([]));
}

#[tokio::test]
async fn test_owner_contact_gets_self_marker() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    let conversations = vec![json!({
        "id": "c1",
        "name": "Me",
        "e164": OWNER_E164,
        "type": "private",
        "messageCount": 1,
        "sentMessageCount": 1
    })];
    seed_profile(source.path(), &conversations, &[], &default_items());

    run_extraction(&context(&source, &output)).await.expect("run failed");

    let contacts = read_artifact(&output, "contacts.json");
    assert_eq!(contacts["c1"][0], "Me - NOTE TO SELF");
}

#[tokio::test]
async fn test_missing_heartbeat_fails_before_items_written() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    let items: Vec<Value> = default_items()
        .into_iter()
        .filter(|i| i["id"] != "lastHeartbeat")
        .collect();
    seed_profile(source.path(), &[], &[], &items);

    let err = run_extraction(&context(&source, &output)).await.unwrap_err();
    assert!(matches!(
        err,
        SignalHistoryError::MissingRequiredField(ref key) if key == "lastHeartbeat"
    ));
    assert!(!output.path().join("items.json").exists());
    assert!(!output.path().join("contacts.json").exists());
}

#[tokio::test]
async fn test_unresolved_conversation_id_aborts_run() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    let messages = vec![json!({
        "type": "outgoing",
        "conversationId": "ghost",
        "sent_at": 0
    })];
    seed_profile(source.path(), &[], &messages, &default_items());

    let err = run_extraction(&context(&source, &output)).await.unwrap_err();
    assert!(matches!(err, SignalHistoryError::UnresolvedContact(_)));
    assert!(!output.path().join("messages.json").exists());
}

#[tokio::test]
async fn test_rotated_logs_merge_in_order() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    seed_profile(source.path(), &[], &[], &default_items());
    fs::write(source.path().join("logs/app.log.1"), "{\"seq\": 1}\n").expect("write failed");
    fs::write(source.path().join("logs/app.log.2"), "{\"seq\": 2}\n").expect("write failed");

    run_extraction(&context(&source, &output)).await.expect("run failed");

    let app_logs = read_artifact(&output, "applogs.json");
    assert_eq!(app_logs, json!([{"seq": 1}, {"seq": 2}]));
}

#[tokio::test]
async fn test_wrong_key_is_authentication_failure() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    seed_profile(source.path(), &[], &[], &default_items());
    let wrong = KEY.replace('0', "f");
    fs::write(
        source.path().join("config.json"),
        json!({"key": wrong}).to_string(),
    )
    .expect("write config failed");

    let err = run_extraction(&context(&source, &output)).await.unwrap_err();
    assert!(matches!(err, SignalHistoryError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn test_non_hex_key_is_configuration_missing() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    seed_profile(source.path(), &[], &[], &default_items());
    fs::write(
        source.path().join("config.json"),
        json!({"key": "not-a-hex-key"}).to_string(),
    )
    .expect("write config failed");

    let err = run_extraction(&context(&source, &output)).await.unwrap_err();
    assert!(matches!(err, SignalHistoryError::ConfigurationMissing { .. }));
}

#[tokio::test]
async fn test_key_with_quote_never_reaches_the_store() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    seed_profile(source.path(), &[], &[], &default_items());
    // A quote would terminate the x'..' literal in PRAGMA key; the shape
    // check must reject it before any SQL is built
    fs::write(
        source.path().join("config.json"),
        json!({"key": "00'\";ATTACH DATABASE 'x' AS x;--"}).to_string(),
    )
    .expect("write config failed");

    let err = run_extraction(&context(&source, &output)).await.unwrap_err();
    assert!(matches!(err, SignalHistoryError::ConfigurationMissing { .. }));
}

#[tokio::test]
async fn test_missing_config_is_configuration_missing() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    seed_profile(source.path(), &[], &[], &default_items());
    fs::remove_file(source.path().join("config.json")).expect("remove failed");

    let err = run_extraction(&context(&source, &output)).await.unwrap_err();
    assert!(matches!(err, SignalHistoryError::ConfigurationMissing { .. }));
}

#[tokio::test]
async fn test_missing_store_is_store_unavailable() {
    let source = tempfile::tempdir().expect("tempdir failed");
    let output = tempfile::tempdir().expect("tempdir failed");
    seed_profile(source.path(), &[], &[], &default_items());
    fs::remove_file(source.path().join("sql/db.sqlite")).expect("remove failed");

    let err = run_extraction(&context(&source, &output)).await.unwrap_err();
    assert!(matches!(err, SignalHistoryError::StoreUnavailable { .. }));
}
