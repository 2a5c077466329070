use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use super::rest::{apply_delta, decode_tracks, is_valid_key, node_url};
use super::*;

fn draft(title: &str, artist: &str) -> NewTrack {
    NewTrack {
        title: title.into(),
        artist: artist.into(),
        audio_url: format!("https://files.example/{title}.mp3"),
        uploader_id: "user_1".into(),
        ..NewTrack::default()
    }
}

#[tokio::test]
async fn create_assigns_unique_ids_and_zero_counters() {
    let store = MemoryStore::new();
    let a = store.create_track(draft("a", "x")).await.unwrap();
    let b = store.create_track(draft("b", "y")).await.unwrap();
    assert_ne!(a.id, b.id);
    assert!(!a.id.is_empty());
    assert_eq!((a.plays, a.likes), (0, 0));
    assert!(a.timestamp > 0);
    assert_eq!(store.list_tracks().await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_store_lists_nothing_and_unknown_id_is_absent() {
    let store = MemoryStore::new();
    assert!(store.list_tracks().await.unwrap().is_empty());
    assert_eq!(store.get_track("nope").await.unwrap(), None);
}

#[tokio::test]
async fn increment_plays_adds_one_and_ignores_unknown_tracks() {
    let store = MemoryStore::new();
    let t = store.create_track(draft("a", "x")).await.unwrap();
    store.increment_plays(&t.id).await.unwrap();
    store.increment_plays(&t.id).await.unwrap();
    store.increment_plays("missing").await.unwrap();
    assert_eq!(store.get_track(&t.id).await.unwrap().unwrap().plays, 2);
    assert_eq!(store.list_tracks().await.unwrap().len(), 1);
}

#[tokio::test]
async fn toggle_like_twice_restores_counter() {
    let store = MemoryStore::new();
    let t = store.create_track(draft("a", "x")).await.unwrap();

    assert!(store.toggle_like(&t.id, "u1").await.unwrap());
    assert!(store.check_like(&t.id, "u1").await.unwrap());
    assert_eq!(store.get_track(&t.id).await.unwrap().unwrap().likes, 1);

    assert!(!store.toggle_like(&t.id, "u1").await.unwrap());
    assert!(!store.check_like(&t.id, "u1").await.unwrap());
    assert_eq!(store.get_track(&t.id).await.unwrap().unwrap().likes, 0);
}

#[tokio::test]
async fn likes_are_partitioned_by_user() {
    let store = MemoryStore::new();
    let t = store.create_track(draft("a", "x")).await.unwrap();
    store.toggle_like(&t.id, "u1").await.unwrap();
    store.toggle_like(&t.id, "u2").await.unwrap();
    assert_eq!(store.get_track(&t.id).await.unwrap().unwrap().likes, 2);
    assert!(!store.check_like(&t.id, "u3").await.unwrap());
}

#[tokio::test]
async fn toggle_like_on_missing_track_is_false_and_records_nothing() {
    let store = MemoryStore::new();
    assert!(!store.toggle_like("ghost", "u").await.unwrap());
    assert!(!store.check_like("ghost", "u").await.unwrap());
}

#[tokio::test]
async fn search_matches_title_or_artist_case_insensitively() {
    let store = MemoryStore::new();
    store.create_track(draft("Ocean Eyes", "Billie")).await.unwrap();
    store.create_track(draft("Sunrise", "Ocean Band")).await.unwrap();
    store.create_track(draft("Other", "Else")).await.unwrap();
    let found = store.search_tracks("OCEAN").await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn offline_store_reports_unavailable() {
    let store = MemoryStore::offline();
    assert!(matches!(
        store.list_tracks().await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(store.create_track(draft("a", "b")).await.is_err());
}

#[tokio::test]
async fn demo_store_has_two_tracks() {
    let store = Backend::Local(MemoryStore::demo());
    let tracks = store.list_tracks().await.unwrap();
    let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["demo-1", "demo-2"]);
    assert_eq!(store.describe(), "local demo catalogue");
}

#[test]
fn node_url_joins_base_and_path() {
    assert_eq!(
        node_url("https://db.example.com/", "tracks"),
        "https://db.example.com/tracks.json"
    );
    assert_eq!(
        node_url("https://db.example.com", "/likes/t1/u1/"),
        "https://db.example.com/likes/t1/u1.json"
    );
}

#[test]
fn invalid_keys_are_rejected() {
    assert!(is_valid_key("-NxYz_09"));
    assert!(is_valid_key("user_1700000000000_k3j2h1g0f"));
    assert!(!is_valid_key(""));
    assert!(!is_valid_key("a/b"));
    assert!(!is_valid_key("a.b"));
    assert!(!is_valid_key("$a"));
    assert!(!is_valid_key("a[0]"));
    assert!(!is_valid_key("a#b"));
}

#[test]
fn apply_delta_floors_at_zero_and_tolerates_legacy_values() {
    assert_eq!(apply_delta(&json!(3), 1), 4);
    assert_eq!(apply_delta(&json!(3), -1), 2);
    assert_eq!(apply_delta(&json!(0), -1), 0);
    assert_eq!(apply_delta(&json!(-4), -1), 0);
    assert_eq!(apply_delta(&json!(-4), 1), 1);
    assert_eq!(apply_delta(&json!(2.7), 1), 3);
    assert_eq!(apply_delta(&serde_json::Value::Null, 1), 1);
}

#[test]
fn decode_tracks_uses_keys_as_ids_and_sorts_newest_first() {
    let mut node = BTreeMap::new();
    node.insert(
        "-Nold".to_string(),
        json!({"id": "stale", "title": "Old", "artist": "A", "timestamp": 100}),
    );
    node.insert(
        "-Nnew".to_string(),
        json!({"title": "New", "artist": "B", "timestamp": 200, "plays": 3}),
    );
    node.insert("-Nbad".to_string(), json!("not a record"));

    let tracks = decode_tracks(Some(node));
    let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["-Nnew", "-Nold"]);
    assert_eq!(tracks[0].plays, 3);
}

#[test]
fn decode_tracks_of_empty_database_is_empty() {
    assert!(decode_tracks(None).is_empty());
}

#[test]
fn rest_store_normalizes_base_url_and_blank_auth() {
    let store = RestStore::new(
        " https://db.example.com/ ",
        Some("  ".into()),
        Duration::from_secs(5),
    )
    .unwrap();
    assert_eq!(store.base_url(), "https://db.example.com");
    let backend = Backend::Remote(store);
    assert_eq!(backend.describe(), "remote database at https://db.example.com");
}

/// One canned answer from the fake database.
struct Reply {
    status: &'static str,
    etag: Option<&'static str>,
    body: &'static str,
}

fn ok(body: &'static str) -> Reply {
    Reply {
        status: "200 OK",
        etag: None,
        body,
    }
}

fn tagged(etag: &'static str, body: &'static str) -> Reply {
    Reply {
        etag: Some(etag),
        ..ok(body)
    }
}

fn precondition_failed() -> Reply {
    Reply {
        status: "412 Precondition Failed",
        etag: None,
        body: r#"{"error":"etag mismatch"}"#,
    }
}

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    /// Path and query, e.g. `/tracks/t1.json?shallow=true`.
    target: String,
    head: String,
    body: String,
}

impl Seen {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case(name).then(|| v.trim().to_string())
        })
    }
}

/// Serve `script` in order, one connection per request, recording what each
/// request looked like.
fn scripted_database(script: Vec<Reply>) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    std::thread::spawn(move || {
        for reply in script {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            let request = read_request(&mut stream);
            log.lock().unwrap().push(request);

            let etag = reply
                .etag
                .map(|e| format!("etag: {e}\r\n"))
                .unwrap_or_default();
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\n{etag}content-length: {}\r\nconnection: close\r\n\r\n{}",
                reply.status,
                reply.body.len(),
                reply.body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });
    (origin, seen)
}

fn read_request(stream: &mut impl Read) -> Seen {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    let end = loop {
        let n = stream.read(&mut buf).unwrap();
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw).into_owned();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= end + 4 + length || n == 0 {
                break end;
            }
        } else if n == 0 {
            panic!("connection closed before the request head ended");
        }
    };
    let text = String::from_utf8_lossy(&raw).into_owned();
    let head = text[..end].to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split(' ');
    Seen {
        method: request_line.next().unwrap_or_default().to_string(),
        target: request_line.next().unwrap_or_default().to_string(),
        body: text[end + 4..].to_string(),
        head,
    }
}

fn rest_store(origin: &str, auth: Option<&str>) -> RestStore {
    RestStore::new(origin, auth.map(String::from), Duration::from_secs(5)).unwrap()
}

fn requests(seen: &Arc<Mutex<Vec<Seen>>>) -> Vec<(String, String)> {
    seen.lock()
        .unwrap()
        .iter()
        .map(|s| (s.method.clone(), s.target.clone()))
        .collect()
}

fn req(method: &str, target: &str) -> (String, String) {
    (method.to_string(), target.to_string())
}

#[tokio::test]
async fn rest_like_writes_the_node_then_bumps_the_counter() {
    let (origin, seen) = scripted_database(vec![
        ok("true"),
        ok("null"),
        ok("true"),
        tagged("\"e1\"", "2"),
        ok("3"),
    ]);
    let store = rest_store(&origin, None);

    assert!(store.toggle_like("t1", "u1").await.unwrap());

    assert_eq!(
        requests(&seen),
        vec![
            req("GET", "/tracks/t1.json?shallow=true"),
            req("GET", "/likes/t1/u1.json?shallow=true"),
            req("PUT", "/likes/t1/u1.json"),
            req("GET", "/tracks/t1/likes.json"),
            req("PUT", "/tracks/t1/likes.json"),
        ]
    );
    let seen = seen.lock().unwrap();
    assert_eq!(seen[2].json(), json!(true));
    assert_eq!(seen[3].header("x-firebase-etag").as_deref(), Some("true"));
    assert_eq!(seen[4].header("if-match").as_deref(), Some("\"e1\""));
    assert_eq!(seen[4].json(), json!(3));
}

#[tokio::test]
async fn rest_unlike_deletes_the_node_and_floors_the_counter() {
    let (origin, seen) = scripted_database(vec![
        ok("true"),
        ok("true"),
        ok("null"),
        tagged("\"e1\"", "0"),
        ok("0"),
    ]);
    let store = rest_store(&origin, None);

    assert!(!store.toggle_like("t1", "u1").await.unwrap());

    let calls = requests(&seen);
    assert_eq!(calls[2], req("DELETE", "/likes/t1/u1.json"));
    assert_eq!(seen.lock().unwrap()[4].json(), json!(0));
}

#[tokio::test]
async fn rest_like_on_a_missing_track_writes_nothing() {
    let (origin, seen) = scripted_database(vec![ok("null")]);
    let store = rest_store(&origin, None);

    assert!(!store.toggle_like("gone", "u1").await.unwrap());
    assert_eq!(requests(&seen), vec![req("GET", "/tracks/gone.json?shallow=true")]);
}

#[tokio::test]
async fn rest_counter_write_rereads_after_a_lost_race() {
    let (origin, seen) = scripted_database(vec![
        ok("true"),
        ok("null"),
        ok("true"),
        tagged("\"e1\"", "0"),
        precondition_failed(),
        tagged("\"e2\"", "4"),
        ok("5"),
    ]);
    let store = rest_store(&origin, None);

    assert!(store.toggle_like("t1", "u1").await.unwrap());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 7);
    assert_eq!(seen[6].header("if-match").as_deref(), Some("\"e2\""));
    assert_eq!(seen[6].json(), json!(5));
}

#[tokio::test]
async fn rest_like_is_undone_when_the_counter_keeps_conflicting() {
    let mut script = vec![ok("true"), ok("null"), ok("true")];
    for _ in 0..5 {
        script.push(tagged("\"e\"", "1"));
        script.push(precondition_failed());
    }
    script.push(ok("null"));
    let (origin, seen) = scripted_database(script);
    let store = rest_store(&origin, None);

    let err = store.toggle_like("t1", "u1").await.unwrap_err();

    assert!(matches!(err, StoreError::Conflict(ref path) if path == "tracks/t1/likes"));
    let calls = requests(&seen);
    assert_eq!(calls.len(), 14);
    assert_eq!(calls[2], req("PUT", "/likes/t1/u1.json"));
    assert_eq!(calls[13], req("DELETE", "/likes/t1/u1.json"));
}

#[tokio::test]
async fn rest_unlike_is_undone_when_the_counter_cannot_be_read() {
    let (origin, seen) = scripted_database(vec![
        ok("true"),
        ok("true"),
        ok("null"),
        Reply {
            status: "503 Service Unavailable",
            etag: None,
            body: "{}",
        },
        ok("true"),
    ]);
    let store = rest_store(&origin, None);

    let err = store.toggle_like("t1", "u1").await.unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
    let calls = requests(&seen);
    assert_eq!(calls[2], req("DELETE", "/likes/t1/u1.json"));
    assert_eq!(calls[4], req("PUT", "/likes/t1/u1.json"));
    assert_eq!(seen.lock().unwrap()[4].json(), json!(true));
}

#[tokio::test]
async fn rest_play_is_a_server_side_increment() {
    let (origin, seen) = scripted_database(vec![ok("true"), ok("{}")]);
    let store = rest_store(&origin, None);

    store.increment_plays("t1").await.unwrap();

    assert_eq!(
        requests(&seen),
        vec![
            req("GET", "/tracks/t1.json?shallow=true"),
            req("PATCH", "/tracks/t1.json"),
        ]
    );
    assert_eq!(
        seen.lock().unwrap()[1].json(),
        json!({ "plays": { ".sv": { "increment": 1 } } })
    );
}

#[tokio::test]
async fn rest_play_of_a_missing_track_is_a_no_op() {
    let (origin, seen) = scripted_database(vec![ok("null")]);
    let store = rest_store(&origin, None);

    store.increment_plays("gone").await.unwrap();
    assert_eq!(requests(&seen).len(), 1);
}

#[tokio::test]
async fn rest_create_posts_then_stores_the_pushed_id() {
    let (origin, seen) = scripted_database(vec![
        ok(r#"{"name":"-Nnew"}"#),
        ok(r#"{"id":"-Nnew"}"#),
    ]);
    let store = rest_store(&origin, None);

    let track = store.create_track(draft("Tide", "Mira")).await.unwrap();

    assert_eq!(track.id, "-Nnew");
    assert_eq!((track.plays, track.likes), (0, 0));
    assert_eq!(
        requests(&seen),
        vec![req("POST", "/tracks.json"), req("PATCH", "/tracks/-Nnew.json")]
    );
    let seen = seen.lock().unwrap();
    let posted = seen[0].json();
    assert_eq!(posted["title"], json!("Tide"));
    assert!(posted.get("id").is_none());
    assert_eq!(seen[1].json(), json!({ "id": "-Nnew" }));
}

#[tokio::test]
async fn rest_lists_newest_first_and_sends_the_auth_token() {
    let (origin, seen) = scripted_database(vec![ok(
        r#"{"k1":{"title":"Old","artist":"A","audioUrl":"u1","timestamp":1},
            "k2":{"title":"New","artist":"B","audioUrl":"u2","timestamp":2}}"#,
    )]);
    let store = rest_store(&origin, Some("tok"));

    let tracks = store.list_tracks().await.unwrap();

    let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["k2", "k1"]);
    assert_eq!(requests(&seen), vec![req("GET", "/tracks.json?auth=tok")]);
}

#[tokio::test]
async fn rest_error_status_is_unavailable() {
    let (origin, _) = scripted_database(vec![Reply {
        status: "401 Unauthorized",
        etag: None,
        body: r#"{"error":"Permission denied"}"#,
    }]);
    let store = rest_store(&origin, None);

    let err = store.list_tracks().await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(ref msg) if msg.contains("401")));
}
