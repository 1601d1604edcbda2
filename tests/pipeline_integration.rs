//! End-to-end tests: chunked event stream in, roster graph out.

use bytes::Bytes;
use futures::stream;
use rostergraph::config::Config;
use rostergraph::error::AppError;
use rostergraph::pipeline::{ArtifactStatus, Session};
use rostergraph::stream::read_chunks;

/// Frames `deltas` as an event stream ending in the done sentinel.
fn event_stream(deltas: &[&str]) -> String {
    let mut out = String::new();
    for delta in deltas {
        let payload = serde_json::json!({ "delta": delta });
        out.push_str(&format!("data: {}\n\n", payload));
    }
    out.push_str("data: [DONE]\n\n");
    out
}

/// Splits `text` into byte chunks of `size`.
fn chunked(text: &str, size: usize) -> Vec<std::io::Result<Bytes>> {
    text.as_bytes()
        .chunks(size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

const DELTAS: &[&str] = &[
    "Okay, the user wants a small network.",
    " Agent a1 talks to a2.\n</think>\n\nHere is the roster:\n\n```csv\n",
    "agent_id,name,connections,system_prompt\n",
    "a1,Ada,a2|a3,\"You are Ada, a baker.\"\n",
    "a2,Bo,a1,You are Bo.\n",
    "a3,Cy,,You are Cy.\n",
    "```\n",
];

#[tokio::test]
async fn test_streamed_roster_builds_graph() {
    let text = event_stream(DELTAS);

    for size in [1, 7, 64, text.len()] {
        let mut session = Session::new(&Config::default());
        let mut statuses = Vec::new();
        session
            .run(stream::iter(chunked(&text, size)), |s| statuses.push(s.status()))
            .await
            .unwrap();

        assert!(session.is_complete());
        assert_eq!(statuses.last(), Some(&ArtifactStatus::Ready));
        assert!(statuses.contains(&ArtifactStatus::Missing));

        let graph = session.graph().unwrap();
        assert_eq!(graph.node_ids(), vec!["a1", "a2", "a3"]);
        assert_eq!(graph.stats.edge_count, 2);
        assert_eq!(graph.node("a1").unwrap().label, "Ada");
        assert_eq!(
            graph.node("a1").unwrap().attributes.get("system_prompt").map(String::as_str),
            Some("You are Ada, a baker.")
        );
        assert!(session.split().reasoning.starts_with("Okay"));
    }
}

#[tokio::test]
async fn test_openai_style_payloads() {
    let mut text = String::new();
    for piece in ["</think>id,connections\n", "1,2\n", "2,1\n"] {
        let payload = serde_json::json!({ "choices": [{ "delta": { "content": piece } }] });
        text.push_str(&format!("data: {}\r\n\r\n", payload));
    }
    text.push_str("data: [DONE]\r\n\r\n");

    let mut session = Session::new(&Config::default());
    session
        .run(stream::iter(chunked(&text, 5)), |_| {})
        .await
        .unwrap();
    assert_eq!(session.graph().unwrap().edges.len(), 1);
}

#[tokio::test]
async fn test_nothing_after_done_is_ingested() {
    let mut text = event_stream(&["</think>id,connections\n1,\n"]);
    text.push_str("data: {\"delta\":\"2,\\n\"}\n\n");

    let mut session = Session::new(&Config::default());
    session.run(stream::iter(chunked(&text, 3)), |_| {}).await.unwrap();
    assert_eq!(session.graph().unwrap().nodes.len(), 1);
}

#[tokio::test]
async fn test_error_payload_aborts_stream() {
    let text = "data: {\"delta\":\"</think>id,connections\\n1,\\n\"}\n\n\
                data: {\"error\":{\"message\":\"overloaded\"}}\n\n\
                data: {\"delta\":\"2,\\n\"}\n\n";

    let mut session = Session::new(&Config::default());
    let result = session.run(stream::iter(chunked(text, 16)), |_| {}).await;

    assert!(matches!(result, Err(AppError::Protocol(ref m)) if m == "overloaded"));
    assert!(!session.is_complete());
    assert_eq!(session.graph().unwrap().nodes.len(), 1);
}

#[tokio::test]
async fn test_transport_failure_is_not_final() {
    let head = event_stream(&["</think>id,connections\n1,2\n2,1\n"]);
    let head = &head[..head.find("data: [DONE]").unwrap()];
    let chunks = vec![
        Ok(Bytes::copy_from_slice(head.as_bytes())),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
    ];

    let mut session = Session::new(&Config::default());
    let result = session.run(stream::iter(chunks), |_| {}).await;

    assert!(matches!(result, Err(AppError::Transport(_))));
    let snapshot = session.snapshot();
    assert!(!snapshot.complete);
    assert_eq!(snapshot.graph.unwrap().edges.len(), 1);
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let mut config = Config::default();
    config.stream.timeout_secs = Some(1);
    let mut session = Session::new(&config);

    let result = session.run(stream::pending(), |_| {}).await;
    assert!(matches!(result, Err(AppError::Timeout(1))));
    assert!(!session.is_complete());
}

#[tokio::test]
async fn test_reads_from_async_reader() {
    let text = event_stream(DELTAS);
    let mut session = Session::new(&Config::default());
    session
        .run(read_chunks(text.as_bytes(), 16), |_| {})
        .await
        .unwrap();
    assert_eq!(session.graph().unwrap().nodes.len(), 3);
}

#[test]
fn test_reextraction_is_idempotent() {
    let text: String = DELTAS.concat();
    let mut first = Session::new(&Config::default());
    first.ingest(&text);
    first.mark_complete();
    let mut second = Session::new(&Config::default());
    second.ingest(&text);
    second.mark_complete();

    assert_eq!(first.extraction(), second.extraction());
    assert_eq!(first.graph(), second.graph());
}
