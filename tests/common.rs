#![allow(dead_code)]

use std::time::Duration;

use markwhen_calendar::{Envelope, Transport, ViewClient};
use serde_json::{json, Value};
use tokio::{
    io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf},
    time::timeout,
};

pub const NAMESPACE: &str = "markwhen";

const WAIT: Duration = Duration::from_secs(2);

/// Scripted host on the other end of an in-memory duplex channel.
pub struct FakeHost {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    next_push: usize,
}

impl FakeHost {
    /// Create a client wired to a fresh fake host.
    pub fn pair() -> (ViewClient, Self) {
        let (view_side, host_side) = duplex(64 * 1024);
        let (view_read, view_write) = split(view_side);
        let (host_read, host_write) = split(host_side);
        let client = ViewClient::new(Transport::spawn_lines(NAMESPACE, view_read, view_write));
        let host = Self {
            lines: BufReader::new(host_read).lines(),
            writer: host_write,
            next_push: 0,
        };
        (client, host)
    }

    pub async fn send_raw(&mut self, value: &Value) {
        let line = format!("{value}\n");
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("Failed to write to client");
    }

    pub async fn send(&mut self, envelope: &Envelope) {
        let value = serde_json::to_value(envelope).expect("Failed to encode envelope");
        self.send_raw(&value).await;
    }

    /// Next envelope from the client, failing the test after a short wait.
    pub async fn recv(&mut self) -> Envelope {
        let line = timeout(WAIT, self.lines.next_line())
            .await
            .expect("Timed out waiting for the client")
            .expect("Read failed")
            .expect("Client closed the channel");
        serde_json::from_str(&line).expect("Client sent invalid JSON")
    }

    /// `None` if the client stays silent for a short while.
    pub async fn try_recv(&mut self) -> Option<Envelope> {
        let line = timeout(Duration::from_millis(200), self.lines.next_line())
            .await
            .ok()?
            .ok()??;
        serde_json::from_str(&line).ok()
    }

    pub async fn expect_request(&mut self, kind: &str) -> Envelope {
        let envelope = self.recv().await;
        assert!(envelope.request, "Expected a request, got {envelope:?}");
        assert_eq!(envelope.kind, kind);
        envelope
    }

    /// Answer a client request.
    pub async fn respond(&mut self, request: &Envelope, params: Option<Value>) {
        let response = Envelope::response(&request.kind, request.id.clone(), params);
        self.send(&response).await;
    }

    /// Answer the initial interaction and document pulls with empty responses.
    pub async fn answer_initial_pulls(&mut self) {
        let interaction = self.expect_request("interactionState").await;
        let document = self.expect_request("documentState").await;
        self.respond(&interaction, None).await;
        self.respond(&document, None).await;
    }

    /// Push a state to the client and wait for its acknowledgement.
    pub async fn push(&mut self, kind: &str, params: Value) -> Envelope {
        self.next_push += 1;
        let id = format!("{NAMESPACE}_push{}", self.next_push);
        self.send(&Envelope::request(kind, id.clone(), Some(params)))
            .await;
        let response = self.recv().await;
        assert!(response.response, "Expected a response, got {response:?}");
        assert_eq!(response.id, id);
        response
    }
}

fn event(label: &str, from: &str, to: &str) -> Value {
    json!({
        "kind": "event",
        "dateRangeIso": { "fromDateTimeIso": from, "toDateTimeIso": to },
        "label": label,
        "tags": ["work"]
    })
}

/// Document state whose tree has leaves at `[0]`, `[1,0]` and `[1,1]`.
pub fn three_leaf_document() -> Value {
    json!({
        "rawText": "...",
        "transformedTree": {
            "kind": "group",
            "children": [
                event("Kickoff", "2024-03-01T09:00:00Z", "2024-03-01T10:00:00Z"),
                {
                    "kind": "group",
                    "children": [
                        event("Sprint", "2024-03-04T00:00:00Z", "2024-03-08T00:00:00Z"),
                        event("Review", "2024-03-08T14:00:00Z", "2024-03-08T15:00:00Z")
                    ]
                }
            ]
        }
    })
}
