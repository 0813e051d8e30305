//! Classifier outcome mapping against canned HTTP responses
//!
//! A throwaway TCP listener plays the document host / model API so the
//! status, header and body handling can be checked without the network.

use docsieve_classifiers::config::{HttpSettings, LlmSettings};
use docsieve_classifiers::{Classifier, DocumentScanner, KeywordMatcher, LlmClassifier, LlmProvider};
use docsieve_core::{AttemptOutcome, Item, TransientKind, Verdict};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Canned {
    status: &'static str,
    headers: &'static [(&'static str, &'static str)],
    body: &'static [u8],
}

fn route(path: &str) -> Canned {
    match path {
        "/missing.pdf" => Canned {
            status: "404 Not Found",
            headers: &[("Content-Type", "text/html")],
            body: b"<h1>nope</h1>",
        },
        "/busy.pdf" => Canned {
            status: "429 Too Many Requests",
            headers: &[("Retry-After", "7")],
            body: b"slow down",
        },
        "/down.pdf" => Canned {
            status: "503 Service Unavailable",
            headers: &[],
            body: b"maintenance",
        },
        "/notes.txt" => Canned {
            status: "200 OK",
            headers: &[("Content-Type", "text/plain")],
            body: b"Salary review 2024\nCONFIDENTIAL - do not forward",
        },
        "/blank.txt" => Canned {
            status: "200 OK",
            headers: &[("Content-Type", "text/plain")],
            body: b"   \n",
        },
        "/bundle" => Canned {
            status: "200 OK",
            headers: &[("Content-Type", "application/zip")],
            body: b"PK\x03\x04",
        },
        "/v1/chat/completions" => Canned {
            status: "200 OK",
            headers: &[("Content-Type", "application/json")],
            body: br#"{"choices":[{"index":0,"message":{"role":"assistant","content":"SENSITIVE"},"finish_reason":"stop"}]}"#,
        },
        "/limited/chat/completions" => Canned {
            status: "429 Too Many Requests",
            headers: &[("Content-Type", "application/json")],
            body: br#"{"error":{"message":"Rate limit reached for gpt-4o-mini. Please try again in 20s."}}"#,
        },
        _ => Canned {
            status: "500 Internal Server Error",
            headers: &[],
            body: b"unexpected path",
        },
    }
}

async fn serve(mut stream: TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    // Drain the request body so closing the socket doesn't reset the client
    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let canned = route(&path);
    let mut response = format!("HTTP/1.1 {}\r\n", canned.status);
    for (name, value) in canned.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        canned.body.len()
    ));

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.write_all(canned.body).await;
    let _ = stream.shutdown().await;
}

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream));
        }
    });
    addr
}

fn scanner() -> DocumentScanner {
    let matcher = Arc::new(KeywordMatcher::with_defaults().unwrap());
    DocumentScanner::new(matcher, &HttpSettings::default()).unwrap()
}

fn item(addr: SocketAddr, path: &str) -> Item {
    Item::new(format!("http://{}{}", addr, path))
}

#[tokio::test]
async fn test_document_not_found_is_fatal() {
    let addr = start_server().await;
    let outcome = scanner().classify(&item(addr, "/missing.pdf")).await;
    assert_eq!(outcome, AttemptOutcome::FatalFailure("not found (404)".to_string()));
}

#[tokio::test]
async fn test_document_rate_limit_carries_retry_after() {
    let addr = start_server().await;
    match scanner().classify(&item(addr, "/busy.pdf")).await {
        AttemptOutcome::TransientFailure(t) => {
            assert_eq!(t.kind, TransientKind::RateLimited);
            assert_eq!(t.suggested_delay, Some(Duration::from_secs(7)));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_document_server_error_is_transient() {
    let addr = start_server().await;
    match scanner().classify(&item(addr, "/down.pdf")).await {
        AttemptOutcome::TransientFailure(t) => {
            assert_eq!(t.kind, TransientKind::Unavailable);
            assert_eq!(t.suggested_delay, None);
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_text_document_flagged() {
    let addr = start_server().await;
    match scanner().classify(&item(addr, "/notes.txt")).await {
        AttemptOutcome::Success(Verdict::Flagged(evidence)) => {
            assert_eq!(evidence.joined(), "confidential, salary");
        }
        other => panic!("expected flagged, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_document_indeterminate() {
    let addr = start_server().await;
    let outcome = scanner().classify(&item(addr, "/blank.txt")).await;
    assert_eq!(outcome, AttemptOutcome::Success(Verdict::Indeterminate));
}

#[tokio::test]
async fn test_unsupported_document_is_fatal() {
    let addr = start_server().await;
    match scanner().classify(&item(addr, "/bundle")).await {
        AttemptOutcome::FatalFailure(reason) => assert!(reason.contains("application/zip")),
        other => panic!("expected fatal, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    // Bind then drop to get a port nothing listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    match scanner().classify(&item(addr, "/a.pdf")).await {
        AttemptOutcome::TransientFailure(t) => assert_eq!(t.kind, TransientKind::Unavailable),
        other => panic!("expected unavailable, got {other:?}"),
    }
}

fn openai_at(addr: SocketAddr, prefix: &str) -> LlmClassifier {
    let settings = LlmSettings {
        endpoint: Some(format!("http://{}{}", addr, prefix)),
        ..Default::default()
    };
    LlmClassifier::new(LlmProvider::OpenAi, "gpt-4o-mini", "sk-test", &settings).unwrap()
}

#[tokio::test]
async fn test_llm_sensitive_reply() {
    let addr = start_server().await;
    let outcome = openai_at(addr, "/v1")
        .classify(&Item::new("https://corp.example/hr/payroll-2024.pdf"))
        .await;
    match outcome {
        AttemptOutcome::Success(Verdict::Flagged(evidence)) => assert_eq!(evidence.joined(), "SENSITIVE"),
        other => panic!("expected flagged, got {other:?}"),
    }
}

#[tokio::test]
async fn test_llm_rate_limit_delay_from_body() {
    let addr = start_server().await;
    let outcome = openai_at(addr, "/limited")
        .classify(&Item::new("https://corp.example/a.pdf"))
        .await;
    match outcome {
        AttemptOutcome::TransientFailure(t) => {
            assert_eq!(t.kind, TransientKind::RateLimited);
            assert_eq!(t.suggested_delay, Some(Duration::from_secs(20)));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}
