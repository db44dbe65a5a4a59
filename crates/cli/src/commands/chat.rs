//! `orbitchat chat`: terminal chat against a running server.
//!
//! The conversation lives here, in the terminal, and is sent whole on every
//! turn. A failed turn is dropped from the history and the loop carries on.

use std::io::{self, Write};
use std::time::Duration;

use futures::StreamExt;
use orbitchat_config::AppConfig;
use orbitchat_core::message::{Conversation, Message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::terminal::{BackendClient, ClientError};

pub async fn run(stream: bool, backend: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let url = backend.unwrap_or(config.terminal.backend_url);
    let client = BackendClient::new(&url, Duration::from_secs(config.terminal.timeout_secs))?;

    if let Err(e) = client.health().await {
        eprintln!();
        eprintln!("  Cannot reach the OrbitChat server at {url}");
        eprintln!("  ({e})");
        eprintln!();
        eprintln!("  Start it in another terminal with:");
        eprintln!("    orbitchat serve");
        eprintln!();
        return Err("server unreachable".into());
    }

    println!("OrbitChat terminal ({} mode)", if stream { "streaming" } else { "buffered" });
    println!("   Server: {}", client.base_url());
    println!("   Type 'quit', 'exit' or 'q' to leave.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();
    repl(&client, stdin, &mut stdout, stream).await?;
    Ok(())
}

fn is_exit(line: &str) -> bool {
    ["quit", "exit", "q"]
        .iter()
        .any(|cmd| line.eq_ignore_ascii_case(cmd))
}

/// Read-eval-print loop over any line source and sink.
pub async fn repl<R, W>(client: &BackendClient, input: R, out: &mut W, stream: bool) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut history = Conversation::new();

    loop {
        write!(out, "\nYou: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        history.push(Message::user(line));
        write!(out, "OrbitChat: ")?;
        out.flush()?;

        let result = if stream {
            stream_turn(client, &history.messages, out).await?
        } else {
            match client.chat(&history.messages).await {
                Ok(reply) => {
                    writeln!(out, "{reply}")?;
                    Ok(reply)
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(reply) => history.push(Message::assistant(reply)),
            Err(e) => {
                debug!(error = %e, "Turn failed");
                history.pop();
                writeln!(out, "\n[error] {}", diagnostic(&e))?;
            }
        }
    }

    writeln!(out, "Goodbye!")?;
    Ok(())
}

/// Print fragments as they arrive. The outer `Result` is terminal I/O.
async fn stream_turn<W: Write>(
    client: &BackendClient,
    history: &[Message],
    out: &mut W,
) -> io::Result<Result<String, ClientError>> {
    let mut stream = match client.chat_stream(history).await {
        Ok(s) => s,
        Err(e) => return Ok(Err(e)),
    };

    let mut reply = Vec::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                out.write_all(&bytes)?;
                out.flush()?;
                reply.extend_from_slice(&bytes);
            }
            Err(e) => return Ok(Err(e)),
        }
    }
    writeln!(out)?;

    Ok(Ok(String::from_utf8_lossy(&reply).into_owned()))
}

fn diagnostic(e: &ClientError) -> String {
    match e {
        ClientError::Unreachable { .. } => format!("{e}. Is `orbitchat serve` still running?"),
        _ => e.to_string(),
    }
}
