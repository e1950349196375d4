//! Terminal chat client for a running relay.
//!
//! `ask` sends one multipart request and consumes the server-push frames
//! with the same accumulator/transcript machinery a browser UI would use.

pub mod accumulator;
pub mod decode;
pub mod markup;
pub mod transcript;

use accumulator::StreamAccumulator;
use anyhow::{Context, Result};
use console::style;
use markup::{Block, Span};
use std::io::Write;
use std::path::PathBuf;
use transcript::{Transcript, STREAM_ERROR_MSG};

/// Media type for an upload, by extension. Mirrors the server allowlist.
fn declared_media_type(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

pub async fn run_ask(
    url: &str,
    message: Option<String>,
    file: Option<PathBuf>,
    rendered: bool,
) -> Result<()> {
    if message.is_none() && file.is_none() {
        anyhow::bail!("nothing to send: pass a message, a --file, or both");
    }

    let mut form = reqwest::multipart::Form::new();
    let mut user_label = message.clone().unwrap_or_default();

    if let Some(path) = &file {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let media_type = declared_media_type(&name)
            .context("only .txt and .pdf files are supported")?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.clone())
            .mime_str(media_type)
            .context("invalid media type")?;
        form = form.part("file", part);
        user_label = if user_label.is_empty() {
            format!("File: {name}")
        } else {
            format!("{user_label} (File: {name})")
        };
    }
    if let Some(msg) = &message {
        form = form.text("message", msg.clone());
    }

    let mut transcript = Transcript::new();
    transcript.push_user(user_label.clone());
    println!("{} {user_label}", style("You:").bold().cyan());
    print!("{} ", style("Gemini:").bold().green());
    std::io::stdout().flush()?;

    let sent = reqwest::Client::new()
        .post(format!("{}/api/upload", url.trim_end_matches('/')))
        .multipart(form)
        .send()
        .await;

    let mut response = match sent {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, "request failed");
            transcript.fail();
            println!("{}", style(STREAM_ERROR_MSG).red());
            return Ok(());
        }
    };

    if !response.status().is_success() {
        let detail = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from));
        transcript.fail();
        match detail {
            Some(detail) => println!("{}", style(detail).red()),
            None => println!("{}", style(STREAM_ERROR_MSG).red()),
        }
        return Ok(());
    }

    let mut acc = StreamAccumulator::new();
    let mut printed = 0usize;

    let outcome = loop {
        match response.chunk().await {
            Ok(Some(bytes)) => {
                let buffer = acc.push(&bytes);
                transcript.update_assistant(buffer);
                if !rendered {
                    print!("{}", &buffer[printed..]);
                    printed = buffer.len();
                    std::io::stdout().flush()?;
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    match outcome {
        Ok(()) => {
            let reply = acc.finish();
            if !reply.is_empty() {
                transcript.update_assistant(&reply);
            }
            transcript.seal();
            if rendered {
                println!();
                print_blocks(&reply);
            } else {
                println!("{}", &reply[printed.min(reply.len())..]);
            }
        }
        Err(e) => {
            // Headers were fine but the stream died; treat it exactly like
            // a transport failure.
            tracing::debug!(error = %e, "stream ended abnormally");
            transcript.fail();
            println!("\n{}", style(STREAM_ERROR_MSG).red());
        }
    }

    Ok(())
}

fn print_blocks(message: &str) {
    for block in markup::render(message) {
        match block {
            Block::Code(code) => println!("    {}", style(code).yellow()),
            Block::Item(spans) => println!("  - {}", render_spans(&spans)),
            Block::Line(spans) => println!("{}", render_spans(&spans)),
        }
    }
}

fn render_spans(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Text(text) => text.clone(),
            Span::Bold(text) => style(text).bold().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_by_extension() {
        assert_eq!(declared_media_type("notes.txt"), Some("text/plain"));
        assert_eq!(declared_media_type("REPORT.PDF"), Some("application/pdf"));
        assert_eq!(declared_media_type("image.png"), None);
        assert_eq!(declared_media_type("no_extension"), None);
    }
}
