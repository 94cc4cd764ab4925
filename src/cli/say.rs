//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::backend::{ChatBackend, ChatOutcome};
use crate::core::session::{ReplyEvent, SessionManager};

pub async fn run_say<B: ChatBackend>(
    mut session: SessionManager<B>,
    prompt: &[String],
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: newhorizon say <prompt>");
        std::process::exit(1);
    }

    let mut stdout = io::stdout();
    match stream_reply(&mut session, &prompt, &mut stdout).await? {
        Some(Ok(_)) | None => Ok(()),
        Some(Err(err)) => {
            eprintln!("\n{}", err.user_message());
            std::process::exit(1);
        }
    }
}

/// Sends `prompt` and writes fragments to `out` as they arrive.
pub async fn stream_reply<B: ChatBackend, W: Write>(
    session: &mut SessionManager<B>,
    prompt: &str,
    out: &mut W,
) -> Result<Option<ChatOutcome>, Box<dyn Error>> {
    let mut write_error = None;
    let outcome = session
        .send(prompt, |event| {
            let written = match &event {
                ReplyEvent::Fragment(text) => write!(out, "{text}").and_then(|_| out.flush()),
                ReplyEvent::Done(Ok(_)) => writeln!(out),
                ReplyEvent::Done(Err(_)) => Ok(()),
            };
            if let Err(err) = written {
                write_error.get_or_insert(err);
            }
        })
        .await?;

    if let Some(err) = write_error {
        return Err(err.into());
    }
    Ok(outcome)
}
