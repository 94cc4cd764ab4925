//! Line-oriented chat loop on stdin/stdout.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::persona_list::format_persona_lines;
use crate::cli::strings::Strings;
use crate::core::backend::ChatBackend;
use crate::core::config::ResolvedSettings;
use crate::core::session::{ReplyEvent, SessionError, SessionManager, SubmitOutcome};

/// What a line typed into the chat means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Quit,
    Help,
    Status,
    ListPersonas,
    SwitchPersona(String),
    /// Anything else, including `/clear`, goes to the session.
    Message(String),
}

pub fn parse_chat_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).unwrap_or_default();

    match head {
        "/quit" | "/exit" => ChatInput::Quit,
        "/help" => ChatInput::Help,
        "/status" => ChatInput::Status,
        "/personas" => ChatInput::ListPersonas,
        "/persona" if rest.is_empty() => ChatInput::ListPersonas,
        "/persona" => ChatInput::SwitchPersona(rest.to_string()),
        _ => ChatInput::Message(line.to_string()),
    }
}

/// Print one reply event as it arrives.
pub fn render_event<W: Write>(out: &mut W, event: &ReplyEvent) -> io::Result<()> {
    match event {
        ReplyEvent::Fragment(text) => write!(out, "{text}")?,
        ReplyEvent::Done(Ok(_)) => writeln!(out)?,
        ReplyEvent::Done(Err(_)) => writeln!(out, "{}", event.text())?,
    }
    out.flush()
}

pub async fn run_chat<B: ChatBackend>(
    mut session: SessionManager<B>,
    settings: &ResolvedSettings,
) -> Result<(), Box<dyn Error>> {
    let strings = Strings::for_language(&settings.language);
    let language = settings.language.as_str();

    if settings.show_welcome {
        println!("{}\n", strings.welcome);
    }
    let online = session.check_availability().await;
    println!("{} ({}, {})", strings.status(online), settings.base_url, settings.model);
    println!("{}\n", session.active_display_name(language));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt(strings)?;

    while let Some(line) = lines.next_line().await? {
        match parse_chat_input(&line) {
            ChatInput::Quit => break,
            ChatInput::Help => println!("{}", strings.help),
            ChatInput::Status => {
                let online = session.check_availability().await;
                println!("{}", strings.status(online));
            }
            ChatInput::ListPersonas => {
                for line in format_persona_lines(session.registry(), language, session.active_persona()) {
                    println!("  {line}");
                }
            }
            ChatInput::SwitchPersona(id) => match session.switch_persona(&id) {
                Ok(()) => println!(
                    "{}",
                    strings.switched(&session.registry().short_name(&id, language))
                ),
                Err(err @ SessionError::InvalidPersona(_)) => eprintln!("❌ {err}"),
                Err(_) => eprintln!("{}", strings.busy),
            },
            ChatInput::Message(text) => match session.submit(&text) {
                Ok(SubmitOutcome::Ignored) => {}
                Ok(SubmitOutcome::Cleared) => println!("{}", strings.cleared),
                Ok(SubmitOutcome::Started(pending)) => {
                    let name = session
                        .registry()
                        .short_name(session.active_persona(), language);
                    println!("│ {name}");
                    let mut stdout = io::stdout();
                    session
                        .await_reply(pending, |event| {
                            if let Err(err) = render_event(&mut stdout, &event) {
                                tracing::warn!(error = %err, "Failed to write reply to stdout");
                            }
                        })
                        .await?;
                    println!();
                }
                Err(SessionError::Busy) => eprintln!("{}", strings.busy),
                Err(err) => eprintln!("❌ {err}"),
            },
        }
        print_prompt(strings)?;
    }

    Ok(())
}

fn print_prompt(strings: &Strings) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "▌ {}> ", strings.you())?;
    stdout.flush()
}
