//! Interactive command interface.

use crate::{
    engine::{holder_notice, Engine, HolderQuery, SectionState},
    error::ProtocolError,
    log,
};
use color_print::{cformat, cprintln};
use std::{error::Error, sync::Arc};
use tokio::{
    io::{BufReader, Lines, Stdin},
    sync::Mutex,
};

/// Enum that represents the commands a user can type at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    LocalEvent,
    RequestSection,
    ReleaseSection,
    CheckSection,
    ViewRequests,
    ViewReplies,
    Close,
}

impl Command {
    /// Function that parses a command from one input line.
    ///
    /// Matching is by prefix, so trailing text after a command is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim_start();
        if input.starts_with("close") {
            Some(Self::Close)
        } else if input.starts_with("local event") {
            Some(Self::LocalEvent)
        } else if input.starts_with("request critical section") {
            Some(Self::RequestSection)
        } else if input.starts_with("release critical section") {
            Some(Self::ReleaseSection)
        } else if input.starts_with("check critical section") {
            Some(Self::CheckSection)
        } else if input.starts_with("view requests") {
            Some(Self::ViewRequests)
        } else if input.starts_with("view replies") {
            Some(Self::ViewReplies)
        } else {
            None
        }
    }
}

/// Function that prints the recognized commands.
pub fn print_help() {
    cprintln!("Commands:");
    cprintln!("<yellow>local event              ----</yellow> performs a local event");
    cprintln!("<yellow>request critical section ----</yellow> requests access to the critical section");
    cprintln!("<yellow>release critical section ----</yellow> releases the critical section if you hold it, else withdraws your request");
    cprintln!("<yellow>check critical section   ----</yellow> shows which system currently holds the critical section");
    cprintln!("<yellow>view requests            ----</yellow> shows the pending request queue with timestamps");
    cprintln!("<yellow>view replies             ----</yellow> shows the collected replies with timestamps");
    cprintln!("<yellow>close                    ----</yellow> closes the connection");
}

/// Function that drives the interactive prompt until `close` or end of input.
pub async fn run(
    engine: Arc<Mutex<Engine>>,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    print_help();

    while let Some(line) = input.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        println!("---------------");
        let Some(command) = Command::parse(&line) else {
            log::error(&cformat!("<red>Invalid command.</red>"));
            continue;
        };
        match command {
            Command::Close => break,
            Command::LocalEvent => {
                let timestamp = engine.lock().await.local_event();
                log::info(&cformat!(
                    "<yellow>Your current local timestamp is <bold>{timestamp}</bold>.</yellow>"
                ));
            }
            Command::RequestSection => {
                let mut engine = engine.lock().await;
                match engine.request_access() {
                    Ok(timestamp) => log::info(&cformat!(
                        "<yellow>Your current local timestamp is <bold>{timestamp}</bold>.</yellow>"
                    )),
                    Err(ProtocolError::AlreadyActive) => {
                        if engine.state() == SectionState::Holding {
                            log::error(&cformat!("<red>You already have the critical section!</red>"));
                        } else {
                            log::error(&cformat!(
                                "<red>You already requested the critical section!</red>"
                            ));
                        }
                    }
                    Err(e) => log::error(&format!("{e}")),
                }
            }
            Command::ReleaseSection => {
                match engine.lock().await.release_access() {
                    Ok((timestamp, _was_holding)) => log::info(&cformat!(
                        "<yellow>Your current local timestamp is <bold>{timestamp}</bold>.</yellow>"
                    )),
                    Err(ProtocolError::NotActive) => log::error(&cformat!(
                        "<red>You are not holding the critical section nor requested it!</red>"
                    )),
                    Err(e) => log::error(&format!("{e}")),
                }
            }
            Command::CheckSection => {
                // the lock is released before awaiting the coordinator
                let query = engine.lock().await.query_holder();
                match query {
                    HolderQuery::Local(holder) => log::info(&holder_notice(holder)),
                    HolderQuery::Remote(receiver) => match receiver.await {
                        Ok(holder) => log::info(&holder_notice(holder)),
                        Err(_) => log::error("The coordinator never answered the holder query."),
                    },
                }
            }
            Command::ViewRequests => {
                for request in engine.lock().await.pending_requests() {
                    log::info(&cformat!(
                        "<blue>System <bold>{}</bold>, timestamp <bold>{}</bold>.</blue>",
                        request.peer,
                        request.timestamp
                    ));
                }
            }
            Command::ViewReplies => {
                for (timestamp, peer) in engine.lock().await.recorded_replies() {
                    log::info(&cformat!(
                        "<blue>System <bold>{peer}</bold>, timestamp <bold>{timestamp}</bold>.</blue>"
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_command() {
        assert_eq!(Command::parse("local event"), Some(Command::LocalEvent));
        assert_eq!(
            Command::parse("request critical section"),
            Some(Command::RequestSection)
        );
        assert_eq!(
            Command::parse("release critical section"),
            Some(Command::ReleaseSection)
        );
        assert_eq!(
            Command::parse("check critical section"),
            Some(Command::CheckSection)
        );
        assert_eq!(Command::parse("view requests"), Some(Command::ViewRequests));
        assert_eq!(Command::parse("view replies"), Some(Command::ViewReplies));
        assert_eq!(Command::parse("close"), Some(Command::Close));
    }

    #[test]
    fn matches_by_prefix() {
        assert_eq!(
            Command::parse("request critical section now"),
            Some(Command::RequestSection)
        );
        assert_eq!(Command::parse("  close"), Some(Command::Close));
    }

    #[test]
    fn rejects_unknown_input() {
        assert_eq!(Command::parse("request"), None);
        assert_eq!(Command::parse("view"), None);
        assert_eq!(Command::parse("help"), None);
    }
}
