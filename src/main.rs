use color_print::cformat;
use peer_lock::{log, peer::Peer, PeerId, PEER_COUNT};
use std::error::Error;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut input = BufReader::new(stdin()).lines();

    log::info(&cformat!(
        "Enter this system number (1 to <bold>{PEER_COUNT}</bold>):"
    ));
    let id: PeerId = loop {
        match input.next_line().await? {
            Some(line) => match line.trim().parse::<PeerId>() {
                Ok(id) if (1..=PEER_COUNT as PeerId).contains(&id) => break id,
                _ => log::error(&cformat!(
                    "The system number must be between <bold>1</bold> and <bold>{PEER_COUNT}</bold>."
                )),
            },
            None => return Err("standard input closed during setup".into()),
        }
    };

    Peer::new(id).run(&mut input).await
}
