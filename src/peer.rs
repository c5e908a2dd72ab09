//! Peer bootstrap and link plumbing.
//!
//! System 1 listens and accepts systems 2 and 3; system 2 dials system 1 and
//! then accepts system 3; system 3 dials both. Once the mesh is complete,
//! every link gets a reader task feeding the engine and a writer task
//! draining the engine's outbound channel.

use crate::{
    commands,
    engine::Engine,
    error::ProtocolError,
    log,
    message::{Join, Message},
    PeerId, PEER_COUNT,
};
use color_print::cformat;
use futures::{SinkExt, StreamExt};
use std::{error::Error, sync::Arc};
use tokio::{
    io::{BufReader, Lines, Stdin},
    net::{TcpListener, TcpStream},
    sync::{mpsc, Mutex},
};
use tokio_util::codec::{Framed, LinesCodec};

type PeerLink = Framed<TcpStream, LinesCodec>;

pub struct Peer {
    pub id: PeerId,
}

impl Peer {
    pub fn new(id: PeerId) -> Self {
        Self { id }
    }

    /// Connects the full mesh for this peer, then runs the protocol until the
    /// operator closes the prompt.
    pub async fn run(
        &self,
        input: &mut Lines<BufReader<Stdin>>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut links: Vec<(PeerId, PeerLink)> = Vec::new();

        match self.id {
            1 => {
                let listener = listen().await?;
                log::info("Waiting for systems 2 and 3 to connect.");
                for _ in 0..PEER_COUNT - 1 {
                    links.push(accept(&listener).await?);
                }
            }
            2 => {
                links.push((1, self.dial(input, 1).await?));
                let listener = listen().await?;
                log::info("Waiting for system 3 to connect.");
                links.push(accept(&listener).await?);
            }
            _ => {
                links.push((1, self.dial(input, 1).await?));
                links.push((2, self.dial(input, 2).await?));
            }
        }

        log::info("All systems connected to each other.");

        let mut engine = Engine::new(self.id);
        let mut wired = Vec::new();
        for (peer, link) in links {
            let (sender, receiver) = mpsc::unbounded_channel();
            engine.register_link(peer, sender);
            wired.push((peer, link, receiver));
        }
        let engine = Arc::new(Mutex::new(engine));

        for (peer, link, mut outbound) in wired {
            let (mut writer, mut reader) = link.split::<String>();

            tokio::spawn(async move {
                while let Some(message) = outbound.recv().await {
                    match message.to_json_string() {
                        Ok(line) => {
                            if writer.send(line).await.is_err() {
                                log::error(&cformat!(
                                    "Couldn't send to system <bold>{peer}</bold>."
                                ));
                                break;
                            }
                        }
                        Err(e) => log::error(&format!("{e}")),
                    }
                }
            });

            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                while let Some(Ok(line)) = reader.next().await {
                    match Message::from_json_string(&line) {
                        Ok(message) => engine.lock().await.handle_message(peer, message),
                        Err(_) => {
                            log::error(&format!("{}", ProtocolError::MalformedMessage(line)))
                        }
                    }
                }
                log::error(&cformat!("Lost the connection to system <bold>{peer}</bold>."));
            });
        }

        commands::run(engine, input).await
    }

    async fn dial(
        &self,
        input: &mut Lines<BufReader<Stdin>>,
        target: PeerId,
    ) -> Result<PeerLink, Box<dyn Error + Send + Sync>> {
        let address = prompt_address(input, target).await?;
        let stream = TcpStream::connect(&address).await?;
        let mut link = Framed::new(stream, LinesCodec::new());
        link.send(Join(self.id).to_json_string()?).await?;
        log::info(&cformat!(
            "Connected to system <bold>{target}</bold> at <bold>{address}</bold>."
        ));
        Ok(link)
    }
}

async fn listen() -> Result<TcpListener, Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind("0.0.0.0:0").await?;
    log::info(&cformat!(
        "Listening on port <bold>{}</bold>; share this host's address with the peers that dial in.",
        listener.local_addr()?.port()
    ));
    Ok(listener)
}

async fn accept(
    listener: &TcpListener,
) -> Result<(PeerId, PeerLink), Box<dyn Error + Send + Sync>> {
    let (stream, _) = listener.accept().await?;
    let mut link = Framed::new(stream, LinesCodec::new());
    match link.next().await {
        Some(Ok(line)) => {
            let Join(peer) = Join::from_json_string(&line)?;
            log::info(&cformat!("System <bold>{peer}</bold> connected."));
            Ok((peer, link))
        }
        _ => Err("peer disconnected during the join handshake".into()),
    }
}

async fn prompt_address(
    input: &mut Lines<BufReader<Stdin>>,
    target: PeerId,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    log::info(&cformat!(
        "Enter the address of system <bold>{target}</bold> (IP:PORT):"
    ));
    loop {
        match input.next_line().await? {
            Some(line) if !line.trim().is_empty() => return Ok(line.trim().to_string()),
            Some(_) => continue,
            None => return Err("standard input closed during setup".into()),
        }
    }
}
