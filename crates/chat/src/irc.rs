use {
    std::{sync::Arc, time::Duration},
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    secrecy::ExposeSecret,
    tokio::sync::{Mutex, mpsc},
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {
    crate::{
        error::{Error, Result},
        parse::{IrcEvent, parse_line},
        transport::{ChatTransport, MessageHandler},
    },
    clipwatch_auth::SharedCredential,
};

/// Wait between reconnect attempts after a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Twitch IRC over WebSocket.
///
/// Outbound lines are queued on an unbounded channel, so [`ChatTransport`]
/// calls never block on the socket; the read/write loop lives in
/// [`IrcTransport::run`] and reconnects (re-authenticating and re-joining
/// every channel) whenever the connection drops.
pub struct IrcTransport {
    url: String,
    nick: String,
    credential: SharedCredential,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    channels: Mutex<Vec<String>>,
}

impl IrcTransport {
    #[must_use]
    pub fn new(url: impl Into<String>, nick: impl Into<String>, credential: SharedCredential) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            nick: nick.into(),
            credential,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Drive the connection until `cancel` fires. Call once.
    pub async fn run(
        self: Arc<Self>,
        handler: Arc<dyn MessageHandler>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut outbound_rx = self
            .outbound_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::not_connected("transport already running"))?;

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self.connect_and_serve(&handler, &mut outbound_rx, &cancel).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "chat connection lost, reconnecting");
                }
            }
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    /// One connection lifetime. `Ok(())` means we were cancelled; any
    /// drop or socket error comes back as `Err` so the caller reconnects.
    async fn connect_and_serve(
        &self,
        handler: &Arc<dyn MessageHandler>,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (mut ws, _) = connect_async(self.url.as_str()).await?;
        info!(url = %self.url, nick = %self.nick, "connected to chat");

        let token = {
            let cred = self.credential.read().await;
            cred.access_token.expose_secret().clone()
        };
        ws.send(Message::Text(
            "CAP REQ :twitch.tv/tags twitch.tv/commands".into(),
        ))
        .await?;
        ws.send(Message::Text(format!("PASS oauth:{token}").into())).await?;
        ws.send(Message::Text(format!("NICK {}", self.nick).into())).await?;
        for channel in self.channels.lock().await.iter() {
            ws.send(Message::Text(format!("JOIN #{channel}").into())).await?;
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = ws.close(None).await;
                    return Ok(());
                }
                line = outbound_rx.recv() => {
                    let Some(line) = line else {
                        return Ok(());
                    };
                    ws.send(Message::Text(line.into())).await?;
                }
                frame = ws.next() => {
                    let Some(frame) = frame else {
                        return Err(Error::not_connected("server closed the connection"));
                    };
                    match frame? {
                        Message::Text(payload) => {
                            for raw in payload.as_str().lines() {
                                self.handle_line(raw, &mut ws, handler).await?;
                            }
                        }
                        Message::Close(_) => {
                            return Err(Error::not_connected("server sent close"));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    async fn handle_line<S>(
        &self,
        raw: &str,
        ws: &mut S,
        handler: &Arc<dyn MessageHandler>,
    ) -> Result<()>
    where
        S: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        match parse_line(raw) {
            IrcEvent::Ping(payload) => {
                ws.send(Message::Text(format!("PONG :{payload}").into())).await?;
            }
            IrcEvent::Privmsg(message) => {
                debug!(channel = %message.channel, sender = %message.sender, "message received");
                handler.on_message(message).await;
            }
            IrcEvent::Other => {}
        }
        Ok(())
    }

    fn queue(&self, line: String) -> Result<()> {
        self.outbound_tx
            .send(line)
            .map_err(|_| Error::not_connected("outbound queue closed"))
    }
}

#[async_trait]
impl ChatTransport for IrcTransport {
    async fn join(&self, channel: &str) -> Result<()> {
        let channel = channel.to_ascii_lowercase();
        let mut channels = self.channels.lock().await;
        if !channels.contains(&channel) {
            channels.push(channel.clone());
        }
        self.queue(format!("JOIN #{channel}"))
    }

    async fn send(&self, channel: &str, text: &str) -> Result<()> {
        self.queue(format!("PRIVMSG #{} :{text}", channel.to_ascii_lowercase()))
    }
}
