//! The serving TCP front: accept loop and per-connection protocol.

use std::io;

use log::{info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
};

use wire::msg::Msg;

use crate::front::ServingFront;

/// Accepts serving connections forever, one task per peer.
pub async fn serve(listener: TcpListener, front: ServingFront) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("accepted serving connection from {peer}");

        let front = front.clone();
        tokio::spawn(async move {
            let (rx, tx) = stream.into_split();
            if let Err(e) = handle_conn(front, rx, tx).await {
                warn!("serving connection from {peer} ended: {e}");
            }
        });
    }
}

/// Runs the call/reply protocol over one connection until the peer
/// disconnects.
///
/// Per-request failures are answered as `Reply::Failure`; only transport
/// errors and protocol violations end the connection.
pub async fn handle_conn<R, W>(front: ServingFront, rx: R, tx: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (mut rx, mut tx) = wire::channel(rx, tx);

    loop {
        let msg: Msg = match rx.recv().await {
            Ok(msg) => msg,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };

        let Msg::Call(call) = msg else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "serving connections only carry calls",
            ));
        };

        let reply = match front.dispatch(&call) {
            Ok(outcome) => outcome.into_msg(),
            Err(e) => Msg::Reply(e.to_failure()),
        };

        tx.send(&reply).await?;
    }
}
