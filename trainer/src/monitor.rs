//! The service-monitor connection protocol.

use std::io;

use log::info;
use tokio::io::{AsyncRead, AsyncWrite};

use store::CallLog;
use wire::{msg::Msg, specs::registry::RegistryMsg};

/// Serves report inserts and per-uid queries over one connection until
/// the peer disconnects.
pub async fn handle_conn<L, R, W>(log: &L, rx: R, tx: W) -> io::Result<()>
where
    L: CallLog,
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

        let reply = match msg {
            Msg::Registry(RegistryMsg::Report(body)) => {
                info!("recording call report for uid {}", body.uid);
                log.record(&body).await.map_err(io::Error::other)?;
                RegistryMsg::Done
            }
            Msg::Registry(RegistryMsg::Query { uid }) => {
                let records = log.query(uid).await.map_err(io::Error::other)?;
                RegistryMsg::Records(records)
            }
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("monitor connections only carry reports and queries, got {other:?}"),
                ));
            }
        };

        tx.send(&Msg::Registry(reply)).await?;
    }
}
