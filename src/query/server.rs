use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::{Result, anyhow};
use futures::{SinkExt, TryStreamExt};
use log::{debug, error, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio_serde::formats::Json;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use crate::shutdown::Shutdown;
use super::{Api, Request, Response};

const MAX_FRAME: usize = 32 * 1024 * 1024;

type Codec<In, Out> = tokio_serde::Framed<Framed<TcpStream, LengthDelimitedCodec>, In, Out, Json<In, Out>>;

/// Answer query requests until shutdown is signalled.
pub async fn serve(listener: TcpListener, api: Arc<Api>, shutdown: Shutdown) {
    loop {
        let accept = tokio::select! {
            accept = listener.accept() => accept,
            _      = shutdown.wait()   => break,
        };

        let (sock, addr) = match accept {
            Ok(conn) => conn,
            Err(e)   => {
                warn!("accept failed: {}", e);
                continue;
            }
        };

        debug!("query connection from {}", addr);

        let api = api.clone();
        tokio::spawn(async move {
            match client(sock, api).await {
                Ok(()) => debug!("query client {} finished", addr),
                Err(e) => error!("query client {} error: {}", addr, e),
            }
        });
    }

    debug!("query endpoint closed");
}

async fn client(sock: TcpStream, api: Arc<Api>) -> Result<()> {
    let mut codec = framed::<Request, Response>(sock);

    while let Some(req) = codec.try_next().await? {
        let res = api.handle(req);
        codec.send(res).await?;
    }

    Ok(())
}

/// Issue a single request against a running endpoint.
pub async fn request(addr: SocketAddr, req: Request) -> Result<Response> {
    let sock = TcpStream::connect(addr).await?;
    let mut codec = framed::<Response, Request>(sock);

    codec.send(req).await?;

    codec.try_next().await?.ok_or_else(|| anyhow!("connection closed"))
}

fn framed<In, Out>(sock: TcpStream) -> Codec<In, Out> {
    let mut length = LengthDelimitedCodec::new();
    length.set_max_frame_length(MAX_FRAME);
    let framed = Framed::new(sock, length);
    let format = Json::<In, Out>::default();
    tokio_serde::Framed::new(framed, format)
}
