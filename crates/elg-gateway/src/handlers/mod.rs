//! The connection handler: the per-connection state machine.
//!
//! `AWAITING_HEADER_LEN -> READING_HEADER -> KEY_LOOKUP -> READING_BODY ->
//! UPSTREAM -> WRITING_RESPONSE -> DONE`, with any step able to fail into
//! `FAILED`, which this function turns into a single logged error and a
//! closed socket — never a partial or corrupt response.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use elg_common::{frame, GatewayError};
use elg_upstream::UpstreamClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::context::GatewayContext;

/// Drive one client connection through the full request/response cycle.
pub async fn handle_connection(
    mut socket: TcpStream,
    addr: SocketAddr,
    ctx: Arc<GatewayContext>,
) -> Result<(), GatewayError> {
    let deadline = ctx.config.conn_timeout();
    let request_count = ctx.next_request_count();

    // AWAITING_HEADER_LEN / READING_HEADER
    let mut hdr_len_buf = [0u8; 1];
    read_exact_with_timeout(&mut socket, &mut hdr_len_buf, deadline).await?;
    let hdr_len = hdr_len_buf[0] as usize;

    let mut header_buf = vec![0u8; hdr_len];
    read_exact_with_timeout(&mut socket, &mut header_buf, deadline).await?;
    let header = frame::decode_rq_header(&header_buf)?;

    // KEY_LOOKUP
    let partner = match ctx.partner_keys.get(header.partner_id) {
        Ok(partner) => partner,
        Err(GatewayError::UnknownPartner(id)) => {
            warn!(%addr, partner_id = id, "unknown partner, closing connection");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    // READING_BODY
    let body_len = header.crypto_info_length as usize + header.rq_length as usize;
    let mut body_buf = vec![0u8; body_len];
    read_exact_with_timeout(&mut socket, &mut body_buf, deadline).await?;
    let rq = frame::decode_rq_body(&body_buf, &partner.aes_key)?;

    info!(%addr, partner_id = header.partner_id, request_count, ap_count = rq.aps.len(), "request decoded");

    // UPSTREAM
    let upstream = UpstreamClient::new(ctx.config.api_url.clone(), ctx.config.upstream_timeout())?;
    let (lat, lon, hpe) = upstream.locate(&rq, &partner.api_key).await?;

    // WRITING_RESPONSE
    let (header_len_byte, response_frame) = frame::encode_rs(&partner.aes_key, lat, lon, hpe)?;

    let mut out = Vec::with_capacity(1 + response_frame.len());
    out.push(header_len_byte);
    out.extend_from_slice(&response_frame);

    tokio::time::timeout(deadline, socket.write_all(&out))
        .await
        .map_err(|_| GatewayError::Timeout("writing response".into()))??;

    info!(%addr, partner_id = header.partner_id, "response sent");

    Ok(())
}

async fn read_exact_with_timeout(
    socket: &mut TcpStream,
    buf: &mut [u8],
    deadline: Duration,
) -> Result<(), GatewayError> {
    tokio::time::timeout(deadline, socket.read_exact(buf))
        .await
        .map_err(|_| GatewayError::Timeout(format!("reading {} bytes", buf.len())))??;
    Ok(())
}
