use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::LengthDelimitedCodec;

use crate::error::FeedError;

/// Pipeline push protocol id
pub(crate) const PROTO_PUSH: u16 = 0x0050;

/// Pipeline pull protocol id
pub(crate) const PROTO_PULL: u16 = 0x0051;

/// Largest message accepted from a peer
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Exchange protocol headers and check the peer speaks `theirs`.
pub(crate) async fn handshake<S>(stream: &mut S, ours: u16, theirs: u16) -> Result<(), FeedError>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let mut header = [0u8, b'S', b'P', 0, 0, 0, 0, 0];
    header[4..6].copy_from_slice(&ours.to_be_bytes());
    stream.write_all(&header).await?;
    stream.flush().await?;

    let mut peer = [0u8; 8];
    stream.read_exact(&mut peer).await?;
    if peer[..4] != [0, b'S', b'P', 0] {
        return Err(FeedError::Handshake("peer is not a pipeline socket".to_string()));
    }
    let proto = u16::from_be_bytes([peer[4], peer[5]]);
    if proto != theirs {
        return Err(FeedError::Handshake(format!(
            "expected protocol {theirs:#06x}, peer announced {proto:#06x}"
        )));
    }
    Ok(())
}

/// 64-bit big-endian length prefix, then payload
pub(crate) fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(8)
        .big_endian()
        .max_frame_length(MAX_MESSAGE_SIZE)
        .new_codec()
}
