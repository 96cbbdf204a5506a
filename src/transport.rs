//! Shipping a ledger block between two processes over TCP
//!
//! One connection carries one frame: a big-endian `u32` length followed by a
//! bincode-encoded [`WireLedger`] whose last block is the one being shipped.

use crate::error::ChainError;
use crate::wire::WireLedger;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info};

pub async fn bind(address: impl ToSocketAddrs) -> Result<TcpListener, ChainError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| ChainError::TransportError(format!("Failed to bind: {}", e)))?;
    if let Ok(local) = listener.local_addr() {
        info!(address = %local, "Listening for blocks");
    }
    Ok(listener)
}

pub async fn send_block(address: impl ToSocketAddrs, ledger: &WireLedger) -> Result<(), ChainError> {
    let frame = ledger.encode()?;
    let length = u32::try_from(frame.len()).map_err(|_| {
        ChainError::TransportError(format!("Frame of {} bytes is too large", frame.len()))
    })?;

    let mut stream = TcpStream::connect(address)
        .await
        .map_err(|e| ChainError::TransportError(format!("Failed to connect: {}", e)))?;
    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(&frame).await?;
    stream.shutdown().await?;

    debug!(bytes = frame.len(), blocks = ledger.blocks.len(), "Block sent");
    Ok(())
}

/// Accept one connection and read one frame from it.
pub async fn receive_block(listener: &TcpListener, max_frame_bytes: usize) -> Result<WireLedger, ChainError> {
    let (mut stream, peer) = listener.accept().await?;

    let mut length = [0u8; 4];
    stream.read_exact(&mut length).await?;
    let length = u32::from_be_bytes(length) as usize;
    if length > max_frame_bytes {
        return Err(ChainError::TransportError(format!(
            "Frame of {} bytes from {} exceeds limit of {}",
            length, peer, max_frame_bytes
        )));
    }

    let mut frame = vec![0u8; length];
    stream.read_exact(&mut frame).await?;
    debug!(peer = %peer, bytes = length, "Block received");

    WireLedger::decode(&frame)
}
