//! Newline-delimited text framing.
//!
//! One message per line, ASCII only, bounded length. The line terminator is
//! not part of the message and a trailing `\r` is dropped. Bytes left over
//! when the stream ends without a terminator count as one last message.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::net::connection::ConnectionError;

const TERMINATOR: u8 = b'\n';

/// Read one message. `Ok(None)` means the stream ended cleanly.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<String>, ConnectionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut frame = Vec::new();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if frame.is_empty() {
                return Ok(None);
            }
            break;
        }

        match available.iter().position(|b| *b == TERMINATOR) {
            Some(end) => {
                frame.extend_from_slice(&available[..end]);
                reader.consume(end + 1);
                break;
            }
            None => {
                let n = available.len();
                frame.extend_from_slice(available);
                reader.consume(n);
            }
        }

        if frame.len() > max_len {
            return Err(ConnectionError::FrameTooLong { max: max_len });
        }
    }

    if frame.last() == Some(&b'\r') {
        frame.pop();
    }
    if frame.len() > max_len {
        return Err(ConnectionError::FrameTooLong { max: max_len });
    }
    if !frame.is_ascii() {
        return Err(ConnectionError::NotAscii);
    }

    // ASCII is always valid UTF-8
    Ok(Some(String::from_utf8_lossy(&frame).into_owned()))
}

/// Write one message followed by the terminator, then flush.
pub async fn write_frame<W>(writer: &mut W, text: &str, max_len: usize) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    if text.len() > max_len {
        return Err(ConnectionError::FrameTooLong { max: max_len });
    }
    if !text.is_ascii() {
        return Err(ConnectionError::NotAscii);
    }
    if text.bytes().any(|b| b == TERMINATOR || b == b'\r') {
        return Err(ConnectionError::EmbeddedLineBreak);
    }

    let mut wire = Vec::with_capacity(text.len() + 1);
    wire.extend_from_slice(text.as_bytes());
    wire.push(TERMINATOR);

    writer.write_all(&wire).await?;
    writer.flush().await?;
    Ok(())
}
