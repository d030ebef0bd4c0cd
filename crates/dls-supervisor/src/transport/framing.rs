//! LSP header framing over byte streams.
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```

use std::io::{self, BufRead, Write};

use super::error::TransportError;

const CONTENT_LENGTH: &str = "Content-Length: ";

/// Writes one framed message and flushes the writer.
///
/// # Errors
/// Returns `TransportError::Io` if writing fails.
pub(crate) fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError> {
    let header = format!("{CONTENT_LENGTH}{}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one framed message.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame starts.
///
/// # Errors
/// Returns `TransportError::MissingContentLength` when the header block has no
/// length, `TransportError::InvalidHeader` when the length is not a number,
/// and `TransportError::Io` when the stream ends mid-frame.
pub(crate) fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError> {
    let Some(content_length) = read_headers(reader)? else {
        return Ok(None);
    };
    let mut content = vec![0_u8; content_length];
    reader.read_exact(&mut content)?;
    Ok(Some(content))
}

fn read_headers<R: BufRead>(reader: &mut R) -> Result<Option<usize>, TransportError> {
    let mut content_length: Option<usize> = None;
    let mut seen_header = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            if seen_header {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading headers",
                )));
            }
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if seen_header {
                break;
            }
            continue;
        }
        seen_header = true;

        if let Some(value) = trimmed.strip_prefix(CONTENT_LENGTH) {
            content_length = Some(value.parse().map_err(|_| TransportError::InvalidHeader)?);
        }
        // Other headers (Content-Type) are ignored.
    }

    content_length
        .map(Some)
        .ok_or(TransportError::MissingContentLength)
}
