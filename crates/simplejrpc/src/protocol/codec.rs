//! `Content-Length` framing shared by the server and the client.

use std::io::{BufRead, Read, Write};

use super::errors::CodecError;

/// Default upper bound on a single frame body.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

const MAX_HEADER_LINE_BYTES: usize = 1024;
const CONTENT_LENGTH: &str = "content-length";

/// Writes `payload` as one framed message and flushes the writer.
///
/// # Errors
///
/// Returns `CodecError::Io` if writing or flushing fails.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), CodecError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one framed message body (blocks until complete).
///
/// Returns `Ok(None)` when the stream ends cleanly between frames. Blank lines
/// before a header block are skipped; headers other than `Content-Length` are
/// ignored.
///
/// # Errors
///
/// Returns `CodecError::UnexpectedEof` when the stream ends inside a frame,
/// `CodecError::InvalidHeader` or `CodecError::MissingContentLength` for a
/// bad header block, and `CodecError::FrameTooLarge` when the announced body
/// exceeds `max_frame_bytes`.
pub fn read_frame<R: BufRead>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Vec<u8>>, CodecError> {
    let Some(content_length) = read_headers(reader)? else {
        return Ok(None);
    };
    if content_length > max_frame_bytes {
        return Err(CodecError::FrameTooLarge {
            size: content_length,
            max_size: max_frame_bytes,
        });
    }

    let mut body = vec![0_u8; content_length];
    reader.read_exact(&mut body).map_err(|error| {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::UnexpectedEof
        } else {
            CodecError::Io(error)
        }
    })?;
    Ok(Some(body))
}

fn read_headers<R: BufRead>(reader: &mut R) -> Result<Option<usize>, CodecError> {
    let mut content_length = None;
    let mut saw_header = false;

    loop {
        let line = match read_header_line(reader)? {
            Some(line) => line,
            None if saw_header => return Err(CodecError::UnexpectedEof),
            None => return Ok(None),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }

        saw_header = true;
        if let Some(length) = parse_content_length(trimmed)? {
            content_length = Some(length);
        }
    }

    content_length
        .map(Some)
        .ok_or(CodecError::MissingContentLength)
}

fn read_header_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, CodecError> {
    let mut line = Vec::new();
    let bytes_read = reader
        .by_ref()
        .take(MAX_HEADER_LINE_BYTES as u64)
        .read_until(b'\n', &mut line)?;
    if bytes_read == 0 {
        return Ok(None);
    }

    if !line.ends_with(b"\n") {
        if line.len() >= MAX_HEADER_LINE_BYTES {
            return Err(CodecError::invalid_header("header line too long"));
        }
        return Err(CodecError::UnexpectedEof);
    }

    String::from_utf8(line)
        .map(Some)
        .map_err(|_| CodecError::invalid_header("header is not valid UTF-8"))
}

fn parse_content_length(line: &str) -> Result<Option<usize>, CodecError> {
    let Some((name, value)) = line.split_once(':') else {
        return Err(CodecError::invalid_header(line));
    };
    if !name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
        return Ok(None);
    }
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| CodecError::invalid_header(line))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn read(input: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
        let mut reader = Cursor::new(input.to_vec());
        read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES)
    }

    #[rstest]
    fn writes_framed_message() {
        let mut output = Vec::new();
        write_frame(&mut output, b"test payload").expect("write frame");

        let written = String::from_utf8(output).expect("utf8");
        assert_eq!(written, "Content-Length: 12\r\n\r\ntest payload");
    }

    #[rstest]
    fn writes_empty_message() {
        let mut output = Vec::new();
        write_frame(&mut output, b"").expect("write frame");
        assert_eq!(output, b"Content-Length: 0\r\n\r\n");
    }

    #[rstest]
    fn reads_framed_message() {
        let body = read(b"Content-Length: 5\r\n\r\nhello").expect("read frame");
        assert_eq!(body.as_deref(), Some(&b"hello"[..]));
    }

    #[rstest]
    #[case::extra_header(b"Content-Length: 4\r\nContent-Type: application/json\r\n\r\ntest")]
    #[case::lower_case(b"content-length:4\r\n\r\ntest")]
    #[case::leading_blank_line(b"\r\nContent-Length: 4\r\n\r\ntest")]
    fn tolerates_header_variations(#[case] input: &[u8]) {
        let body = read(input).expect("read frame");
        assert_eq!(body.as_deref(), Some(&b"test"[..]));
    }

    #[rstest]
    fn reads_consecutive_frames() {
        let mut reader =
            Cursor::new(b"Content-Length: 1\r\n\r\naContent-Length: 2\r\n\r\nbc".to_vec());
        let first = read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES).expect("first");
        let second = read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES).expect("second");
        let end = read_frame(&mut reader, DEFAULT_MAX_FRAME_BYTES).expect("end");
        assert_eq!(first.as_deref(), Some(&b"a"[..]));
        assert_eq!(second.as_deref(), Some(&b"bc"[..]));
        assert!(end.is_none());
    }

    #[rstest]
    fn clean_eof_yields_none() {
        assert!(read(b"").expect("read").is_none());
    }

    #[rstest]
    fn rejects_missing_content_length() {
        let result = read(b"Content-Type: application/json\r\n\r\ntest");
        assert!(matches!(result, Err(CodecError::MissingContentLength)));
    }

    #[rstest]
    #[case::not_a_number(b"Content-Length: invalid\r\n\r\ntest")]
    #[case::no_colon(b"garbage\r\n\r\n")]
    fn rejects_invalid_headers(#[case] input: &[u8]) {
        assert!(matches!(read(input), Err(CodecError::InvalidHeader { .. })));
    }

    #[rstest]
    #[case::inside_headers(b"Content-Length: 10")]
    #[case::after_headers(b"Content-Length: 10\r\n")]
    #[case::inside_body(b"Content-Length: 10\r\n\r\nshort")]
    fn reports_truncated_frames(#[case] input: &[u8]) {
        assert!(matches!(read(input), Err(CodecError::UnexpectedEof)));
    }

    #[rstest]
    fn enforces_frame_limit() {
        let mut reader = Cursor::new(b"Content-Length: 11\r\n\r\nhello world".to_vec());
        let result = read_frame(&mut reader, 10);
        assert!(matches!(
            result,
            Err(CodecError::FrameTooLarge {
                size: 11,
                max_size: 10
            })
        ));
    }

    #[rstest]
    fn rejects_overlong_header_line() {
        let mut input = vec![b'X'; MAX_HEADER_LINE_BYTES + 10];
        input.extend_from_slice(b"\r\n\r\n");
        assert!(matches!(read(&input), Err(CodecError::InvalidHeader { .. })));
    }
}
