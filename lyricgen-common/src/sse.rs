//! Server-Sent Events frame decoding
//!
//! Events are delimited by a blank line. Network reads can end anywhere,
//! including inside a multi-byte character, so bytes are buffered until a
//! full frame has arrived and only complete frames are decoded. Used both for
//! the upstream provider stream and by live feed consumers.

const FRAME_SEPARATOR: &[u8] = b"\n\n";

/// Incremental decoder turning raw SSE bytes into `data` payloads
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
    /// Last byte seen was a CR, so a leading LF in the next read completes it
    after_cr: bool,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes and return the payloads of every completed frame
    ///
    /// Frames without `data:` lines (comments, keep-alives) yield nothing.
    /// Incomplete trailing bytes stay buffered for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        // CRLF and bare CR line endings are folded to LF
        for &byte in bytes {
            match byte {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.after_cr = true;
                }
                b'\n' if self.after_cr => self.after_cr = false,
                _ => {
                    self.buffer.push(byte);
                    self.after_cr = false;
                }
            }
        }

        let mut payloads = Vec::new();
        while let Some(idx) = find_separator(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..idx + FRAME_SEPARATOR.len()).collect();
            let frame = String::from_utf8_lossy(&frame[..idx]);
            if let Some(payload) = frame_payload(&frame) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Bytes received but not yet part of a complete frame
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_SEPARATOR.len())
        .position(|window| window == FRAME_SEPARATOR)
}

fn frame_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_frame_is_held_back() {
        let mut decoder = SseFrameDecoder::new();

        assert!(decoder.push(b"data: {\"type\":\"con").is_empty());
        assert!(decoder.pending_len() > 0);

        let payloads = decoder.push(b"tent\",\"chunk\":\"a\"}\n\ndata: x");
        assert_eq!(payloads, vec!["{\"type\":\"content\",\"chunk\":\"a\"}".to_string()]);

        assert_eq!(decoder.push(b"\n\n"), vec!["x".to_string()]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_multibyte_character_split_across_reads() {
        let frame = "data: 夜\n\n".as_bytes();
        let mut decoder = SseFrameDecoder::new();

        // Split inside the three-byte character
        assert!(decoder.push(&frame[..8]).is_empty());
        assert_eq!(decoder.push(&frame[8..]), vec!["夜".to_string()]);
    }

    #[test]
    fn test_comments_and_crlf() {
        let mut decoder = SseFrameDecoder::new();
        let payloads = decoder.push(b": heartbeat\r\n\r\nevent: message\r\ndata: one\r\ndata: two\r\n\r\n");

        assert_eq!(payloads, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn test_bare_cr_line_endings() {
        let mut decoder = SseFrameDecoder::new();
        let payloads = decoder.push(b"data: one\rdata: two\r\rdata: three\r\r");

        assert_eq!(payloads, vec!["one\ntwo".to_string(), "three".to_string()]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_crlf_split_across_reads() {
        let mut decoder = SseFrameDecoder::new();

        // The LF completing a CR from the previous read is not a second line end
        assert!(decoder.push(b"data: a\r").is_empty());
        assert!(decoder.push(b"\ndata: b\r").is_empty());
        assert_eq!(decoder.push(b"\n\r"), vec!["a\nb".to_string()]);
        assert!(decoder.push(b"\n").is_empty());
        assert_eq!(decoder.pending_len(), 0);
    }
}
