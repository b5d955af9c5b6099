//! Minimal Server-Sent Events parser for streamed model responses.
//!
//! The streaming endpoint emits `data: {json}` events separated by blank
//! lines. This parser feeds on raw byte chunks (which can split lines and
//! even UTF-8 sequences arbitrarily) and yields complete data payloads.

/// Incremental SSE parser. Feed byte chunks, collect data payloads.
#[derive(Debug, Default)]
pub struct SseLineParser {
    /// Undecoded byte tail (possible partial UTF-8 sequence).
    byte_carry: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    line_carry: String,
    /// `data:` lines of the event currently being assembled.
    data_lines: Vec<String>,
}

impl SseLineParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes; returns any data payloads completed by it.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        self.byte_carry.extend_from_slice(bytes);

        let (text, rest) = match std::str::from_utf8(&self.byte_carry) {
            Ok(s) => (s.to_owned(), Vec::new()),
            Err(e) => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.byte_carry[..valid]).into_owned();
                (text, self.byte_carry[valid..].to_vec())
            }
        };
        self.byte_carry = rest;

        let mut payloads = Vec::new();
        self.line_carry.push_str(&text);
        while let Some(newline) = self.line_carry.find('\n') {
            let line: String = self.line_carry.drain(..=newline).collect();
            if let Some(payload) = self.process_line(line.trim_end_matches(['\n', '\r'])) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.line_carry.is_empty() {
            let line = std::mem::take(&mut self.line_carry);
            self.process_line(line.trim_end_matches('\r'));
        }
        self.take_event()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        // Blank line terminates the current event.
        if line.is_empty() {
            return self.take_event();
        }
        // Comment line.
        if line.starts_with(':') {
            return None;
        }
        if let Some((field, value)) = line.split_once(':') {
            if field == "data" {
                self.data_lines.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
            }
            // `event:`/`id:` and unknown fields are ignored; the endpoint
            // only uses data events.
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data_lines).join("\n"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn parses_single_event() {
        let mut p = SseLineParser::new();
        let out = p.push_bytes(b"data: {\"a\":1}\n\n");
        assert_eq!(out, vec!["{\"a\":1}".to_owned()]);
    }

    #[test]
    fn joins_multiline_data() {
        let mut p = SseLineParser::new();
        let out = p.push_bytes(b"data: line1\ndata: line2\n\n");
        assert_eq!(out, vec!["line1\nline2".to_owned()]);
    }

    #[test]
    fn handles_events_split_across_chunks() {
        let mut p = SseLineParser::new();
        assert!(p.push_bytes(b"data: {\"te").is_empty());
        let out = p.push_bytes(b"xt\":\"hi\"}\n\ndata: {\"x\":2}\n\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "{\"text\":\"hi\"}");
    }

    #[test]
    fn handles_crlf_and_comments() {
        let mut p = SseLineParser::new();
        let out = p.push_bytes(b": keepalive\r\ndata: x\r\n\r\n");
        assert_eq!(out, vec!["x".to_owned()]);
    }

    #[test]
    fn split_utf8_sequence_survives_chunk_boundary() {
        let text = "data: héllo\n\n".as_bytes();
        // Split in the middle of the two-byte 'é'.
        let cut = text.iter().position(|&b| b == 0xc3).unwrap() + 1;
        let mut p = SseLineParser::new();
        assert!(p.push_bytes(&text[..cut]).is_empty());
        let out = p.push_bytes(&text[cut..]);
        assert_eq!(out, vec!["héllo".to_owned()]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut p = SseLineParser::new();
        assert!(p.push_bytes(b"data: tail").is_empty());
        assert_eq!(p.finish(), Some("tail".to_owned()));
        assert_eq!(p.finish(), None);
    }
}
