//! Incremental parser for `text/event-stream` bodies
//!
//! Chunks arrive at arbitrary boundaries, including in the middle of a line
//! or of a multi-byte character, so bytes are buffered until a full line is
//! available. Lines end with `\n` or `\r\n`.

/// One dispatched event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
    pub id: Option<String>,
}

impl SseFrame {
    /// Event name, `message` when the stream did not set one
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        // comment, used for keep-alives
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let frames = parser.push(b"event: Snapshot\ndata: {\"a\":1}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_type(), "Snapshot");
        assert_eq!(frames[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_split_chunks_and_crlf() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: Track").is_empty());
        assert!(parser.push(b"Changed\r\ndata: x").is_empty());
        let frames = parser.push(b"yz\r\n\r\n");
        assert_eq!(frames[0].event_type(), "TrackChanged");
        assert_eq!(frames[0].data, "xyz");
    }

    #[test]
    fn test_split_multibyte_character() {
        let mut parser = SseParser::new();
        let bytes = "data: Sigur Rós\n\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        assert!(parser.push(&bytes[..split]).is_empty());
        let frames = parser.push(&bytes[split..]);
        assert_eq!(frames[0].data, "Sigur Rós");
        assert_eq!(frames[0].event_type(), "message");
    }

    #[test]
    fn test_comments_and_multiline_data() {
        let mut parser = SseParser::new();
        let frames = parser.push(b":keep-alive\n\ndata: one\ndata: two\nid: 7\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "one\ntwo");
        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_event_name_does_not_leak_into_next_frame() {
        let mut parser = SseParser::new();
        let frames = parser.push(b"event: WentLive\ndata: 1\n\ndata: 2\n\n");
        assert_eq!(frames[0].event_type(), "WentLive");
        assert_eq!(frames[1].event_type(), "message");
    }
}
