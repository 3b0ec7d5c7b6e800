use crate::event::Event;

/// Accumulates raw output chunks and yields the events of every complete line.
///
/// The incomplete trailing segment is held back until more input (or
/// [`LineBuffer::flush`]) completes it. Bytes are buffered rather than text so
/// a chunk boundary inside a multi-byte character cannot corrupt a line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text chunk and returns the events of all lines it completed.
    pub fn feed(&mut self, chunk: &str) -> Vec<Event> {
        self.feed_bytes(chunk.as_bytes())
    }

    /// Byte-level variant of [`LineBuffer::feed`], used directly on pipe reads.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(chunk);
        let Some(last_newline) = self.buf.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = self.buf.drain(..=last_newline).collect();
        complete
            .split(|b| *b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// Decodes whatever is left as a final line and clears the buffer.
    pub fn flush(&mut self) -> Vec<Event> {
        let rest = std::mem::take(&mut self.buf);
        decode_line(&rest).into_iter().collect()
    }
}

fn decode_line(bytes: &[u8]) -> Option<Event> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Event::parse_line(&String::from_utf8_lossy(bytes))
}

/// Decodes a complete captured output in one pass (`feed` + `flush`).
pub fn decode_all(output: &str) -> Vec<Event> {
    let mut buffer = LineBuffer::new();
    let mut events = buffer.feed(output);
    events.extend(buffer.flush());
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "{\"type\":\"system\",\"session_id\":\"s1\"}\n",
        "{\"type\":\"assistant\",\"message\":{\"content\":[{\"type\":\"text\",\"text\":\"héllo → wörld\"}]}}\n",
        "\n",
        "{\"type\":\"result\",\"result\":\"done\",\"session_id\":\"s1\"}"
    );

    fn line_by_line(stream: &str) -> Vec<Event> {
        stream.lines().filter_map(Event::parse_line).collect()
    }

    #[test]
    fn holds_back_partial_line_until_completed() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.feed("{\"type\":\"sys").is_empty());
        let events = buffer.feed("tem\"}\n{\"type\":");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), Some("system"));
        let tail = buffer.flush();
        assert!(tail.is_empty(), "incomplete JSON is dropped on flush");
        let after = buffer.feed("{\"type\":\"result\"}\n");
        assert_eq!(after.len(), 1, "flush clears the remainder");
    }

    #[test]
    fn flush_decodes_unterminated_final_line() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.feed("{\"type\":\"result\"}").is_empty());
        let events = buffer.flush();
        assert_eq!(events.len(), 1);
        assert!(buffer.flush().is_empty());
    }

    #[test]
    fn every_chunking_matches_line_by_line_parse() {
        let expected = line_by_line(STREAM);
        assert_eq!(expected.len(), 3);
        let bytes = STREAM.as_bytes();
        for size in 1..=bytes.len() {
            let mut buffer = LineBuffer::new();
            let mut events = Vec::new();
            for chunk in bytes.chunks(size) {
                events.extend(buffer.feed_bytes(chunk));
            }
            events.extend(buffer.flush());
            assert_eq!(events, expected, "chunk size {size}");
        }
    }

    #[test]
    fn uneven_split_points_match_line_by_line_parse() {
        let expected = line_by_line(STREAM);
        let bytes = STREAM.as_bytes();
        for first in 0..bytes.len() {
            for second in first..bytes.len() {
                let mut buffer = LineBuffer::new();
                let mut events = buffer.feed_bytes(&bytes[..first]);
                events.extend(buffer.feed_bytes(&bytes[first..second]));
                events.extend(buffer.feed_bytes(&bytes[second..]));
                events.extend(buffer.flush());
                assert_eq!(events, expected, "split at {first}/{second}");
            }
        }
    }

    #[test]
    fn malformed_line_between_valid_events_is_skipped() {
        let events = decode_all("{\"type\":\"a\"}\nnot json\n{\"type\":\"b\"}\n");
        let types: Vec<_> = events.iter().filter_map(Event::event_type).collect();
        assert_eq!(types, vec!["a", "b"]);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let events = decode_all("{\"type\":\"a\"}\r\n{\"type\":\"b\"}\r\n");
        assert_eq!(events.len(), 2);
    }
}
