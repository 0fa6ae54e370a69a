//! # Server-sent-events frame decoder.
//!
//! Incremental: bytes arrive in arbitrary chunks and [`FrameDecoder::feed`]
//! returns the frames completed so far.
//!
//! ```text
//! event: status_update_event\n     ┐
//! id: 42\n                         │ one frame
//! data: {"eventType": ...\n        │ (data lines joined with '\n')
//! data: ...}\n                     │
//! \n                               ┘ ◄── blank line dispatches
//! : keep-alive\n                     ◄── comment, ignored
//! ```
//!
//! ## Rules
//! - Lines end with `\n`, `\r\n` or `\r`
//! - `field: value` strips one leading space from the value; a line with no
//!   colon is a field with an empty value
//! - A frame with no `data` line is skipped
//! - `id` carries over to later frames until replaced

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// `event:` field, if the frame named one.
    pub event: Option<String>,
    /// Concatenated `data:` lines.
    pub data: String,
    /// Last seen `id:` field.
    pub id: Option<String>,
}

/// Stateful line splitter and frame assembler.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    // a chunk ended on '\r'; a leading '\n' in the next chunk belongs to it
    skip_lf: bool,
    event: Option<String>,
    data: Option<String>,
    last_id: Option<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the current, not yet terminated line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Consumes `chunk` and returns every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut rest = chunk;

        if self.skip_lf {
            self.skip_lf = false;
            if let Some(stripped) = rest.strip_prefix(b"\n") {
                rest = stripped;
            }
        }

        while let Some(pos) = rest.iter().position(|&b| b == b'\n' || b == b'\r') {
            self.buf.extend_from_slice(&rest[..pos]);
            let line = std::mem::take(&mut self.buf);
            if let Some(frame) = self.line(&line) {
                frames.push(frame);
            }

            let terminator = rest[pos];
            rest = &rest[pos + 1..];
            if terminator == b'\r' {
                match rest.first() {
                    Some(b'\n') => rest = &rest[1..],
                    None => self.skip_lf = true,
                    Some(_) => {}
                }
            }
        }
        self.buf.extend_from_slice(rest);
        frames
    }

    fn line(&mut self, raw: &[u8]) -> Option<Frame> {
        if raw.is_empty() {
            return self.dispatch();
        }
        let line = String::from_utf8_lossy(raw);
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };
        match field {
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = self.event.take();
        let data = self.data.take()?;
        Some(Frame {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_blank_line() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"event: deployment_info\ndata: {\"a\":1}\n\n");
        assert_eq!(
            frames,
            vec![Frame {
                event: Some("deployment_info".into()),
                data: "{\"a\":1}".into(),
                id: None,
            }]
        );
    }

    #[test]
    fn frames_may_span_chunks_and_line_endings() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: first\r").is_empty());
        assert!(decoder.feed(b"\ndata: sec").is_empty());
        let frames = decoder.feed(b"ond\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[test]
    fn comments_and_dataless_frames_are_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b": keep-alive\n\nevent: ping\n\ndata:x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn id_persists_across_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"id: 7\ndata: a\n\ndata: b\n\nid: 8\ndata: c\n\n");
        let ids: Vec<_> = frames.iter().map(|f| f.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("7"), Some("7"), Some("8")]);
    }

    #[test]
    fn unterminated_line_stays_pending() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        assert_eq!(decoder.pending(), 10);
        decoder.feed(b"}\n");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn only_one_leading_space_is_stripped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"data:  two\ndata\n\n");
        assert_eq!(frames[0].data, " two\n");
    }
}
