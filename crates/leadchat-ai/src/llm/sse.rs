//! Server-sent event framing over a raw byte stream.

/// Accumulates raw bytes and hands out complete SSE events.
///
/// Bytes are buffered undecoded so a multi-byte character split across two
/// network reads is only decoded once the whole event has arrived.
#[derive(Debug, Default)]
pub(crate) struct SseBuffer {
    buf: Vec<u8>,
}

impl SseBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the `data` payload of the next complete event.
    ///
    /// Events without any `data:` line (comments, keep-alives) are skipped.
    pub(crate) fn next_data(&mut self) -> Option<String> {
        loop {
            let (end, delimiter_len) = find_event_end(&self.buf)?;
            let event: Vec<u8> = self.buf.drain(..end + delimiter_len).take(end).collect();
            if let Some(data) = extract_data(&String::from_utf8_lossy(&event)) {
                return Some(data);
            }
        }
    }

    /// Whatever remains once the connection has closed.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        extract_data(&String::from_utf8_lossy(&rest))
    }
}

fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|pos| (pos, 2));
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| (pos, 4));

    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn extract_data(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
