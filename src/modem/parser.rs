//! Line-oriented reassembly of the modem's byte stream into discrete lines,
//! and classification of a line as an echo, a URC, a final result code, or
//! an intermediate response line belonging to the in-flight command.

use super::command::ModemStatus;
use super::urc::Urc;

/// One classified unit pulled off the line reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// The command's own echo (the modem echoes the line it was sent before
    /// replying). Discarded by the engine rather than treated as data.
    Echo(String),
    Urc(Urc),
    /// A terminal result code ending the current exchange.
    Final(ModemStatus),
    /// Any other line, handed to the in-flight command's own response
    /// decoder.
    Data(String),
}

/// Accumulates bytes from the transport and yields complete CRLF-terminated
/// lines. The modem's prompt (`"> "`) has no terminator, so callers that are
/// waiting on a prompt must poll [`LineReader::take_prompt`] instead of
/// `next_line`.
#[derive(Default)]
pub struct LineReader {
    buf: Vec<u8>,
}

impl LineReader {
    pub fn new() -> Self {
        LineReader { buf: Vec::new() }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pops one complete line (CRLF-terminated) out of the buffer, if one is
    /// present. Blank lines (a bare CRLF) are dropped silently, matching the
    /// firmware's line parser, which never hands an empty line up to the
    /// command layer.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.buf.windows(2).position(|w| w == b"\r\n")?;
            let line_bytes = self.buf.drain(..pos + 2).collect::<Vec<u8>>();
            let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 2]).into_owned();
            if !line.is_empty() {
                return Some(line);
            }
        }
    }

    /// Consumes a bare `"> "` prompt from the front of the buffer, if
    /// present, without requiring a line terminator.
    pub fn take_prompt(&mut self) -> bool {
        if self.buf.starts_with(b"> ") {
            self.buf.drain(..2);
            true
        } else {
            false
        }
    }

    /// Number of bytes currently buffered, for callers waiting on a known
    /// binary payload length before a line terminator can be trusted.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Removes and returns the first `len` raw bytes, bypassing line
    /// framing entirely. Used for TCP read payloads, which may contain
    /// embedded `\r\n` sequences.
    pub fn take_bytes(&mut self, len: usize) -> Vec<u8> {
        self.buf.drain(..len).collect()
    }
}

/// Classifies one already-extracted line, given the literal command line
/// that was sent (so the echo can be recognized and dropped).
pub fn classify(line: &str, sent_command: &str) -> Line {
    if line == sent_command {
        return Line::Echo(line.to_string());
    }
    if let Some(urc) = Urc::parse(line) {
        return Line::Urc(urc);
    }
    if let Some(status) = parse_final(line) {
        return Line::Final(status);
    }
    Line::Data(line.to_string())
}

fn parse_final(line: &str) -> Option<ModemStatus> {
    Some(match line {
        "OK" => ModemStatus::Ok,
        "ERROR" => ModemStatus::Error,
        "CLOSE OK" => ModemStatus::CloseOk,
        "SHUT OK" => ModemStatus::ShutOk,
        "SEND OK" => ModemStatus::SendOk,
        _ if line.starts_with("+CME ERROR") || line.starts_with("+CMS ERROR") => ModemStatus::Error,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_lines_across_feeds() {
        let mut r = LineReader::new();
        r.feed(b"AT+CSQ\r\n+CSQ: 2");
        assert_eq!(r.next_line(), Some("AT+CSQ".to_string()));
        assert_eq!(r.next_line(), None);
        r.feed(b"2,0\r\nOK\r\n");
        assert_eq!(r.next_line(), Some("+CSQ: 22,0".to_string()));
        assert_eq!(r.next_line(), Some("OK".to_string()));
        assert_eq!(r.next_line(), None);
    }

    #[test]
    fn drops_blank_lines() {
        let mut r = LineReader::new();
        r.feed(b"\r\nOK\r\n");
        assert_eq!(r.next_line(), Some("OK".to_string()));
    }

    #[test]
    fn takes_prompt_without_terminator() {
        let mut r = LineReader::new();
        r.feed(b"> ");
        assert!(r.take_prompt());
        assert!(!r.take_prompt());
    }

    #[test]
    fn classifies_echo_urc_final_and_data() {
        assert_eq!(classify("AT+CSQ", "AT+CSQ"), Line::Echo("AT+CSQ".into()));
        assert_eq!(
            classify("+CMTI: \"SM\",1", "AT+CSQ"),
            Line::Urc(Urc::SmsReceived { index: 1 })
        );
        assert_eq!(classify("OK", "AT+CSQ"), Line::Final(ModemStatus::Ok));
        assert_eq!(classify("+CSQ: 22,0", "AT+CSQ"), Line::Data("+CSQ: 22,0".into()));
    }
}
