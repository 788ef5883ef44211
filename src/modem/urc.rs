//! Unsolicited result codes the engine can see interleaved with a command's
//! own response lines, and must dispatch to the orchestrator rather than
//! mistake for part of the in-flight exchange.

#[derive(Debug, Clone, PartialEq)]
pub enum Urc {
    /// `+CREG: <n>,<stat>` arriving unprompted (registration state change).
    NetworkRegistration { stat: u8 },
    /// `+CIPRXGET: 1,<len>` — inbound TCP data is waiting (manual-read URC).
    TcpDataWaiting { len: usize },
    /// `CONNECT OK` — the actual success signal for `AT+CIPSTART`, arriving
    /// as a URC rather than the command's own final status line.
    TcpConnected,
    /// `CLOSED` — the TCP peer closed the connection.
    TcpClosed,
    /// `+PDP: DEACT` — the network deactivated the PDP context out from
    /// under us.
    PdpDeactivated,
    /// `+CMTI: "SM",<index>` — a new SMS has landed in storage slot `index`.
    SmsReceived { index: u32 },
}

impl Urc {
    /// Attempts to parse one already-trimmed line as a URC. Returns `None`
    /// for anything that isn't a recognized unsolicited code, leaving the
    /// caller free to treat the line as part of an in-flight command's
    /// response instead.
    pub fn parse(line: &str) -> Option<Urc> {
        if let Some(rest) = line.strip_prefix("+CREG: ") {
            let stat: u8 = rest.split(',').nth(1).unwrap_or(rest).trim().parse().ok()?;
            return Some(Urc::NetworkRegistration { stat });
        }
        if let Some(rest) = line.strip_prefix("+CIPRXGET: 1,") {
            let len: usize = rest.trim().parse().ok()?;
            return Some(Urc::TcpDataWaiting { len });
        }
        if line == "CONNECT OK" {
            return Some(Urc::TcpConnected);
        }
        if line == "CLOSED" {
            return Some(Urc::TcpClosed);
        }
        if line == "+PDP: DEACT" {
            return Some(Urc::PdpDeactivated);
        }
        if let Some(rest) = line.strip_prefix("+CMTI: \"SM\",") {
            let index: u32 = rest.trim().parse().ok()?;
            return Some(Urc::SmsReceived { index });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registration_urc() {
        assert_eq!(
            Urc::parse("+CREG: 1,1"),
            Some(Urc::NetworkRegistration { stat: 1 })
        );
    }

    #[test]
    fn parses_tcp_data_waiting() {
        assert_eq!(
            Urc::parse("+CIPRXGET: 1,42"),
            Some(Urc::TcpDataWaiting { len: 42 })
        );
    }

    #[test]
    fn parses_sms_received() {
        assert_eq!(Urc::parse("+CMTI: \"SM\",3"), Some(Urc::SmsReceived { index: 3 }));
    }

    #[test]
    fn non_urc_line_is_none() {
        assert_eq!(Urc::parse("OK"), None);
        assert_eq!(Urc::parse("+CIPRXGET: 2,4"), None);
    }

    #[test]
    fn parses_tcp_connected() {
        assert_eq!(Urc::parse("CONNECT OK"), Some(Urc::TcpConnected));
    }

    #[test]
    fn parses_pdp_deactivated() {
        assert_eq!(Urc::parse("+PDP: DEACT"), Some(Urc::PdpDeactivated));
    }
}
