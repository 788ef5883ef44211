//! AT command set and result codes, mirroring `AtCommand_t` / `ModemStatus_t`
//! in the source firmware's `modem.h`.

use std::fmt;

/// One modem command group. Each variant knows how to render itself as the
/// literal AT command line the engine writes to the transport; payload
/// arguments are carried by the variant itself rather than a side struct, to
/// keep command construction and encoding next to each other.
#[derive(Debug, Clone, PartialEq)]
pub enum AtCommand {
    Hello,
    NetworkRegistration,
    SignalStrength,
    SetManualDataRead,
    ConfigureDataConnection { apn: String, username: String, password: String },
    ActivateDataConnection,
    GetOwnIpAddress,
    OpenTcpConnection { host: String, port: u16 },
    TcpWrite { len: usize },
    GetTcpReadDataWaitingLength,
    TcpRead { len: usize },
    CloseTcpConnection,
    DeactivateDataConnection,
    SetSmsPduMode,
    SetSmsReceiveMode,
    SmsReceiveMessage { index: u32 },
    SmsSendMessage { pdu_len: usize },
    SmsDeleteAllMessages,
    PowerDown,
    GetOperatorDetails,
    GetImei,
}

impl AtCommand {
    /// Renders the command line, without trailing CRLF (the engine appends
    /// that when it writes).
    pub fn encode(&self) -> String {
        match self {
            AtCommand::Hello => "AT".into(),
            AtCommand::NetworkRegistration => "AT+CREG?".into(),
            AtCommand::SignalStrength => "AT+CSQ".into(),
            AtCommand::SetManualDataRead => "AT+CIPRXGET=1".into(),
            AtCommand::ConfigureDataConnection { apn, username, password } => {
                format!("AT+CSTT=\"{apn}\",\"{username}\",\"{password}\"")
            }
            AtCommand::ActivateDataConnection => "AT+CIICR".into(),
            AtCommand::GetOwnIpAddress => "AT+CIFSR".into(),
            AtCommand::OpenTcpConnection { host, port } => {
                format!("AT+CIPSTART=\"TCP\",\"{host}\",\"{port}\"")
            }
            AtCommand::TcpWrite { len } => format!("AT+CIPSEND={len}"),
            AtCommand::GetTcpReadDataWaitingLength => "AT+CIPRXGET=4".into(),
            AtCommand::TcpRead { len } => format!("AT+CIPRXGET=2,{len}"),
            AtCommand::CloseTcpConnection => "AT+CIPCLOSE".into(),
            AtCommand::DeactivateDataConnection => "AT+CIPSHUT".into(),
            AtCommand::SetSmsPduMode => "AT+CMGF=0".into(),
            AtCommand::SetSmsReceiveMode => "AT+CNMI=2,1,0,0,0".into(),
            AtCommand::SmsReceiveMessage { index } => format!("AT+CMGR={index}"),
            AtCommand::SmsSendMessage { pdu_len } => format!("AT+CMGS={pdu_len}"),
            AtCommand::SmsDeleteAllMessages => "AT+CMGD=1,4".into(),
            AtCommand::PowerDown => "AT+CPOWD=1".into(),
            AtCommand::GetOperatorDetails => "AT+COPS?".into(),
            AtCommand::GetImei => "AT+GSN".into(),
        }
    }

    /// Whether this command expects the modem to emit a `"> "` prompt before
    /// its payload, rather than a plain command line followed directly by a
    /// result code (`AT+CIPSEND`, `AT+CMGS`).
    pub fn expects_prompt(&self) -> bool {
        matches!(self, AtCommand::TcpWrite { .. } | AtCommand::SmsSendMessage { .. })
    }
}

/// Final result of a command exchange, mirroring `ModemStatus_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemStatus {
    Ok,
    CloseOk,
    ShutOk,
    SendOk,
    Closed,
    PoweredDown,
    Error,
    Timeout,
    NoResponse,
    UnexpectedResponse,
    Overflow,
    BadParameter,
    TcpAlreadyConnected,
    FatalError,
}

impl ModemStatus {
    pub fn is_ok(self) -> bool {
        matches!(
            self,
            ModemStatus::Ok
                | ModemStatus::CloseOk
                | ModemStatus::ShutOk
                | ModemStatus::SendOk
                | ModemStatus::Closed
                | ModemStatus::PoweredDown
        )
    }
}

impl fmt::Display for ModemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModemStatus::Ok => "OK",
            ModemStatus::CloseOk => "CLOSE OK",
            ModemStatus::ShutOk => "SHUT OK",
            ModemStatus::SendOk => "SEND OK",
            ModemStatus::Closed => "CLOSED",
            ModemStatus::PoweredDown => "POWERED DOWN",
            ModemStatus::Error => "ERROR",
            ModemStatus::Timeout => "TIMEOUT",
            ModemStatus::NoResponse => "NO RESPONSE",
            ModemStatus::UnexpectedResponse => "UNEXPECTED RESPONSE",
            ModemStatus::Overflow => "OVERFLOW",
            ModemStatus::BadParameter => "BAD PARAMETER",
            ModemStatus::TcpAlreadyConnected => "TCP ALREADY CONNECTED",
            ModemStatus::FatalError => "FATAL ERROR",
        };
        write!(f, "{s}")
    }
}
