//! End-to-end exercise of the modem engine over an in-memory duplex pair,
//! standing in for a real serial port: echo consumption, a URC arriving
//! between a command's own response lines, and prompt-gated writes.

use std::time::Duration;

use boat_iot_gateway::modem::command::{AtCommand, ModemStatus};
use boat_iot_gateway::modem::engine::ModemEngine;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Reads from `stream` until the accumulated bytes contain `pattern`,
/// tolerating the underlying duplex splitting one logical write across
/// several `read()` calls.
async fn read_until(stream: &mut DuplexStream, pattern: &str) -> String {
    let mut acc = Vec::new();
    loop {
        let mut chunk = [0u8; 64];
        let n = stream.read(&mut chunk).await.unwrap();
        acc.extend_from_slice(&chunk[..n]);
        if String::from_utf8_lossy(&acc).contains(pattern) {
            return String::from_utf8_lossy(&acc).into_owned();
        }
    }
}

#[tokio::test]
async fn hello_command_round_trips_through_echo_and_ok() {
    let (client, mut modem_end) = tokio::io::duplex(256);
    let (engine, _urc_rx) = ModemEngine::new(client, 8);

    let responder = tokio::spawn(async move {
        let seen = read_until(&mut modem_end, "AT\r\n").await;
        assert_eq!(seen, "AT\r\n");
        modem_end.write_all(b"AT\r\nOK\r\n").await.unwrap();
    });

    let exchange = engine
        .command(AtCommand::Hello, None, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(exchange.status, Some(ModemStatus::Ok));

    responder.await.unwrap();
}

#[tokio::test]
async fn urc_between_command_lines_is_forwarded_not_mistaken_for_data() {
    let (client, mut modem_end) = tokio::io::duplex(256);
    let (engine, mut urc_rx) = ModemEngine::new(client, 8);

    let responder = tokio::spawn(async move {
        read_until(&mut modem_end, "AT+CSQ\r\n").await;
        modem_end
            .write_all(b"AT+CSQ\r\n+CMTI: \"SM\",4\r\n+CSQ: 20,0\r\nOK\r\n")
            .await
            .unwrap();
    });

    let exchange = engine
        .command(AtCommand::SignalStrength, None, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(exchange.status, Some(ModemStatus::Ok));
    assert_eq!(exchange.lines, vec!["+CSQ: 20,0".to_string()]);

    let urc = urc_rx.recv().await.unwrap();
    assert_eq!(urc, boat_iot_gateway::modem::Urc::SmsReceived { index: 4 });

    responder.await.unwrap();
}

#[tokio::test]
async fn tcp_write_waits_for_prompt_before_sending_payload() {
    let (client, mut modem_end) = tokio::io::duplex(256);
    let (engine, _urc_rx) = ModemEngine::new(client, 8);

    let responder = tokio::spawn(async move {
        read_until(&mut modem_end, "AT+CIPSEND=5\r\n").await;
        modem_end.write_all(b"AT+CIPSEND=5\r\n> ").await.unwrap();

        let payload = read_until(&mut modem_end, "hello").await;
        assert_eq!(payload, "hello");
        modem_end.write_all(b"\r\nSEND OK\r\n").await.unwrap();
    });

    let exchange = engine
        .command(AtCommand::TcpWrite { len: 5 }, Some(b"hello"), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(exchange.status, Some(ModemStatus::SendOk));

    responder.await.unwrap();
}

#[tokio::test]
async fn command_times_out_when_no_final_status_arrives() {
    let (client, _modem_end) = tokio::io::duplex(256);
    let (engine, _urc_rx) = ModemEngine::new(client, 8);

    let result = engine.command(AtCommand::Hello, None, Duration::from_millis(50)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn open_tcp_connection_waits_for_connect_ok_urc() {
    let (client, mut modem_end) = tokio::io::duplex(256);
    let (engine, _urc_rx) = ModemEngine::new(client, 8);

    let responder = tokio::spawn(async move {
        read_until(&mut modem_end, "AT+CIPSTART=\"TCP\",\"broker\",\"1883\"\r\n").await;
        modem_end
            .write_all(b"AT+CIPSTART=\"TCP\",\"broker\",\"1883\"\r\nOK\r\nCONNECT OK\r\n")
            .await
            .unwrap();
    });

    assert!(!engine.tcp_connected());
    let exchange = engine
        .command(
            AtCommand::OpenTcpConnection { host: "broker".into(), port: 1883 },
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert_eq!(exchange.status, Some(ModemStatus::Ok));
    assert!(engine.tcp_connected());

    responder.await.unwrap();
}

#[tokio::test]
async fn activate_and_deactivate_track_pdp_state() {
    let (client, mut modem_end) = tokio::io::duplex(256);
    let (engine, _urc_rx) = ModemEngine::new(client, 8);

    let responder = tokio::spawn(async move {
        read_until(&mut modem_end, "AT+CIICR\r\n").await;
        modem_end.write_all(b"AT+CIICR\r\nOK\r\n").await.unwrap();
        read_until(&mut modem_end, "AT+CIPSHUT\r\n").await;
        modem_end.write_all(b"AT+CIPSHUT\r\nSHUT OK\r\n").await.unwrap();
    });

    engine
        .command(AtCommand::ActivateDataConnection, None, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(engine.pdp_activated());

    engine
        .command(AtCommand::DeactivateDataConnection, None, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(!engine.pdp_activated());

    responder.await.unwrap();
}
