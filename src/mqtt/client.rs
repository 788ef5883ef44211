//! MQTT client driving a [`MqttTransport`] — in production, a thin adapter
//! over the modem engine's TCP write/read commands; in tests, an in-memory
//! duplex. Mirrors `MqttConnect`/`MqttPublish`/`MqttSubscribe`/
//! `MqttHandleResponse` in the source firmware, one packet type at a time,
//! QoS 0 only (no PUBACK/PUBREC/PUBREL/PUBCOMP handling, matching the
//! firmware's scope).

use super::packet::{self, *};
use super::MqttError;

/// Transport boundary the MQTT client is built against, so it never knows
/// whether bytes are moving over a TCP socket or a modem's `AT+CIPSEND`
/// command.
pub trait MqttTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), MqttError>;
    /// Returns newly available bytes, or an empty vec if none are waiting
    /// right now (non-blocking poll, matching the firmware's
    /// `MqttHandleResponse` being called from a periodic task rather than
    /// blocking on the socket).
    async fn poll(&mut self) -> Result<Vec<u8>, MqttError>;
}

/// Events the client surfaces after decoding a complete packet, mirroring
/// the firmware's callback set (`PublishCallback_t`,
/// `PingResponseCallback_t`, `SubscribeResponseCallback_t`,
/// `UnsubscribeResponseCallback_t`).
#[derive(Debug, Clone, PartialEq)]
pub enum MqttEvent {
    Published { topic: String, payload: Vec<u8> },
    PingResponse,
    SubscribeAck { packet_identifier: u16, success: bool },
    UnsubscribeAck { packet_identifier: u16 },
}

pub struct MqttClient<T: MqttTransport> {
    transport: T,
    rx_buf: Vec<u8>,
}

impl<T: MqttTransport> MqttClient<T> {
    pub fn new(transport: T) -> Self {
        MqttClient {
            transport,
            rx_buf: Vec::new(),
        }
    }

    pub async fn connect(
        &mut self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&str>,
        keep_alive_secs: u16,
    ) -> Result<(), MqttError> {
        let mut flags = 0x02u8; // clean session
        let mut payload = Vec::new();
        push_string(&mut payload, client_id);

        if let Some(username) = username {
            flags |= 0x80;
            push_string(&mut payload, username);
        }
        if let Some(password) = password {
            flags |= 0x40;
            push_string(&mut payload, password);
        }

        let mut body = Vec::new();
        push_string(&mut body, "MQTT");
        body.push(0x04); // protocol level 4 (3.1.1)
        body.push(flags);
        body.extend_from_slice(&keep_alive_secs.to_be_bytes());
        body.extend_from_slice(&payload);

        self.transport.send(&frame(CONNECT, &body)).await?;

        let pkt = self.read_packet_blocking().await?;
        if pkt.packet_type & PACKET_TYPE_MASK != CONNACK {
            return Err(MqttError::UnexpectedResponse(format!(
                "expected CONNACK, got {:#x}",
                pkt.packet_type
            )));
        }
        let return_code = *pkt.body.get(1).ok_or_else(|| {
            MqttError::UnexpectedResponse("truncated CONNACK".into())
        })?;
        if return_code != 0 {
            return Err(MqttError::ConnectionRefused(return_code));
        }
        Ok(())
    }

    pub async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), MqttError> {
        let mut body = Vec::new();
        push_string(&mut body, topic);
        body.extend_from_slice(payload);
        let packet_type = PUBLISH | if retain { 0x01 } else { 0x00 };
        self.transport.send(&frame(packet_type, &body)).await
    }

    pub async fn subscribe(&mut self, topic: &str, packet_identifier: u16) -> Result<(), MqttError> {
        let mut body = Vec::new();
        body.extend_from_slice(&packet_identifier.to_be_bytes());
        push_string(&mut body, topic);
        body.push(0x00); // requested QoS 0
        self.transport.send(&frame(SUBSCRIBE | 0x02, &body)).await
    }

    pub async fn unsubscribe(&mut self, topic: &str, packet_identifier: u16) -> Result<(), MqttError> {
        let mut body = Vec::new();
        body.extend_from_slice(&packet_identifier.to_be_bytes());
        push_string(&mut body, topic);
        self.transport.send(&frame(UNSUBSCRIBE | 0x02, &body)).await
    }

    pub async fn ping(&mut self) -> Result<(), MqttError> {
        self.transport.send(&frame(PINGREQ, &[])).await
    }

    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        self.transport.send(&frame(DISCONNECT, &[])).await
    }

    /// Non-blocking poll for whatever packets have arrived, decoded into
    /// zero or more events. Called from the 25 ms orchestrator tick rather
    /// than awaited inline, matching `MqttHandleResponse`'s role as a
    /// periodic, non-blocking check.
    pub async fn poll(&mut self) -> Result<Vec<MqttEvent>, MqttError> {
        let fresh = self.transport.poll().await?;
        self.rx_buf.extend_from_slice(&fresh);

        let mut events = Vec::new();
        while let Some((pkt, consumed)) = try_decode(&self.rx_buf) {
            self.rx_buf.drain(..consumed);
            if let Some(event) = decode_event(&pkt) {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn read_packet_blocking(&mut self) -> Result<Packet, MqttError> {
        loop {
            if let Some((pkt, consumed)) = try_decode(&self.rx_buf) {
                self.rx_buf.drain(..consumed);
                return Ok(pkt);
            }
            let fresh = self.transport.poll().await?;
            if fresh.is_empty() {
                return Err(MqttError::Timeout);
            }
            self.rx_buf.extend_from_slice(&fresh);
        }
    }
}

/// Tries to decode one complete packet from the front of `buf`. Returns the
/// packet and how many bytes it consumed, or `None` if more bytes are
/// needed.
fn try_decode(buf: &[u8]) -> Option<(Packet, usize)> {
    if buf.is_empty() {
        return None;
    }
    let packet_type = buf[0];
    let (len, header_len) = packet::decode_remaining_length(&buf[1..])?;
    let total = 1 + header_len + len;
    if buf.len() < total {
        return None;
    }
    let body = buf[1 + header_len..total].to_vec();
    Some((Packet { packet_type, body }, total))
}

fn decode_event(pkt: &Packet) -> Option<MqttEvent> {
    match pkt.packet_type & PACKET_TYPE_MASK {
        PUBLISH => {
            let (topic, consumed) = read_string(&pkt.body)?;
            Some(MqttEvent::Published {
                topic,
                payload: pkt.body[consumed..].to_vec(),
            })
        }
        PINGRESP => Some(MqttEvent::PingResponse),
        SUBACK => {
            let packet_identifier = u16::from_be_bytes([*pkt.body.first()?, *pkt.body.get(1)?]);
            let success = pkt.body.get(2).copied().unwrap_or(0x80) != 0x80;
            Some(MqttEvent::SubscribeAck { packet_identifier, success })
        }
        UNSUBACK => {
            let packet_identifier = u16::from_be_bytes([*pkt.body.first()?, *pkt.body.get(1)?]);
            Some(MqttEvent::UnsubscribeAck { packet_identifier })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct FakeTransport {
        sent: Vec<Vec<u8>>,
        inbound: VecDeque<Vec<u8>>,
    }

    impl MqttTransport for FakeTransport {
        async fn send(&mut self, data: &[u8]) -> Result<(), MqttError> {
            self.sent.push(data.to_vec());
            Ok(())
        }
        async fn poll(&mut self) -> Result<Vec<u8>, MqttError> {
            Ok(self.inbound.pop_front().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn connect_accepts_zero_return_code() {
        let mut connack = vec![CONNACK, 0x02, 0x00, 0x00];
        let mut transport = FakeTransport {
            sent: Vec::new(),
            inbound: VecDeque::from(vec![std::mem::take(&mut connack)]),
        };
        let sent_snapshot = std::mem::take(&mut transport.sent);
        let mut client = MqttClient::new(transport);
        client.connect("boat-1", None, None, 60).await.unwrap();
        drop(sent_snapshot);
    }

    #[tokio::test]
    async fn connect_rejects_nonzero_return_code() {
        let transport = FakeTransport {
            sent: Vec::new(),
            inbound: VecDeque::from(vec![vec![CONNACK, 0x02, 0x00, 0x05]]),
        };
        let mut client = MqttClient::new(transport);
        let err = client.connect("boat-1", None, None, 60).await.unwrap_err();
        assert_eq!(err, MqttError::ConnectionRefused(5));
    }

    #[tokio::test]
    async fn poll_decodes_publish_event() {
        let mut body = Vec::new();
        push_string(&mut body, "boat/gps");
        body.extend_from_slice(b"payload");
        let packet = frame(PUBLISH, &body);

        let transport = FakeTransport {
            sent: Vec::new(),
            inbound: VecDeque::from(vec![packet]),
        };
        let mut client = MqttClient::new(transport);
        let events = client.poll().await.unwrap();
        assert_eq!(
            events,
            vec![MqttEvent::Published {
                topic: "boat/gps".into(),
                payload: b"payload".to_vec()
            }]
        );
    }
}
