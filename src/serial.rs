//! Serial transport abstraction (C2).
//!
//! The modem engine talks to a byte stream, not literally a serial port, so
//! it is written against a small trait rather than `tokio_serial` directly
//! — the same separation the upstream crate draws between its AT client and
//! the concrete `embedded_io`/`tokio` transport wired up in its examples
//! (see `tokio-std-example/src/bin/tokio-smoltcp-ppp-mqtt.rs`, which opens
//! the tty, splits it, and hands the halves to the client). Test code
//! implements the trait over an in-memory duplex instead of a real port.

use tokio::io::{AsyncRead, AsyncWrite};

/// A duplex byte stream to the modem. Blanket-implemented for anything that
/// is both `AsyncRead` and `AsyncWrite`, so a real serial port, a
/// `tokio::io::duplex` pair in tests, or a TCP socket talking to a modem
/// emulator all work unmodified.
pub trait ModemTransport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ModemTransport for T {}

#[cfg(feature = "serial")]
pub fn open(device: &str, baud_rate: u32, flow_control: bool) -> std::io::Result<impl ModemTransport> {
    use tokio_serial::SerialPortBuilderExt;

    let mut port = tokio_serial::new(device, baud_rate).open_native_async()?;
    if flow_control {
        port.set_flow_control(tokio_serial::FlowControl::Hardware)?;
    }
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_transport<T: ModemTransport>(_: &T) {}

    #[tokio::test]
    async fn duplex_pair_satisfies_transport_bound() {
        let (a, _b) = tokio::io::duplex(64);
        assert_transport(&a);
    }
}
