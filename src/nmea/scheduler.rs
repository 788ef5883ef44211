//! Transmit scheduling: a fixed 16-slot table of registered sentences, each
//! with its own period, due time and output port, served by a periodic
//! `nmea_process`-style tick. Ported from the source firmware's rate
//! adaptation: when an output port can't keep up (its write would block or
//! queue grows), every slot's period is nudged up by a 1010/1000 factor;
//! when it's keeping up with room to spare, periods are nudged back down by
//! 999/1000, asymptotically tracking the fastest period the port can
//! actually sustain without a fixed, hand-tuned baud-specific constant.

use super::types::MessageType;
use super::MAX_TRANSMIT_SLOTS;

pub const SPEED_UP_PERMIL: u32 = 999;
pub const SLOW_DOWN_PERMIL: u32 = 1010;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmitSlot {
    pub message_type: MessageType,
    pub port: u8,
    pub period_ms: u32,
    pub due_at_ms: i64,
    pub enabled: bool,
}

pub struct NmeaScheduler {
    slots: Vec<TransmitSlot>,
}

impl NmeaScheduler {
    pub fn new() -> Self {
        NmeaScheduler { slots: Vec::with_capacity(MAX_TRANSMIT_SLOTS) }
    }

    /// Registers a sentence for periodic transmission. Returns `false`
    /// (matching `nmea_enable_transmit_message`'s overflow behavior) if all
    /// 16 slots are already taken, without registering anything.
    pub fn enable(&mut self, message_type: MessageType, port: u8, period_ms: u32, now_ms: i64) -> bool {
        if self.slots.len() >= MAX_TRANSMIT_SLOTS {
            return false;
        }
        if let Some(existing) = self
            .slots
            .iter_mut()
            .find(|s| s.message_type == message_type && s.port == port)
        {
            existing.period_ms = period_ms;
            existing.enabled = true;
            return true;
        }
        self.slots.push(TransmitSlot {
            message_type,
            port,
            period_ms,
            due_at_ms: now_ms,
            enabled: true,
        });
        true
    }

    pub fn disable(&mut self, message_type: MessageType, port: u8) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.message_type == message_type && s.port == port)
        {
            slot.enabled = false;
        }
    }

    /// Forces the next due time for a slot to "now", so the next tick sends
    /// it immediately regardless of its period (`nmea_transmit_message_now`).
    pub fn transmit_now(&mut self, message_type: MessageType, port: u8, now_ms: i64) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.message_type == message_type && s.port == port)
        {
            slot.due_at_ms = now_ms;
        }
    }

    /// Returns every slot due at or before `now_ms`, and reschedules each
    /// for its next period.
    pub fn due(&mut self, now_ms: i64) -> Vec<TransmitSlot> {
        let mut fired = Vec::new();
        for slot in self.slots.iter_mut().filter(|s| s.enabled) {
            if slot.due_at_ms <= now_ms {
                fired.push(*slot);
                slot.due_at_ms = now_ms + slot.period_ms as i64;
            }
        }
        fired
    }

    /// Applies the proportional rate adjustment for one output port: every
    /// enabled slot on that port has its period scaled by `permil / 1000`.
    pub fn adjust_port_rate(&mut self, port: u8, permil: u32) {
        for slot in self.slots.iter_mut().filter(|s| s.port == port) {
            let adjusted = (slot.period_ms as u64 * permil as u64) / 1000;
            slot.period_ms = adjusted.max(1) as u32;
        }
    }

    pub fn speed_up(&mut self, port: u8) {
        self.adjust_port_rate(port, SPEED_UP_PERMIL);
    }

    pub fn slow_down(&mut self, port: u8) {
        self.adjust_port_rate(port, SLOW_DOWN_PERMIL);
    }

    pub fn slots(&self) -> &[TransmitSlot] {
        &self.slots
    }
}

impl Default for NmeaScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_rejects_beyond_sixteen_slots() {
        let mut s = NmeaScheduler::new();
        for i in 0..MAX_TRANSMIT_SLOTS {
            let port = (i % 2) as u8;
            // cycle through distinct message types to avoid slot reuse
            let mt = [
                MessageType::Gga,
                MessageType::Rmc,
                MessageType::Vhw,
                MessageType::Mwv,
                MessageType::Mtw,
                MessageType::Dpt,
                MessageType::Hdt,
                MessageType::Hdm,
                MessageType::Mwd,
                MessageType::Vlw,
                MessageType::Apb,
                MessageType::Rmb,
                MessageType::Vdm,
                MessageType::Xdr,
                MessageType::Mda,
                MessageType::Gga,
            ][i];
            assert!(s.enable(mt, port, 1000, 0) || i >= MAX_TRANSMIT_SLOTS);
        }
        assert!(!s.enable(MessageType::Rmc, 1, 1000, 0));
    }

    #[test]
    fn due_reschedules_for_next_period() {
        let mut s = NmeaScheduler::new();
        s.enable(MessageType::Gga, 0, 1000, 0);
        assert_eq!(s.due(0).len(), 1);
        assert_eq!(s.due(500).len(), 0);
        assert_eq!(s.due(1000).len(), 1);
    }

    #[test]
    fn slow_down_then_speed_up_converges_back() {
        let mut s = NmeaScheduler::new();
        s.enable(MessageType::Gga, 0, 1000, 0);
        s.slow_down(0);
        let after_slow = s.slots()[0].period_ms;
        assert!(after_slow > 1000);
        for _ in 0..200 {
            s.speed_up(0);
        }
        assert!(s.slots()[0].period_ms < after_slow);
    }
}
