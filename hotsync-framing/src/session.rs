//! PADP session logic: fragmentation/reassembly, per-fragment acking, and
//! the retransmit-with-timeout loop described in spec §4.1.
//!
//! This module is transport-agnostic: it drives anything implementing
//! [`PacketDuplex`], which is expected to be backed by an SLP-framed byte
//! duplex in production and by an in-memory fake in tests.

use crate::error::{FramingError, FramingResult};
use crate::padp::{PadpPacket, PadpPacketType, FLAG_FIRST, FLAG_LAST};
use std::time::Duration;
use tracing::debug;

/// Tunables named in spec §6: fragment size, ack timeout, max retransmits.
#[derive(Debug, Clone, Copy)]
pub struct PadpConfig {
    pub fragment_size: usize,
    pub ack_timeout: Duration,
    pub max_retransmits: u32,
}

impl Default for PadpConfig {
    fn default() -> Self {
        Self {
            fragment_size: 1024,
            ack_timeout: Duration::from_secs(2),
            max_retransmits: 10,
        }
    }
}

/// One exchange of PADP packets with an SLP peer. Implementors are
/// responsible for the SLP encode/decode and socket framing; this trait
/// only moves already-decoded [`PadpPacket`]s.
pub trait PacketDuplex {
    fn send(&mut self, packet: &PadpPacket) -> FramingResult<()>;
    /// Waits up to `timeout` for the next packet; `Ok(None)` on timeout.
    fn recv_timeout(&mut self, timeout: Duration) -> FramingResult<Option<PadpPacket>>;
}

/// Per-direction PADP state: the next transaction ID to assign on send.
pub struct PadpSession {
    config: PadpConfig,
    next_transaction_id: u8,
}

impl Default for PadpSession {
    fn default() -> Self {
        Self::new(PadpConfig::default())
    }
}

impl PadpSession {
    pub fn new(config: PadpConfig) -> Self {
        Self {
            config,
            next_transaction_id: 1,
        }
    }

    fn take_transaction_id(&mut self) -> u8 {
        let id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
        if self.next_transaction_id == 0 {
            self.next_transaction_id = 1;
        }
        id
    }

    /// Fragments `payload` into `fragment_size`-byte chunks, sends each as a
    /// `Data` packet, and waits for its matching ack before sending the
    /// next, retransmitting up to `max_retransmits` times on timeout.
    pub fn send_message<D: PacketDuplex>(
        &mut self,
        duplex: &mut D,
        payload: &[u8],
    ) -> FramingResult<()> {
        let transaction_id = self.take_transaction_id();
        let total_len = payload.len() as u32;

        let chunks: Vec<&[u8]> = if payload.is_empty() {
            vec![&payload[0..0]]
        } else {
            payload.chunks(self.config.fragment_size).collect()
        };
        let fragment_count = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let first = index == 0;
            let last = index == fragment_count - 1;
            let mut flags = 0u8;
            if first {
                flags |= FLAG_FIRST;
            }
            if last {
                flags |= FLAG_LAST;
            }
            let size_or_offset = if first {
                total_len
            } else {
                (index * self.config.fragment_size) as u32
            };
            let packet = PadpPacket::data(flags, transaction_id, size_or_offset, chunk.to_vec());

            let mut attempt = 0u32;
            loop {
                duplex.send(&packet)?;
                attempt += 1;

                match duplex.recv_timeout(self.config.ack_timeout)? {
                    Some(ack)
                        if ack.packet_type == PadpPacketType::Ack
                            && ack.transaction_id == transaction_id
                            && ack.size_or_offset == size_or_offset =>
                    {
                        break;
                    }
                    Some(other) => {
                        debug!(?other, "PADP send: ignoring unrelated packet while awaiting ack");
                    }
                    None => {
                        debug!(
                            transaction_id,
                            size_or_offset, attempt, "PADP send: ack timed out"
                        );
                    }
                }

                if attempt > self.config.max_retransmits {
                    return Err(FramingError::Timeout {
                        retries: self.config.max_retransmits,
                    });
                }
            }
        }

        Ok(())
    }

    /// Receives one logical PADP message: collects fragments sharing a
    /// transaction ID, acking each as it arrives, until the `last`-flagged
    /// fragment completes a buffer matching the declared total length.
    pub fn receive_message<D: PacketDuplex>(&mut self, duplex: &mut D) -> FramingResult<Vec<u8>> {
        let mut transaction_id: Option<u8> = None;
        let mut total_len: Option<u32> = None;
        let mut buffer = Vec::new();
        let mut expected_offset: u32 = 0;

        loop {
            let packet = duplex
                .recv_timeout(self.config.ack_timeout)?
                .ok_or(FramingError::Timeout { retries: 0 })?;

            if packet.packet_type != PadpPacketType::Data {
                debug!(?packet, "PADP receive: ignoring non-data packet");
                continue;
            }
            match transaction_id {
                Some(id) if id != packet.transaction_id => {
                    debug!("PADP receive: ignoring fragment from a different transaction");
                    continue;
                }
                None => transaction_id = Some(packet.transaction_id),
                _ => {}
            }

            if packet.is_first() {
                total_len = Some(packet.size_or_offset);
            }
            let offset = if packet.is_first() {
                0
            } else {
                packet.size_or_offset
            };

            if offset < expected_offset {
                debug!(offset, "PADP receive: duplicate fragment, re-acking");
                duplex.send(&PadpPacket::ack(packet.transaction_id, packet.size_or_offset))?;
                continue;
            }
            if offset > expected_offset {
                return Err(FramingError::Gap {
                    offset: offset as usize,
                });
            }

            buffer.extend_from_slice(&packet.payload);
            expected_offset += packet.payload.len() as u32;
            duplex.send(&PadpPacket::ack(packet.transaction_id, packet.size_or_offset))?;

            if packet.is_last() {
                let total = total_len.ok_or_else(|| {
                    FramingError::Protocol("PADP message ended without a first fragment".into())
                })?;
                if buffer.len() as u32 != total {
                    return Err(FramingError::Protocol(format!(
                        "PADP reassembled {} bytes, declared length was {}",
                        buffer.len(),
                        total
                    )));
                }
                return Ok(buffer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    type Queue = Rc<RefCell<VecDeque<PadpPacket>>>;

    /// An in-memory duplex wired to a peer's queues, with an optional
    /// predicate that silently drops outgoing packets (simulating loss).
    struct ChannelDuplex {
        inbox: Queue,
        peer_inbox: Queue,
        sent: Vec<PadpPacket>,
        drop: Box<dyn FnMut(&PadpPacket) -> bool>,
    }

    impl ChannelDuplex {
        fn new(inbox: Queue, peer_inbox: Queue) -> Self {
            Self {
                inbox,
                peer_inbox,
                sent: Vec::new(),
                drop: Box::new(|_| false),
            }
        }
    }

    impl PacketDuplex for ChannelDuplex {
        fn send(&mut self, packet: &PadpPacket) -> FramingResult<()> {
            self.sent.push(packet.clone());
            if !(self.drop)(packet) {
                self.peer_inbox.borrow_mut().push_back(packet.clone());
            }
            Ok(())
        }

        fn recv_timeout(&mut self, _timeout: Duration) -> FramingResult<Option<PadpPacket>> {
            Ok(self.inbox.borrow_mut().pop_front())
        }
    }

    fn paired() -> (ChannelDuplex, ChannelDuplex) {
        let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
        let b_to_a = Rc::new(RefCell::new(VecDeque::new()));
        let a = ChannelDuplex::new(b_to_a.clone(), a_to_b.clone());
        let b = ChannelDuplex::new(a_to_b, b_to_a);
        (a, b)
    }

    #[test]
    fn small_message_round_trips() {
        let (mut sender_side, mut receiver_side) = paired();
        let mut sender = PadpSession::default();
        let mut receiver = PadpSession::default();

        let payload = b"HotSync".to_vec();
        sender.send_message(&mut sender_side, &payload).unwrap();
        let received = receiver.receive_message(&mut receiver_side).unwrap();
        assert_eq!(received, payload);
    }

    #[test]
    fn megabyte_payload_fragments_and_reassembles() {
        let (mut sender_side, mut receiver_side) = paired();
        let mut sender = PadpSession::default();
        let mut receiver = PadpSession::default();

        let payload: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();
        sender.send_message(&mut sender_side, &payload).unwrap();
        let received = receiver.receive_message(&mut receiver_side).unwrap();
        assert_eq!(received, payload);
    }

    /// A duplex that acks whatever `Data` fragment it was last sent,
    /// except that it silently swallows the ack the first time a given
    /// `size_or_offset` comes up. Models a receiver whose first ack for a
    /// fragment is lost in transit, without needing a real concurrent peer.
    struct FlakyAckDuplex {
        sent: Vec<PadpPacket>,
        drop_once: std::collections::HashSet<u32>,
    }

    impl PacketDuplex for FlakyAckDuplex {
        fn send(&mut self, packet: &PadpPacket) -> FramingResult<()> {
            self.sent.push(packet.clone());
            Ok(())
        }

        fn recv_timeout(&mut self, _timeout: Duration) -> FramingResult<Option<PadpPacket>> {
            let Some(last) = self.sent.last().cloned() else {
                return Ok(None);
            };
            if last.packet_type != PadpPacketType::Data {
                return Ok(None);
            }
            if self.drop_once.remove(&last.size_or_offset) {
                return Ok(None);
            }
            Ok(Some(PadpPacket::ack(last.transaction_id, last.size_or_offset)))
        }
    }

    #[test]
    fn dropped_ack_causes_one_retransmit_then_succeeds() {
        let mut duplex = FlakyAckDuplex {
            sent: Vec::new(),
            drop_once: [2048u32].into_iter().collect(), // first fragment's size field
        };
        let mut sender = PadpSession::default();
        let payload = vec![0xAB; 2048]; // two 1024-byte fragments

        sender.send_message(&mut duplex, &payload).unwrap();

        // fragment 1 (size_or_offset == total length) was sent twice: the
        // ack for the first transmission was dropped, so it was retransmitted.
        let first_fragment_sends = duplex
            .sent
            .iter()
            .filter(|p| p.packet_type == PadpPacketType::Data && p.size_or_offset == 2048)
            .count();
        assert_eq!(first_fragment_sends, 2);
        // the second fragment needed no retransmit
        let second_fragment_sends = duplex
            .sent
            .iter()
            .filter(|p| p.packet_type == PadpPacketType::Data && p.size_or_offset == 1024)
            .count();
        assert_eq!(second_fragment_sends, 1);
    }

    #[test]
    fn ack_dropped_every_time_exhausts_retries_and_times_out() {
        let (mut sender_side, _receiver_side) = paired();
        // sender_side.recv_timeout always reads from an inbox nothing ever
        // feeds, so every wait times out regardless of a receiver.
        let mut sender = PadpSession::default();
        sender.config.max_retransmits = 3;

        let err = sender
            .send_message(&mut sender_side, b"no one is listening")
            .unwrap_err();
        match err {
            FramingError::Timeout { retries } => assert_eq!(retries, 3),
            other => panic!("expected Timeout, got {other:?}"),
        }
        // initial send + 3 retransmits = 4 total transmissions
        assert_eq!(sender_side.sent.len(), 4);
    }

    #[test]
    fn duplicate_fragment_is_reacked_and_dropped() {
        let (_sender_side, mut receiver_side) = paired();
        let mut receiver = PadpSession::default();

        // Feed the same first-fragment twice directly into the receiver's inbox.
        let pkt = PadpPacket::data(FLAG_FIRST | FLAG_LAST, 9, 5, b"hello".to_vec());
        receiver_side.inbox.borrow_mut().push_back(pkt.clone());
        let received = receiver.receive_message(&mut receiver_side).unwrap();
        assert_eq!(received, b"hello");

        // A fresh session replays the exact same first fragment again: it's
        // a duplicate of nothing in progress, so this is really a new
        // message; exercise the true duplicate case by re-delivering mid
        // message with a gap instead, which the receiver must reject.
        let first = PadpPacket::data(FLAG_FIRST, 1, 10, b"01234".to_vec());
        let dup_first = first.clone();
        let second = PadpPacket::data(FLAG_LAST, 1, 5, b"56789".to_vec());
        receiver_side.inbox.borrow_mut().push_back(first);
        receiver_side.inbox.borrow_mut().push_back(dup_first);
        receiver_side.inbox.borrow_mut().push_back(second);
        let mut fresh_receiver = PadpSession::default();
        let received = fresh_receiver.receive_message(&mut receiver_side).unwrap();
        assert_eq!(received, b"0123456789");
    }

    #[test]
    fn gap_in_fragment_sequence_aborts_with_protocol_error() {
        let (_sender_side, mut receiver_side) = paired();
        let mut receiver = PadpSession::default();

        let first = PadpPacket::data(FLAG_FIRST, 1, 20, b"01234".to_vec());
        // jumps straight to offset 15, skipping offset 5
        let gapped = PadpPacket::data(FLAG_LAST, 1, 15, b"fffff".to_vec());
        receiver_side.inbox.borrow_mut().push_back(first);
        receiver_side.inbox.borrow_mut().push_back(gapped);

        let err = receiver.receive_message(&mut receiver_side).unwrap_err();
        assert!(matches!(err, FramingError::Gap { offset: 15 }));
    }
}
