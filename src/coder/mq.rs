//! The MQ binary arithmetic codec.
//!
//! A single [`MqCoder`] instance owns the interval registers and the byte
//! stream, and can both encode and decode depending on which restart
//! operation was last applied. Probability can be driven per-bit either by
//! an adaptive per-context estimator (`*_context` operations) or by an
//! explicit pre-quantized value (`*_prob` operations, see
//! [`crate::coder::probability`]).

use log::{debug, trace};

use crate::coder::table::MQ_STATES;
use crate::stream::byte_stream::ByteStream;
use crate::utils::error::{MqError, Result};

/// Lower bound of the normalized interval width register.
const HALF: u32 = 0x8000;

/// Layout of the 28-bit coding register, low to high: 16 code bits,
/// 3 spacer bits, 8 partial-byte bits, 1 carry bit.
const C_MASK: u32 = 0x0FFF_FFFF;
/// The carry bit of the coding register.
const C_CARRY: u32 = 0x0800_0000;
/// Clears the carry (and anything above it) once it has been folded into
/// the pending byte.
const C_CARRY_CLEAR: u32 = !0xF800_0000;
/// Partial-byte position when the previous byte was 0xFF: the next byte
/// carries 7 data bits, so the byte boundary sits one bit higher.
const C_BYTE_SHIFT_STUFFED: u32 = 20;
const C_KEEP_STUFFED: u32 = 0x000F_FFFF;
/// Partial-byte position for a plain 8-data-bit byte.
const C_BYTE_SHIFT: u32 = 19;
const C_KEEP: u32 = 0x0007_FFFF;

/// Number of significant coding-register bits that termination must flush.
const C_FLUSH_BITS: i32 = 27;
/// Width of the decoder's code window within the coding register.
const CODE_WINDOW_BITS: i32 = 15;

/// Transfer countdown right after `restart_encoding`.
const T_INIT: i32 = 12;

/// Largest successor byte allowed after a 0xFF inside an MQ segment.
const STUFF_MAX: u8 = 0x8F;

/// Encoder register snapshot taken before the easy flush, so the optimal
/// terminator can reconstruct the pending interval.
#[derive(Clone, Copy)]
struct FlushSnapshot {
    tr: u32,
    t: i32,
    c: u32,
    a: u32,
    l: isize,
}

/// Conditional exchange on the MPS path: the shrunk MPS subinterval may be
/// narrower than the LPS width, in which case the two swap roles.
#[inline]
fn exchange_mps(a: u32, c: u32, p: u32) -> (u32, u32) {
    if a < p { (p, c) } else { (a, c + p) }
}

/// Conditional exchange on the LPS path.
#[inline]
fn exchange_lps(a: u32, c: u32, p: u32) -> (u32, u32) {
    if a < p { (a, c + p) } else { (p, c) }
}

/// An MQ codec instance.
///
/// The instance is reusable across messages. The caller-visible sequencing
/// is a contract: after encoding a message the order is `terminate_*` →
/// `change_stream` → `restart_encoding` → `reset`; for decoding it is
/// `change_stream` → `restart_decoding` → `reset`. Skipping
/// `restart_decoding` silently produces garbage.
pub struct MqCoder {
    stream: ByteStream,
    /// Interval width; in [0x8000, 0x10000) between operations.
    a: u32,
    /// Coding register, 28 meaningful bits (see the mask constants above).
    c: u32,
    /// Shifts remaining before the next byte transfer; 7 or 8 after a
    /// transfer, 12 right after an encoding restart.
    t: i32,
    /// Byte pending emission (encode) or most recently fetched (decode).
    tr: u32,
    /// Stream cursor. Starts at -1 on encode so the initial garbage byte in
    /// `tr` is never emitted; a non-negative read offset on decode.
    l: isize,
    /// Adaptive estimator state per context, each an index into `MQ_STATES`.
    ctx_state: Vec<u8>,
    /// Current most-probable symbol per context.
    ctx_mps: Vec<bool>,
}

impl MqCoder {
    /// Creates a coder with `num_contexts` adaptive contexts, all at state 0
    /// with MPS 0, ready for encoding into a fresh stream.
    ///
    /// `num_contexts` may be 0 for a coder used exclusively in
    /// explicit-probability mode.
    pub fn new(num_contexts: usize) -> Self {
        let mut coder = Self {
            stream: ByteStream::new(),
            a: 0,
            c: 0,
            t: 0,
            tr: 0,
            l: -1,
            ctx_state: vec![0; num_contexts],
            ctx_mps: vec![false; num_contexts],
        };
        coder.restart_encoding();
        coder
    }

    /// Number of adaptive contexts this coder was built with.
    pub fn num_contexts(&self) -> usize {
        self.ctx_state.len()
    }

    /// Read access to the installed byte stream.
    pub fn stream(&self) -> &ByteStream {
        &self.stream
    }

    /// Installs `stream` (or a fresh empty one) and returns the previous
    /// stream, handing its bytes back to the caller.
    pub fn change_stream(&mut self, stream: Option<ByteStream>) -> ByteStream {
        std::mem::replace(&mut self.stream, stream.unwrap_or_default())
    }

    /// Returns all contexts to state 0 / MPS 0.
    pub fn reset(&mut self) {
        self.ctx_state.fill(0);
        self.ctx_mps.fill(false);
    }

    /// Seeds context `cx` at a given estimator state and MPS.
    ///
    /// JPEG 2000 callers use this to start their run context at state 3 and
    /// the uniform context at state 46. Panics on an out-of-range context or
    /// state index, like the other context operations.
    pub fn set_context(&mut self, cx: usize, state_index: u8, mps: bool) {
        assert!(
            (state_index as usize) < MQ_STATES.len(),
            "state index {} out of range",
            state_index
        );
        self.ctx_state[cx] = state_index;
        self.ctx_mps[cx] = mps;
    }

    /// Puts the registers into the initial encoding state.
    pub fn restart_encoding(&mut self) {
        self.a = HALF;
        self.c = 0;
        self.t = T_INIT;
        self.tr = 0;
        self.l = -1;
        trace!("encoding restart, stream at {} bytes", self.stream.len());
    }

    /// Puts the registers into the initial decoding state, pre-loading the
    /// code window from the start of the installed stream.
    pub fn restart_decoding(&mut self) -> Result<()> {
        self.tr = 0;
        self.l = 0;
        self.c = 0;
        self.fill_lsb()?;
        self.c = (self.c << self.t) & C_MASK;
        self.fill_lsb()?;
        self.c = (self.c << 7) & C_MASK;
        self.t -= 7;
        self.a = HALF;
        trace!("decoding restart, {} byte stream", self.stream.len());
        Ok(())
    }

    /// Encodes one bit under the adaptive context `cx`.
    ///
    /// Never fails: the stream is in-memory and register arithmetic is
    /// total. Panics if `cx` is out of range or the coder was built without
    /// contexts — that is a programming error, not a data error.
    pub fn encode_bit_context(&mut self, bit: bool, cx: usize) {
        debug_assert!(self.a >= HALF && self.a < 0x10000);
        let state = MQ_STATES[self.ctx_state[cx] as usize];
        let p = state.prob as u32;
        let mps = self.ctx_mps[cx];

        self.a -= p;
        if bit == mps {
            if self.a >= HALF {
                // Fast path: interval still normalized, no adaptation.
                self.c += p;
                return;
            }
            let (a, c) = exchange_mps(self.a, self.c, p);
            self.a = a;
            self.c = c;
            self.mps_transition(cx);
        } else {
            let (a, c) = exchange_lps(self.a, self.c, p);
            self.a = a;
            self.c = c;
            self.lps_transition(cx);
        }
        self.renorm_encode();
    }

    /// Encodes one bit at an explicit pre-quantized probability.
    ///
    /// `prob0` carries the LPS probability in its magnitude and the MPS
    /// sense in its sign (negative: the MPS is 1). No adaptive state is
    /// touched.
    pub fn encode_bit_prob(&mut self, bit: bool, prob0: i32) {
        debug_assert!(self.a >= HALF && self.a < 0x10000);
        debug_assert!(prob0.unsigned_abs() < HALF);
        let mps = prob0 < 0;
        let p = prob0.unsigned_abs();

        self.a -= p;
        if bit == mps {
            if self.a >= HALF {
                self.c += p;
                return;
            }
            let (a, c) = exchange_mps(self.a, self.c, p);
            self.a = a;
            self.c = c;
        } else {
            let (a, c) = exchange_lps(self.a, self.c, p);
            self.a = a;
            self.c = c;
        }
        self.renorm_encode();
    }

    /// Decodes one bit under the adaptive context `cx`.
    ///
    /// Fails with [`MqError::InvalidMarker`] when a 0xFF byte is followed by
    /// a disallowed successor before the stream end. Reads that run past the
    /// end of the stream are padded with all-ones and accepted; callers that
    /// need strict marker detection must validate upstream.
    pub fn decode_bit_context(&mut self, cx: usize) -> Result<bool> {
        debug_assert!(self.a >= HALF && self.a < 0x10000);
        let state = MQ_STATES[self.ctx_state[cx] as usize];
        let p = state.prob as u32;
        let mps = self.ctx_mps[cx];

        self.a -= p;
        let chigh = (self.c >> 8) & 0xFFFF;
        let bit;
        if chigh >= p {
            self.c -= p << 8;
            if self.a >= HALF {
                return Ok(mps);
            }
            if self.a < p {
                bit = !mps;
                self.lps_transition(cx);
            } else {
                bit = mps;
                self.mps_transition(cx);
            }
        } else {
            if self.a >= p {
                bit = !mps;
                self.lps_transition(cx);
            } else {
                bit = mps;
                self.mps_transition(cx);
            }
            self.a = p;
        }
        self.renorm_decode()?;
        Ok(bit)
    }

    /// Decodes one bit at an explicit pre-quantized probability.
    pub fn decode_bit_prob(&mut self, prob0: i32) -> Result<bool> {
        debug_assert!(self.a >= HALF && self.a < 0x10000);
        debug_assert!(prob0.unsigned_abs() < HALF);
        let mps = prob0 < 0;
        let p = prob0.unsigned_abs();

        self.a -= p;
        let chigh = (self.c >> 8) & 0xFFFF;
        let bit;
        if chigh >= p {
            self.c -= p << 8;
            if self.a >= HALF {
                return Ok(mps);
            }
            bit = if self.a < p { !mps } else { mps };
        } else {
            bit = if self.a >= p { !mps } else { mps };
            self.a = p;
        }
        self.renorm_decode()?;
        Ok(bit)
    }

    /// Flushes the remaining coding-register bits into the stream.
    ///
    /// Always safe, not minimal: the resulting tail may be longer than a
    /// decoder strictly needs. Returns the stream length.
    pub fn terminate_easy(&mut self) -> Result<usize> {
        let mut n = C_FLUSH_BITS - CODE_WINDOW_BITS - self.t;
        self.c <<= self.t;
        while n > 0 {
            self.transfer_byte();
            n -= self.t;
            self.c <<= self.t;
        }
        self.transfer_byte();
        if self.t == 7 {
            // A trailing 0xFF only announces stuffing; it carries no data.
            self.stream.remove_byte()?;
        }
        Ok(self.stream.len())
    }

    /// Flushes and then truncates the stream to the shortest tail from which
    /// a conforming decoder still recovers the encoded interval.
    ///
    /// Returns the final stream length. The truncation only ever removes
    /// suffix bytes; earlier bytes are never rewritten.
    pub fn terminate_optimal(&mut self) -> Result<usize> {
        let snapshot = FlushSnapshot {
            tr: self.tr,
            t: self.t,
            c: self.c,
            a: self.a,
            l: self.l,
        };
        let flushed_at = self.stream.len();
        let easy_len = self.terminate_easy()?;

        let needed = self.min_flush(&snapshot, flushed_at)?;
        let mut end = flushed_at + needed;
        if end >= 1 && self.stream.get_byte(end - 1)? == 0xFF {
            end -= 1;
        }
        while end >= 2 && self.stream.get_u16(end - 2)? == 0xFF7F {
            end -= 2;
        }
        self.stream.remove_bytes(self.stream.len() - end)?;
        debug!("optimal termination: {} -> {} bytes", easy_len, end);
        Ok(end)
    }

    /// Upper bound on the bytes a termination can still append, used by
    /// callers reserving truncation points.
    pub fn remaining_bytes(&self) -> usize {
        if C_FLUSH_BITS - self.t <= 22 { 4 } else { 5 }
    }

    /// Finds the smallest prefix of the flushed tail whose every possible
    /// continuation still lands a decoder inside the pending interval.
    ///
    /// `l0` is the stream length at snapshot time; the search works in a
    /// fixed 64-bit coordinate system where `cr` is the lower end of the
    /// pending interval and `ar` its width.
    fn min_flush(&self, snap: &FlushSnapshot, l0: usize) -> Result<usize> {
        let mut cr: u64 = ((snap.tr as u64) << 27) + ((snap.c as u64) << snap.t);
        let mut ar: u64 = (snap.a as u64) << snap.t;
        let mut rf: u64 = 0;
        let mut sf: i32 = 35;
        let mut s: i32 = 8;

        let max = (self.stream.len() - l0).min(5);
        if l0 == 0 && (cr >> 32) & 0xFF == 0 && snap.l == -1 {
            // The first pending byte was suppressed; realign on the first
            // byte that actually reached the stream.
            cr <<= 8;
            ar <<= 8;
        }

        let mut needed = 0;
        for k in 1..=max {
            let reach = rf + (1u64 << sf) - 1;
            if reach >= cr && reach < cr + ar {
                break;
            }
            sf -= s;
            debug_assert!(sf >= 0);
            let b = self.stream.get_byte(l0 + k - 1)? as u64;
            rf += b << sf;
            s = if b == 0xFF { 7 } else { 8 };
            needed = k;
        }
        Ok(needed)
    }

    fn mps_transition(&mut self, cx: usize) {
        self.ctx_state[cx] = MQ_STATES[self.ctx_state[cx] as usize].trans_mps;
    }

    fn lps_transition(&mut self, cx: usize) {
        let state = MQ_STATES[self.ctx_state[cx] as usize];
        if state.switch {
            self.ctx_mps[cx] = !self.ctx_mps[cx];
        }
        self.ctx_state[cx] = state.trans_lps;
    }

    fn renorm_encode(&mut self) {
        while self.a < HALF {
            self.a <<= 1;
            self.c <<= 1;
            self.t -= 1;
            if self.t == 0 {
                self.transfer_byte();
            }
        }
    }

    fn renorm_decode(&mut self) -> Result<()> {
        while self.a < HALF {
            if self.t == 0 {
                self.fill_lsb()?;
            }
            self.a <<= 1;
            self.c = (self.c << 1) & C_MASK;
            self.t -= 1;
        }
        Ok(())
    }

    /// Moves the pending byte into the stream, folding in a carry and
    /// arranging 0xFF bit-stuffing so that no emitted byte pair can form a
    /// marker.
    fn transfer_byte(&mut self) {
        #[cfg(feature = "coder-trace")]
        log::trace!(
            "transfer: Tr={:#04x} C={:#09x} t={} L={}",
            self.tr,
            self.c,
            self.t,
            self.l
        );
        if self.tr == 0xFF {
            self.stream.put_byte(self.tr as u8);
            self.l += 1;
            self.tr = self.c >> C_BYTE_SHIFT_STUFFED;
            self.c &= C_KEEP_STUFFED;
            self.t = 7;
        } else {
            if self.c >= C_CARRY {
                self.tr += 1;
                self.c &= C_CARRY_CLEAR;
            }
            if self.l >= 0 {
                self.stream.put_byte(self.tr as u8);
            }
            self.l += 1;
            if self.tr == 0xFF {
                self.tr = self.c >> C_BYTE_SHIFT_STUFFED;
                self.c &= C_KEEP_STUFFED;
                self.t = 7;
            } else {
                self.tr = self.c >> C_BYTE_SHIFT;
                self.c &= C_KEEP;
                self.t = 8;
            }
        }
    }

    /// Pulls one byte into the low bits of the coding register.
    ///
    /// Reads past the stream end pad with all-ones. A 0xFF followed by a
    /// byte above 0x8F strictly before the end is a marker fault.
    fn fill_lsb(&mut self) -> Result<()> {
        self.t = 8;
        let offset = self.l as usize;
        let len = self.stream.len();
        let bl = if offset < len {
            self.stream.get_byte(offset)?
        } else {
            0
        };
        if offset == len || (self.tr == 0xFF && bl > STUFF_MAX) {
            self.c += 0xFF;
            if offset != len {
                debug!("marker fault: 0xFF{:02X} at offset {}", bl, offset);
                return Err(MqError::InvalidMarker {
                    offset,
                    successor: bl,
                });
            }
        } else {
            if self.tr == 0xFF {
                self.t = 7;
            }
            self.tr = bl as u32;
            self.l += 1;
            self.c += self.tr << (8 - self.t);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all_context(stream: ByteStream, n: usize, cx: usize) -> Vec<bool> {
        let mut coder = MqCoder::new(cx + 1);
        coder.change_stream(Some(stream));
        coder.restart_decoding().unwrap();
        (0..n)
            .map(|_| coder.decode_bit_context(cx).unwrap())
            .collect()
    }

    #[test]
    fn fresh_encoder_registers() {
        let coder = MqCoder::new(1);
        assert_eq!(coder.a, 0x8000);
        assert_eq!(coder.c, 0);
        assert_eq!(coder.t, 12);
        assert_eq!(coder.tr, 0);
        assert_eq!(coder.l, -1);
        assert_eq!(coder.num_contexts(), 1);
    }

    #[test]
    fn empty_message_terminates_to_empty_stream() {
        let mut coder = MqCoder::new(0);
        let len = coder.terminate_optimal().unwrap();
        assert_eq!(len, 0);
        let stream = coder.change_stream(None);
        assert!(stream.is_empty());

        // A decoder restarted on the empty stream comes up cleanly.
        let mut decoder = MqCoder::new(0);
        decoder.change_stream(Some(stream));
        decoder.restart_decoding().unwrap();
    }

    #[test]
    fn four_mps_bits_have_known_encoding() {
        let mut coder = MqCoder::new(1);
        for _ in 0..4 {
            coder.encode_bit_context(false, 0);
        }
        coder.terminate_optimal().unwrap();
        assert_eq!(coder.stream().as_slice(), &[0x4C]);

        let decoded = decode_all_context(coder.change_stream(None), 4, 0);
        assert_eq!(decoded, vec![false; 4]);
    }

    #[test]
    fn sixty_four_mps_bits_round_trip() {
        let mut coder = MqCoder::new(1);
        for _ in 0..64 {
            coder.encode_bit_context(false, 0);
        }
        coder.terminate_optimal().unwrap();
        let decoded = decode_all_context(coder.change_stream(None), 64, 0);
        assert_eq!(decoded, vec![false; 64]);
    }

    #[test]
    fn alternating_bits_round_trip() {
        let bits: Vec<bool> = (0..100).map(|i| i % 2 == 1).collect();
        let mut coder = MqCoder::new(1);
        for &bit in &bits {
            coder.encode_bit_context(bit, 0);
        }
        coder.terminate_optimal().unwrap();
        let decoded = decode_all_context(coder.change_stream(None), bits.len(), 0);
        assert_eq!(decoded, bits);
    }

    #[test]
    fn explicit_probability_round_trip() {
        let q = crate::coder::probability::prob0_to_mq(0.7);
        let bits = [true, false, false, true, false, true, true, false];
        let mut coder = MqCoder::new(0);
        for &bit in &bits {
            coder.encode_bit_prob(bit, q);
        }
        coder.terminate_optimal().unwrap();

        let mut decoder = MqCoder::new(0);
        decoder.change_stream(Some(coder.change_stream(None)));
        decoder.restart_decoding().unwrap();
        for &bit in &bits {
            assert_eq!(decoder.decode_bit_prob(q).unwrap(), bit);
        }
    }

    #[test]
    fn invalid_marker_is_reported() {
        let mut decoder = MqCoder::new(1);
        decoder.change_stream(Some(ByteStream::from(vec![0x00, 0xFF, 0xFF])));
        decoder.restart_decoding().unwrap();

        let mut fault = None;
        for _ in 0..8 {
            match decoder.decode_bit_context(0) {
                Ok(_) => continue,
                Err(e) => {
                    fault = Some(e);
                    break;
                }
            }
        }
        assert_eq!(
            fault,
            Some(MqError::InvalidMarker {
                offset: 2,
                successor: 0xFF
            })
        );
    }

    #[test]
    fn reuse_across_messages() {
        let first: Vec<bool> = (0..40).map(|i| i % 3 == 0).collect();
        let second: Vec<bool> = (0..40).map(|i| i % 5 == 0).collect();

        let mut coder = MqCoder::new(1);
        for &bit in &first {
            coder.encode_bit_context(bit, 0);
        }
        coder.terminate_optimal().unwrap();
        let first_stream = coder.change_stream(None);
        coder.restart_encoding();
        coder.reset();

        for &bit in &second {
            coder.encode_bit_context(bit, 0);
        }
        coder.terminate_optimal().unwrap();
        let second_stream = coder.change_stream(None);

        assert_eq!(decode_all_context(first_stream, first.len(), 0), first);
        assert_eq!(decode_all_context(second_stream, second.len(), 0), second);
    }

    #[test]
    fn decoder_reuse_requires_restart_sequence() {
        let bits: Vec<bool> = (0..30).map(|i| i % 4 == 0).collect();
        let mut streams = Vec::new();
        for _ in 0..2 {
            let mut coder = MqCoder::new(1);
            for &bit in &bits {
                coder.encode_bit_context(bit, 0);
            }
            coder.terminate_optimal().unwrap();
            streams.push(coder.change_stream(None));
        }

        let mut decoder = MqCoder::new(1);
        for stream in streams {
            decoder.change_stream(Some(stream));
            decoder.restart_decoding().unwrap();
            decoder.reset();
            for &bit in &bits {
                assert_eq!(decoder.decode_bit_context(0).unwrap(), bit);
            }
        }
    }

    #[test]
    fn remaining_bytes_thresholds() {
        let mut coder = MqCoder::new(0);
        assert_eq!(coder.remaining_bytes(), 4); // fresh: t = 12
        coder.t = 5;
        assert_eq!(coder.remaining_bytes(), 4);
        coder.t = 4;
        assert_eq!(coder.remaining_bytes(), 5);
        coder.t = 1;
        assert_eq!(coder.remaining_bytes(), 5);
    }

    #[test]
    fn seeded_context_state_is_honored() {
        let mut coder = MqCoder::new(2);
        coder.set_context(1, 46, false);
        for i in 0..32 {
            coder.encode_bit_context(i % 2 == 0, 1);
        }
        // State 46 is the non-adaptive state and loops on itself.
        assert_eq!(coder.ctx_state[1], 46);
        coder.terminate_optimal().unwrap();

        let mut decoder = MqCoder::new(2);
        decoder.set_context(1, 46, false);
        decoder.change_stream(Some(coder.change_stream(None)));
        decoder.restart_decoding().unwrap();
        for i in 0..32 {
            assert_eq!(decoder.decode_bit_context(1).unwrap(), i % 2 == 0);
        }
    }

    #[test]
    #[should_panic]
    fn set_context_rejects_bad_state() {
        let mut coder = MqCoder::new(1);
        coder.set_context(0, 47, false);
    }

    #[test]
    fn context_state_stays_in_range() {
        let mut coder = MqCoder::new(4);
        for i in 0..500usize {
            let cx = i % 4;
            coder.encode_bit_context(i % 7 == 0, cx);
            assert!((coder.ctx_state[cx] as usize) < MQ_STATES.len());
            assert!(coder.a >= HALF && coder.a < 0x10000);
            assert!(coder.t >= 1 && coder.t <= 12);
        }
    }
}
