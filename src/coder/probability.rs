//! Conversion between real-valued bit probabilities and the signed
//! pre-quantized form consumed by the explicit-probability operations.
//!
//! The quantized value `prob0` carries the LPS probability in its magnitude
//! (16-bit fixed-point, same scale as the state table) and the MPS sense in
//! its sign: negative means the MPS is 1.

/// Fixed-point scale of the quantized LPS probability.
const MQ_PROB_SCALE: f32 = (4.0 / 3.0) * 0x8000 as f32;

/// Quantizes the probability of a zero bit into MQ form.
///
/// `p` is clamped into `[0.0001, 0.9999]`; values of 0.5 and above yield a
/// positive result (MPS = 0), values below 0.5 a negative one (MPS = 1).
pub fn prob0_to_mq(p: f32) -> i32 {
    if p >= 0.5 {
        let p = p.min(0.9999);
        ((1.0 - p) * MQ_PROB_SCALE) as i32
    } else {
        let p = p.max(0.0001);
        -((p * MQ_PROB_SCALE) as i32)
    }
}

/// Recovers the approximate probability of a zero bit from MQ form.
pub fn mq_to_prob0(q: i32) -> f32 {
    let r = 3.0 * q as f32 / (4.0 * 0x8000 as f32);
    if q > 0 { 1.0 - r } else { -r }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_spot_values() {
        // 0.5 maps to the largest legal LPS probability on the MPS=0 side.
        assert_eq!(prob0_to_mq(0.5), 0x5555);
        assert_eq!(prob0_to_mq(0.25), -10922);
        assert_eq!(prob0_to_mq(0.75), 10922);
        assert!(prob0_to_mq(0.9) > 0);
        assert!(prob0_to_mq(0.1) < 0);
    }

    #[test]
    fn clamping() {
        assert_eq!(prob0_to_mq(1.0), prob0_to_mq(0.9999));
        assert_eq!(prob0_to_mq(0.0), prob0_to_mq(0.0001));
        assert!(prob0_to_mq(1.0) > 0);
        assert!(prob0_to_mq(0.0) < 0);
    }

    #[test]
    fn magnitudes_stay_below_the_interval_floor() {
        for p in [0.0, 0.1, 0.25, 0.4999, 0.5, 0.75, 0.9, 0.9999, 1.0] {
            let q = prob0_to_mq(p);
            assert!(q.unsigned_abs() < 0x8000, "prob0 {} quantized to {:#x}", p, q);
        }
    }

    #[test]
    fn round_trip_is_close() {
        for p in [0.05, 0.25, 0.4, 0.5, 0.6, 0.75, 0.9, 0.95] {
            let back = mq_to_prob0(prob0_to_mq(p));
            assert!(
                (back - p).abs() < 1e-3,
                "probability {} round-tripped to {}",
                p,
                back
            );
        }
    }
}
