//! Property-based tests for the G.711 codec, mirroring the teacher
//! telephony stack's use of `proptest` for codec math.

use proptest::prelude::*;
use rvoip_bridge_codec::g711::{self, Variant};

proptest! {
    #[test]
    fn mulaw_never_panics_on_any_sample(sample: i16) {
        let octet = g711::linear_to_mulaw(sample);
        let _ = g711::mulaw_to_linear(octet);
    }

    #[test]
    fn alaw_never_panics_on_any_sample(sample: i16) {
        let octet = g711::linear_to_alaw(sample);
        let _ = g711::alaw_to_linear(octet);
    }

    #[test]
    fn frame_round_trip_preserves_length(samples in proptest::collection::vec(any::<i16>(), 1..400)) {
        let mut pcm = Vec::with_capacity(samples.len() * 2);
        for s in &samples {
            pcm.extend_from_slice(&s.to_le_bytes());
        }

        for variant in [Variant::MuLaw, Variant::ALaw] {
            let encoded = g711::encode_frame(variant, &pcm);
            prop_assert_eq!(encoded.len(), samples.len());
            let decoded = g711::decode_frame(variant, &encoded);
            prop_assert_eq!(decoded.len(), pcm.len());
        }
    }
}

#[test]
fn drop_odd_trailing_byte_is_idempotent_on_even_input() {
    let even = vec![1u8, 2, 3, 4];
    assert_eq!(g711::drop_odd_trailing_byte(&even), &even[..]);
}

#[test]
fn drop_odd_trailing_byte_trims_exactly_one_byte() {
    let odd = vec![1u8, 2, 3];
    assert_eq!(g711::drop_odd_trailing_byte(&odd), &[1u8, 2][..]);
}

#[test]
fn validate_telephony_frame_len_accepts_canonical_sizes() {
    for len in [80usize, 160, 240, 320] {
        assert!(g711::validate_telephony_frame_len(len).is_ok());
    }
    assert!(g711::validate_telephony_frame_len(2).is_err());
    assert!(g711::validate_telephony_frame_len(161).is_err());
}
