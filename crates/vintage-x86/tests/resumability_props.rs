#![cfg(not(target_arch = "wasm32"))]

mod common;

use common::decode_in_chunks;
use proptest::prelude::*;
use vintage_x86::{DecodeResult, Decoder, Model};

fn any_model() -> impl Strategy<Value = Model> {
    prop_oneof![
        Just(Model::I8086),
        Just(Model::I80186),
        Just(Model::I80286),
        Just(Model::I80386),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2048,
        .. ProptestConfig::default()
    })]

    #[test]
    fn chunking_never_changes_the_result(
        model in any_model(),
        bytes in proptest::collection::vec(any::<u8>(), 0..=64),
        chunk in 1usize..=9,
    ) {
        let whole = decode_in_chunks(model, &bytes, bytes.len().max(1));
        let chunked = decode_in_chunks(model, &bytes, chunk);
        prop_assert_eq!(&whole, &chunked, "model={} chunk={} bytes={:02x?}", model, chunk, bytes);
    }

    #[test]
    fn every_byte_is_accounted_for(
        model in any_model(),
        bytes in proptest::collection::vec(any::<u8>(), 0..=64),
        chunk in 1usize..=9,
    ) {
        let decoded = decode_in_chunks(model, &bytes, chunk);
        let total: usize = decoded.instructions.iter().map(|(len, _)| len).sum();
        prop_assert_eq!(total + decoded.pending, bytes.len(), "model={} bytes={:02x?}", model, bytes);
    }

    #[test]
    fn byte_at_a_time_matches_single_call(
        model in any_model(),
        bytes in proptest::collection::vec(any::<u8>(), 1..=16),
    ) {
        let mut whole = Decoder::new(model);
        let expected = whole.decode(&bytes);

        let mut split = Decoder::new(model);
        let mut actual = DecodeResult::NeedMore { at_least: 0 };
        let mut fed = 0;
        for &b in &bytes {
            actual = split.decode(&[b]);
            fed += 1;
            if actual.is_complete() {
                break;
            }
        }

        prop_assert_eq!(expected, actual, "model={} bytes={:02x?}", model, bytes);
        if let DecodeResult::Complete { length, .. } = actual {
            prop_assert_eq!(length, fed);
        }
    }

    #[test]
    fn decoding_resumes_cleanly_after_undefined(
        model in any_model(),
        bytes in proptest::collection::vec(any::<u8>(), 0..=64),
    ) {
        let decoded = decode_in_chunks(model, &bytes, bytes.len().max(1));
        let mut offset = 0;
        for (i, (len, inst)) in decoded.instructions.iter().enumerate() {
            offset += len;
            if inst.is_undefined() {
                let rest = decode_in_chunks(model, &bytes[offset..], bytes.len().max(1));
                prop_assert_eq!(&rest.instructions[..], &decoded.instructions[i + 1..]);
                prop_assert_eq!(rest.pending, decoded.pending);
            }
        }
    }
}
