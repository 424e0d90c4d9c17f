#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

use vintage_x86::{DecodeResult, Decoder, Model};

/// Decodes `stream` to exhaustion, offering at most `chunk` bytes per call.
fn decode_all(model: Model, stream: &[u8], chunk: usize) -> (Vec<DecodeResult>, usize) {
    let mut decoder = Decoder::new(model);
    let mut results = Vec::new();
    let mut pos = 0;
    let mut carried = 0;
    while pos < stream.len() {
        let end = pos.saturating_add(chunk).min(stream.len());
        let result = decoder.decode(&stream[pos..end]);
        match result {
            DecodeResult::Complete { length, .. } => {
                assert!(length > carried && length <= stream.len());
                pos += length - carried;
                carried = 0;
                results.push(result);
            }
            DecodeResult::NeedMore { .. } => {
                carried += end - pos;
                pos = end;
            }
        }
    }
    (results, carried)
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);

    let model = Model::ALL[usize::from(u.arbitrary::<u8>().unwrap_or(0) % 4)];
    let chunk = usize::from(u.arbitrary::<u8>().unwrap_or(1)).max(1);
    let rest_len = u.len();
    let stream = u.bytes(rest_len).unwrap_or(&[]);

    let whole = decode_all(model, stream, stream.len().max(1));
    let split = decode_all(model, stream, chunk);
    assert_eq!(whole, split);

    let consumed: usize = whole
        .0
        .iter()
        .map(|r| match r {
            DecodeResult::Complete { length, .. } => *length,
            DecodeResult::NeedMore { .. } => 0,
        })
        .sum();
    assert_eq!(consumed + whole.1, stream.len());

    for result in &whole.0 {
        if let Some(inst) = result.instruction() {
            let _ = inst.to_string();
        }
    }
});
