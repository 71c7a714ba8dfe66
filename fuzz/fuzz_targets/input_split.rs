#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use orajson_core::{CallRequest, RequestContext, build_call};
use orajson_driver::BindValue;

#[derive(Arbitrary, Debug)]
struct SplitCase {
    text: String,
    chunk_size: u16,
    chunk_count: u8,
}

fuzz_target!(|case: SplitCase| {
    let chunk_size = usize::from(case.chunk_size) % 64 + 1;
    let chunk_count = usize::from(case.chunk_count) % 16 + 1;
    let input = serde_json::Value::String(case.text);
    let request = CallRequest::procedure("pkg_fuzz.load")
        .with_inputs(input.clone())
        .with_split(chunk_size, chunk_count);

    let Ok(call) = build_call(&request, &RequestContext::new()) else {
        return;
    };

    // Chunks concatenated in bind order reproduce the serialized input
    // byte-for-byte; NULL padding only ever trails the chunks.
    let mut reassembled = String::new();
    let mut saw_null = false;
    for bind in &call.binds {
        match bind {
            BindValue::Text(chunk) => {
                assert!(!saw_null);
                assert!(chunk.chars().count() <= chunk_size);
                reassembled.push_str(chunk);
            }
            BindValue::Null => saw_null = true,
            other => panic!("unexpected bind {other:?}"),
        }
    }
    assert_eq!(call.binds.len(), chunk_count);
    assert_eq!(reassembled, serde_json::to_string(&input).unwrap());
});
