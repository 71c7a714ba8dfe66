#![no_main]

use libfuzzer_sys::fuzz_target;

use orajson_core::{CallRequest, RequestContext, RequestSpec, build_call};

fuzz_target!(|data: &[u8]| {
    let Ok(spec) = serde_json::from_slice::<RequestSpec>(data) else {
        return;
    };
    let Ok(request) = CallRequest::from_spec(spec) else {
        return;
    };
    // Building the call must never panic, whatever shape survived folding.
    let _ = build_call(&request, &RequestContext::new());
});
