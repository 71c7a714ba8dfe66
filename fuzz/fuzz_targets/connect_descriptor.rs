#![no_main]

use libfuzzer_sys::fuzz_target;

use orajson_driver::ConnectSettings;

fuzz_target!(|data: &[u8]| {
    if let Ok(descriptor) = std::str::from_utf8(data) {
        if let Ok(settings) = ConnectSettings::from_descriptor(descriptor) {
            // A parsed descriptor always satisfies its own validation.
            assert!(settings.validate().is_ok());
        }
    }
});
