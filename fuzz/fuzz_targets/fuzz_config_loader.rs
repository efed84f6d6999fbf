#![no_main]

use libfuzzer_sys::fuzz_target;
use stoptimer::config::loader::ConfigLoader;
use stoptimer::timer::{MAX_DURATION, TimerSettings};

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        let loader = ConfigLoader::with_defaults();

        // Whatever loads must resolve to a bounded duration
        if let Ok(config) = loader.load_from_str(yaml_str) {
            let settings = TimerSettings::from_config(&config);
            assert!(settings.duration <= MAX_DURATION);
        }
    }
});
