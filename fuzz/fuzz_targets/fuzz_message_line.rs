#![no_main]

use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use stoptimer::timer::{ManualClock, Message, RecordingSink, TimerEngine, TimerSettings};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let mut engine = TimerEngine::new(
        TimerSettings::default(),
        ManualClock::new(),
        RecordingSink::default(),
    );

    for line in input.lines() {
        if let Some(msg) = Message::from_line(line) {
            engine.handle_input(msg);
        }
        engine.advance(Duration::from_millis(700));
    }
    engine.shutdown();
});
