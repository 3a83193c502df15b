//! Send/suppress policy for decoded signals
//!
//! `pre_translate` decodes a value and decides whether it may be emitted
//! this cycle; `post_translate` records the decoded value afterwards,
//! whatever the decision was.

use crate::bitfield::decode_signal;
use crate::clock::TimeSource;
use crate::signals::CanSignal;

/// Decode `signal` from `payload` and apply the sampling gate
///
/// Returns the decoded value and whether it should be sent. The clock is
/// always polled first so that it advances even for changed values.
pub fn pre_translate(signal: &mut CanSignal, payload: u64, time: &dyn TimeSource) -> (f64, bool) {
    let value = decode_signal(signal, payload);

    let clock_fired = signal.frequency_clock.should_tick(time);
    let changed = value != signal.last_value;

    let send = if clock_fired || (changed && signal.force_send_changed) {
        if !signal.received || signal.send_same || changed {
            signal.received = true;
            true
        } else {
            false
        }
    } else {
        false
    };

    (value, send)
}

/// Record the decoded value as the signal's last value
pub fn post_translate(signal: &mut CanSignal, value: f64) {
    signal.last_value = value;
}
