// End-to-end frame translation through the public API
use can_translate::formats::protobuf::decode_envelope;
use can_translate::{
    BufferSink, BusConfig, CanFrame, ManualClock, MessageConfig, OutputFormat, SignalConfig,
    SignalHandler, Translator, VehicleConfig, VehicleMessage,
};
use can_translate::signals::{lookup_signal, HandlerKind, SignalState};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn vehicle(format: OutputFormat) -> VehicleConfig {
    let mut gear = SignalConfig::new("transmission_gear_position", 24, 4);
    gear.handler = HandlerKind::State;
    gear.states = vec![
        SignalState::new(1, "first"),
        SignalState::new(2, "second"),
        SignalState::new(3, "third"),
    ];

    let mut speed = SignalConfig::new("vehicle_speed", 16, 8);
    speed.frequency_hz = 10.0;

    let mut counter = SignalConfig::new("rolling_counter", 28, 4);
    counter.handler = HandlerKind::Ignore;

    VehicleConfig::new()
        .with_output_format(format)
        .with_message_capacity(2)
        .add_bus(BusConfig::new(0))
        .add_bus(BusConfig::new(1).with_raw_passthrough(true))
        .add_message(
            MessageConfig::new(0, 0x120)
                .add_signal(SignalConfig::new("engine_speed", 0, 16))
                .add_signal(speed)
                .add_signal(gear)
                .add_signal(counter),
        )
}

fn decoded(sink: &BufferSink) -> Vec<VehicleMessage> {
    sink.take()
        .iter()
        .map(|bytes| decode_envelope(bytes).unwrap())
        .collect()
}

#[test]
fn test_protobuf_frame_translation() {
    init_logging();
    let sink = BufferSink::new();
    let clock = ManualClock::new(0);
    let mut translator = Translator::from_config(&vehicle(OutputFormat::Proto), sink.clone())
        .unwrap()
        .with_time_source(clock.clone());

    // engine 1500 rpm, speed 60, gear 2, counter 7
    translator.process_frame(&CanFrame::new(0, 0x120, 0x05DC_3C27_0000_0000));
    assert_eq!(
        decoded(&sink),
        vec![
            VehicleMessage::numeric("engine_speed", 1500.0),
            VehicleMessage::numeric("vehicle_speed", 60.0),
            VehicleMessage::string("transmission_gear_position", "second"),
        ]
    );

    // 50ms later: vehicle_speed is rate limited, the rest fire every frame
    clock.advance(50);
    translator.process_frame(&CanFrame::new(0, 0x120, 0x05DC_3C37_0000_0000));
    assert_eq!(
        decoded(&sink),
        vec![
            VehicleMessage::numeric("engine_speed", 1500.0),
            VehicleMessage::string("transmission_gear_position", "third"),
        ]
    );

    let signals = translator.signals();
    assert_eq!(lookup_signal("rolling_counter", signals).unwrap().last_value, 7.0);
}

#[test]
fn test_json_passthrough_and_registry_exhaustion() {
    init_logging();
    let sink = BufferSink::new();
    let mut translator = Translator::from_config(&vehicle(OutputFormat::Json), sink.clone())
        .unwrap()
        .with_time_source(ManualClock::new(0));

    translator.process_frame(&CanFrame::new(1, 256, 0x0102_0304_0506_0708));
    translator.process_frame(&CanFrame::new(1, 257, 0));
    // Capacity 2 is exhausted: dropped without a catalog entry
    translator.process_frame(&CanFrame::new(1, 258, 0));
    // Bus 0 does not forward unknown frames
    translator.process_frame(&CanFrame::new(0, 259, 0));

    let messages: Vec<String> = sink
        .take()
        .into_iter()
        .map(|m| String::from_utf8(m).unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![
            "{\"bus\":1,\"id\":256,\"data\":\"0x0102030405060708\"}\r\n".to_string(),
            "{\"bus\":1,\"id\":257,\"data\":\"0x0000000000000000\"}\r\n".to_string(),
        ]
    );
    assert_eq!(translator.registry().len(), 2);
    assert!(translator.registry().lookup(1, 258).is_none());
    assert_eq!(translator.stats().frames_processed, 4);
}

#[test]
fn test_custom_handler_uses_signal_table() {
    init_logging();
    let sink = BufferSink::new();
    let mut translator = Translator::from_config(&vehicle(OutputFormat::Proto), sink.clone())
        .unwrap()
        .with_time_source(ManualClock::new(0));

    translator
        .set_handler(
            "engine_speed",
            SignalHandler::custom_boolean(|_, signals, value, _| {
                let speed = lookup_signal("vehicle_speed", signals).map_or(0.0, |s| s.last_value);
                value > 0.0 && speed == 0.0
            }),
        )
        .unwrap();

    // Idling: engine running, vehicle_speed not decoded yet (last value 0)
    translator.process_frame(&CanFrame::new(0, 0x120, 0x0320_0000_0000_0000));
    let messages = decoded(&sink);
    assert_eq!(messages[0], VehicleMessage::boolean("engine_speed", true));
}
