//! Connection lifecycle against the in-memory platform.

use super::*;
use crate::broadcast::{BroadcastMsg, make_long};
use crate::platform::{MemoryPlatform, MemoryProducer};
use crate::schema::{HEADER_SIZE, IRSDK_STATUS_CONNECTED};
use crate::test_utils::{ImageBuilder, descriptor, float_descriptor};
use crate::types::VariableType;
use std::thread;

const ROW_LEN: usize = 12;
const SHORT: Duration = Duration::from_millis(5);

fn builder() -> ImageBuilder {
    ImageBuilder::new(
        vec![
            float_descriptor("Speed", 0),
            float_descriptor("RPM", 4),
            descriptor("Gear", VariableType::Int32, 8, 1),
        ],
        ROW_LEN,
    )
}

fn row(speed: f32, rpm: f32, gear: i32) -> Vec<u8> {
    let mut row = Vec::with_capacity(ROW_LEN);
    row.extend_from_slice(&speed.to_le_bytes());
    row.extend_from_slice(&rpm.to_le_bytes());
    row.extend_from_slice(&gear.to_le_bytes());
    row
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (Connection<MemoryPlatform>, MemoryProducer) {
    init_tracing();
    let platform = MemoryPlatform::with_image(builder().build_live());
    let producer = platform.producer();
    (Connection::new(platform, ConnectionConfig::default()), producer)
}

/// Connect and consume the initial tick-0 row.
fn primed() -> anyhow::Result<(Connection<MemoryPlatform>, MemoryProducer)> {
    let (mut connection, producer) = setup();
    let first = connection.wait_for_data(SHORT)?;
    assert_eq!(first.map(|record| record.tick()), Some(0));
    Ok((connection, producer))
}

fn rewrite_header(producer: &MemoryProducer, edit: impl FnOnce(&mut Header)) -> anyhow::Result<()> {
    producer.update(|image| {
        let mut header = Header::decode(image)?;
        edit(&mut header);
        image[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        Ok(())
    })?;
    Ok(())
}

#[test]
fn connect_without_producer_fails_and_holds_no_handles() {
    let platform = MemoryPlatform::new();
    let mut connection = Connection::new(platform.clone(), ConnectionConfig::default());

    assert!(matches!(connection.connect(), Err(TelemetryError::Platform { .. })));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(platform.open_handles(), 0);
    assert!(!connection.is_connected());
}

#[test]
fn version_mismatch_releases_every_handle() {
    init_tracing();
    let platform = MemoryPlatform::with_image(builder().version(1).build_live());
    let mut connection = Connection::new(platform.clone(), ConnectionConfig::default());

    let err = connection.connect().expect_err("version 1 must be rejected");
    assert!(matches!(err, TelemetryError::Version { expected: 2, found: 1 }));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(platform.open_handles(), 0);
}

fn patched_image(edit: impl FnOnce(&mut Header)) -> anyhow::Result<Vec<u8>> {
    let mut image = builder().build_live();
    let mut header = Header::decode(&image)?;
    edit(&mut header);
    image[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    Ok(image)
}

#[test]
fn huge_descriptor_count_is_truncated() -> anyhow::Result<()> {
    init_tracing();
    let image = patched_image(|header| header.num_vars = i32::MAX)?;
    let available = image.len() - HEADER_SIZE;
    let platform = MemoryPlatform::with_image(image);
    let mut connection = Connection::new(platform.clone(), ConnectionConfig::default());

    match connection.connect() {
        Err(TelemetryError::Truncated { what, needed, available: left }) => {
            assert_eq!(what, "variable descriptor array");
            assert_eq!(needed, i32::MAX as usize * VAR_HEADER_SIZE);
            assert_eq!(left, available);
        }
        other => panic!("expected a truncated descriptor table, got {other:?}"),
    }
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(platform.open_handles(), 0);
    Ok(())
}

#[test]
fn huge_session_length_is_truncated() -> anyhow::Result<()> {
    init_tracing();
    let image = patched_image(|header| header.session_info_len = i32::MAX)?;
    let platform = MemoryPlatform::with_image(image);
    let mut connection = Connection::new(platform, ConnectionConfig::default());

    // the header itself is valid, only the document read is out of range
    connection.connect()?;
    assert!(matches!(
        connection.session_info(),
        Err(TelemetryError::Truncated { what: "session info", needed, .. }) if needed == i32::MAX as usize
    ));
    assert!(matches!(
        connection.session_data(),
        Err(TelemetryError::Truncated { what: "session info", .. })
    ));
    assert!(connection.wait_for_data(SHORT)?.is_some());
    Ok(())
}

#[test]
fn connect_caches_layout() -> anyhow::Result<()> {
    let (mut connection, _producer) = setup();
    connection.connect()?;

    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(connection.platform().open_handles(), 3);
    let header = connection.header().expect("header cached");
    assert_eq!(header.tick_rate, 60);
    assert_eq!(header.num_buf, 3);
    assert_eq!(connection.descriptors().len(), 3);
    assert_eq!(connection.var_index("RPM"), Some(1));
    assert_eq!(connection.var_index("Throttle"), None);
    assert_eq!(connection.var_offset("Gear")?, 8);
    assert!(matches!(
        connection.var_offset("Throttle"),
        Err(TelemetryError::FieldNotFound { .. })
    ));
    Ok(())
}

#[test]
fn first_wait_connects_lazily() -> anyhow::Result<()> {
    let (mut connection, _producer) = setup();
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    let record = connection.wait_for_data(SHORT)?.expect("initial row");
    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(record.tick(), 0);
    assert_eq!(record.f32("Speed"), Some(0.0));
    Ok(())
}

#[test]
fn fresh_then_stale_then_fresh() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;

    producer.publish(1, &row(42.5, 6100.0, 3))?;
    let record = connection.wait_for_data(SHORT)?.expect("published row");
    assert_eq!(record.tick(), 1);
    assert_eq!(record.f32("Speed"), Some(42.5));
    assert_eq!(record.f32("RPM"), Some(6100.0));
    assert_eq!(record.i32("Gear"), Some(3));

    assert!(connection.wait_for_data(SHORT)?.is_none());

    producer.publish(2, &row(43.0, 6200.0, 3))?;
    assert_eq!(connection.wait_for_data(SHORT)?.map(|r| r.tick()), Some(2));
    Ok(())
}

#[test]
fn wait_wakes_when_producer_signals() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        producer.publish(7, &row(10.0, 3000.0, 2))
    });

    let record = connection.wait_for_data(Duration::from_secs(5))?;
    writer.join().expect("producer thread")?;
    assert_eq!(record.map(|r| r.tick()), Some(7));
    Ok(())
}

#[test]
fn tick_going_backwards_is_a_reset() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;
    producer.publish(50, &row(1.0, 1.0, 1))?;
    assert!(connection.wait_for_data(SHORT)?.is_some());

    // producer restarted: every slot now carries a lower tick
    for slot in 0..3 {
        producer.write_row(slot, 1, &row(0.0, 0.0, 0))?;
    }
    assert!(connection.wait_for_data(SHORT)?.is_none());

    producer.publish(2, &row(5.0, 900.0, 1))?;
    assert_eq!(connection.wait_for_data(SHORT)?.map(|r| r.tick()), Some(2));
    Ok(())
}

#[test]
fn cleared_status_bit_is_not_connected() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;
    assert!(connection.is_connected());

    producer.set_connected(false)?;
    assert!(!connection.is_connected());
    assert!(matches!(connection.wait_for_data(SHORT), Err(TelemetryError::NotConnected)));

    producer.set_connected(true)?;
    producer.publish(3, &row(1.0, 2.0, 1))?;
    assert_eq!(connection.wait_for_data(SHORT)?.map(|r| r.tick()), Some(3));
    Ok(())
}

#[test]
fn is_connected_only_observes() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;
    producer.publish(1, &row(1.0, 1.0, 1))?;

    assert!(connection.is_connected());
    assert!(connection.is_connected());
    // the pending row is still delivered
    assert_eq!(connection.wait_for_data(SHORT)?.map(|r| r.tick()), Some(1));
    Ok(())
}

#[test]
fn staleness_timeout_drops_connected() -> anyhow::Result<()> {
    let platform = MemoryPlatform::with_image(builder().build_live());
    let config = ConnectionConfig::default().with_staleness_timeout(Duration::ZERO);
    let mut connection = Connection::new(platform, config);
    connection.connect()?;

    assert!(!connection.is_connected());
    assert_eq!(connection.state(), ConnectionState::Connected);
    Ok(())
}

#[test]
fn max_rate_spaces_out_records() -> anyhow::Result<()> {
    let platform = MemoryPlatform::with_image(builder().build_live());
    let producer = platform.producer();
    let config = ConnectionConfig::default().with_max_rate(UpdateRate::Max(20));
    let mut connection = Connection::new(platform, config);
    assert!(connection.wait_for_data(SHORT)?.is_some());

    let started = Instant::now();
    producer.publish(1, &row(1.0, 1.0, 1))?;
    assert!(connection.wait_for_data(SHORT)?.is_some());
    assert!(started.elapsed() >= Duration::from_millis(40));
    Ok(())
}

#[test]
fn native_rate_does_not_sleep() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;
    connection.set_max_rate(UpdateRate::Max(120));

    let started = Instant::now();
    producer.publish(1, &row(1.0, 1.0, 1))?;
    assert!(connection.wait_for_data(SHORT)?.is_some());
    assert!(started.elapsed() < Duration::from_millis(500));
    Ok(())
}

#[test]
fn filtered_fields_decode_only_what_was_asked() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;
    producer.publish(1, &row(30.0, 5000.0, 4))?;

    let record = connection.wait_for_fields(SHORT, &["Gear", "Missing"])?.expect("row");
    assert_eq!(record.len(), 1);
    assert_eq!(record.i32("Gear"), Some(4));
    assert!(!record.contains("Speed"));
    Ok(())
}

#[test]
fn telemetry_view_maps_known_fields() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;
    producer.publish(1, &row(55.0, 7000.0, 5))?;

    let data = connection.wait_for_telemetry(SHORT)?.expect("row");
    assert_eq!(data.speed, 55.0);
    assert_eq!(data.rpm, 7000.0);
    assert_eq!(data.gear, 5);
    Ok(())
}

#[test]
fn session_document_is_framed_and_parsed() -> anyhow::Result<()> {
    let (mut connection, _producer) = setup();

    let text = connection.session_info()?;
    assert!(text.starts_with("---"));
    assert!(!text.contains("\n..."));

    let session = connection.session_data()?;
    assert_eq!(session.weekend_info.track_name, "lagunaseca");
    assert_eq!(session.driver_info.driver_car_idx, 1);
    Ok(())
}

#[test]
fn session_data_is_reparsed_only_on_update() -> anyhow::Result<()> {
    let (mut connection, producer) = setup();
    assert_eq!(connection.session_data()?.weekend_info.track_name, "lagunaseca");

    // same length so every offset stays put
    producer.update(|image| {
        let at = image
            .windows(10)
            .position(|window| window == b"lagunaseca")
            .ok_or_else(|| TelemetryError::parse("test image", "track name missing"))?;
        image[at..at + 10].copy_from_slice(b"sebringint");
        Ok(())
    })?;
    assert_eq!(connection.session_data()?.weekend_info.track_name, "lagunaseca");

    rewrite_header(&producer, |header| header.session_info_update += 1)?;
    assert_eq!(connection.session_data()?.weekend_info.track_name, "sebringint");
    Ok(())
}

#[test]
fn reconnect_releases_previous_handles() -> anyhow::Result<()> {
    let (mut connection, _producer) = setup();
    connection.connect()?;
    connection.connect()?;
    assert_eq!(connection.platform().open_handles(), 3);

    connection.disconnect();
    assert_eq!(connection.platform().open_handles(), 0);
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert!(connection.header().is_none());
    assert!(connection.descriptors().is_empty());
    Ok(())
}

#[test]
fn dropping_the_connection_closes_handles() -> anyhow::Result<()> {
    let platform = MemoryPlatform::with_image(builder().build_live());
    {
        let mut connection = Connection::new(platform.clone(), ConnectionConfig::default());
        connection.connect()?;
        assert_eq!(platform.open_handles(), 3);
    }
    assert_eq!(platform.open_handles(), 0);
    Ok(())
}

#[test]
fn live_header_tracks_the_producer() -> anyhow::Result<()> {
    let (mut connection, producer) = primed()?;
    rewrite_header(&producer, |header| header.status &= !IRSDK_STATUS_CONNECTED)?;

    assert!(!connection.live_header()?.is_connected());
    assert!(connection.header().is_some_and(Header::is_connected));
    assert!(matches!(connection.wait_for_data(SHORT), Err(TelemetryError::NotConnected)));
    Ok(())
}

#[test]
fn broadcaster_sends_through_the_platform() -> anyhow::Result<()> {
    let (connection, _producer) = setup();
    let broadcaster = connection.broadcaster()?;
    broadcaster.send(BroadcastMsg::ReplaySetPlaySpeed, 2, 1, 0)?;

    let sent = connection.platform().sent_broadcasts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message_id, broadcaster.message_id());
    assert_eq!(sent[0].wparam, make_long(BroadcastMsg::ReplaySetPlaySpeed as u16, 2));
    assert_eq!(sent[0].lparam, make_long(1, 0));
    Ok(())
}
