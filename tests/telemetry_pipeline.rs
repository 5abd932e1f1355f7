//! End-to-end checks through the public API: image bytes in, records out.
//!
//! Images are assembled here with the crate's public encoders so the tests exercise the same
//! layout a producer writes.

use futures::StreamExt;
use irtelem::platform::MemoryPlatform;
use irtelem::schema::{
    BufferSlot, DISK_SUB_HEADER_SIZE, DiskSubHeader, HEADER_SIZE, IRSDK_MAX_BUFS,
    IRSDK_STATUS_CONNECTED, IRSDK_VER, SESSION_END_MARKER, VAR_HEADER_SIZE, frame_session_info,
};
use irtelem::{
    Connection, ConnectionConfig, DecodeWarning, DiskReader, Header, TelemetryError,
    UpdateRate, Value, VarDescriptor, VariableType, decode_row,
};
use std::time::Duration;

const SESSION: &str = "---
WeekendInfo:
 TrackName: spa
 TrackID: 163
 TrackLength: 6.93 km
 TrackDisplayName: Circuit de Spa-Francorchamps
DriverInfo:
 DriverCarIdx: 0
 Drivers:
 - CarIdx: 0
   UserName: Alex Driver
   CarNumber: \"7\"
   CarNumberRaw: 7
";

const ROW_LEN: usize = 24;
const WAIT: Duration = Duration::from_millis(5);

fn var(name: &str, var_type: VariableType, offset: usize, count: usize) -> VarDescriptor {
    VarDescriptor {
        name: name.to_string(),
        var_type,
        offset,
        count,
        count_as_time: false,
        description: format!("{name} for tests"),
        unit: String::new(),
    }
}

/// Speed f32, Gear i32, SessionFlags bitfield, CarIdxLap i32[3].
fn layout() -> Vec<VarDescriptor> {
    vec![
        var("Speed", VariableType::Float32, 0, 1),
        var("Gear", VariableType::Int32, 4, 1),
        var("SessionFlags", VariableType::BitField, 8, 1),
        var("CarIdxLap", VariableType::Int32, 12, 3),
    ]
}

fn row(speed: f32, gear: i32, laps: [i32; 3]) -> Vec<u8> {
    let mut row = Vec::with_capacity(ROW_LEN);
    row.extend_from_slice(&speed.to_le_bytes());
    row.extend_from_slice(&gear.to_le_bytes());
    row.extend_from_slice(&0x0000_0004u32.to_le_bytes());
    for lap in laps {
        row.extend_from_slice(&lap.to_le_bytes());
    }
    row
}

/// Header, room for the sub-header when `disk`, descriptors and session document.
fn prefix(disk: bool, num_buf: usize) -> anyhow::Result<(Vec<u8>, Header)> {
    let descriptors = layout();
    let var_header_offset = HEADER_SIZE + if disk { DISK_SUB_HEADER_SIZE } else { 0 };
    let session_offset = var_header_offset + descriptors.len() * VAR_HEADER_SIZE;
    let mut session = SESSION.as_bytes().to_vec();
    session.extend_from_slice(SESSION_END_MARKER);
    session.extend_from_slice(b"\n\0\0\0");
    let rows_start = session_offset + session.len();

    let mut image = vec![0u8; rows_start];
    for (i, descriptor) in descriptors.iter().enumerate() {
        let at = var_header_offset + i * VAR_HEADER_SIZE;
        image[at..at + VAR_HEADER_SIZE].copy_from_slice(&descriptor.to_bytes()?);
    }
    image[session_offset..rows_start].copy_from_slice(&session);

    let mut var_buf = [BufferSlot::default(); IRSDK_MAX_BUFS];
    for (slot, buf) in var_buf.iter_mut().enumerate().take(num_buf) {
        buf.buf_offset = i32::try_from(rows_start + slot * ROW_LEN)?;
    }
    let header = Header {
        ver: IRSDK_VER,
        status: IRSDK_STATUS_CONNECTED,
        tick_rate: 60,
        session_info_update: 3,
        session_info_len: i32::try_from(session.len())?,
        session_info_offset: i32::try_from(session_offset)?,
        num_vars: i32::try_from(descriptors.len())?,
        var_header_offset: i32::try_from(var_header_offset)?,
        num_buf: i32::try_from(num_buf)?,
        buf_len: i32::try_from(ROW_LEN)?,
        var_buf,
    };
    image[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    Ok((image, header))
}

fn live_image() -> anyhow::Result<Vec<u8>> {
    let (mut image, _) = prefix(false, 3)?;
    image.resize(image.len() + 3 * ROW_LEN, 0);
    Ok(image)
}

fn disk_image(rows: &[Vec<u8>]) -> anyhow::Result<Vec<u8>> {
    let (mut image, _) = prefix(true, 1)?;
    let sub_header = DiskSubHeader {
        session_start_date: 1_700_000_000,
        session_start_time: 0.0,
        session_end_time: 1.0,
        session_lap_count: 2,
        session_record_count: i32::try_from(rows.len())?,
    };
    image[HEADER_SIZE..HEADER_SIZE + DISK_SUB_HEADER_SIZE].copy_from_slice(&sub_header.to_bytes());
    for row in rows {
        image.extend_from_slice(row);
    }
    Ok(image)
}

#[test]
fn live_connection_follows_the_producer() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let platform = MemoryPlatform::with_image(live_image()?);
    let producer = platform.producer();
    let mut connection = Connection::new(platform.clone(), ConnectionConfig::default());

    assert_eq!(connection.wait_for_data(WAIT)?.map(|r| r.tick()), Some(0));

    // ticks 5, 5, 7, 4: fresh, stale, fresh, reset
    producer.publish(5, &row(20.0, 2, [1, 1, 0]))?;
    let record = connection.wait_for_data(WAIT)?.expect("tick 5");
    assert_eq!(record.tick(), 5);
    assert_eq!(record.get("CarIdxLap"), Some(&Value::Array(vec![Value::Int(1), Value::Int(1), Value::Int(0)])));
    assert_eq!(record.flags("SessionFlags").and_then(|flags| flags.get("Green")), Some(true));

    assert!(connection.wait_for_data(WAIT)?.is_none());

    producer.publish(7, &row(25.0, 3, [1, 2, 1]))?;
    assert_eq!(connection.wait_for_data(WAIT)?.and_then(|r| r.i32("Gear")), Some(3));

    for slot in 0..3 {
        producer.write_row(slot, 4, &row(0.0, 0, [0; 3]))?;
    }
    assert!(connection.wait_for_data(WAIT)?.is_none());

    assert_eq!(connection.session_data()?.weekend_info.track_name, "spa");
    connection.disconnect();
    assert_eq!(platform.open_handles(), 0);
    Ok(())
}

#[test]
fn missing_producer_surfaces_from_the_lazy_connect() {
    let mut connection = Connection::new(MemoryPlatform::new(), ConnectionConfig::default());
    let err = connection.wait_for_data(WAIT).expect_err("nothing published");
    assert!(matches!(err, TelemetryError::Platform { .. }));
    assert!(err.is_retryable());
}

#[test]
fn field_at_row_end_decodes_and_past_it_warns() {
    let row = row(1.0, 2, [3, 4, 5]);
    let descriptors = vec![
        var("LastLap", VariableType::Int32, ROW_LEN - 4, 1),
        var("PastEnd", VariableType::Int32, ROW_LEN - 3, 1),
    ];

    let record = decode_row(&descriptors, &row, 1);
    assert_eq!(record.i32("LastLap"), Some(5));
    assert!(!record.contains("PastEnd"));
    assert_eq!(
        record.warnings(),
        &[DecodeWarning::FieldOutOfBounds {
            field: "PastEnd".to_string(),
            offset: ROW_LEN - 3,
            width: 4,
            row_len: ROW_LEN,
        }]
    );
}

#[test]
fn disk_reader_stops_at_a_partial_row() -> anyhow::Result<()> {
    let mut rows: Vec<Vec<u8>> = (0..3).map(|i| row(i as f32, 1, [i; 3])).collect();
    rows.push(row(9.0, 9, [9; 3])[..10].to_vec());

    let mut reader = DiskReader::from_bytes(disk_image(&rows)?)?;
    let records = reader.records().collect::<irtelem::Result<Vec<_>>>()?;
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].f32("Speed"), Some(2.0));
    assert_eq!(reader.session_data()?.driver_info.drivers[0].user_name, "Alex Driver");
    Ok(())
}

#[test]
fn session_text_is_cut_at_the_end_marker() -> anyhow::Result<()> {
    assert_eq!(frame_session_info(b"Foo: 1\n...\ntrailer")?, "Foo: 1");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replay_stream_plays_the_whole_file() -> anyhow::Result<()> {
    let rows: Vec<Vec<u8>> = (0..10).map(|i| row(i as f32, 2, [i; 3])).collect();
    let reader = DiskReader::from_bytes(disk_image(&rows)?)?;

    let speeds: Vec<f32> = irtelem::stream::replay(reader, UpdateRate::Native)
        .filter_map(|record| async move { record.ok().and_then(|r| r.f32("Speed")) })
        .collect()
        .await;
    assert_eq!(speeds.len(), 10);
    assert_eq!(speeds.last(), Some(&9.0));
    Ok(())
}
