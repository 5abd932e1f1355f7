//! Synthetic telemetry images for tests and benchmarks
//!
//! [`ImageBuilder`] lays out a live shared-memory image or an `.ibt` disk image from a list of
//! descriptors, using the crate's own encoders. Rows are written afterwards with
//! [`crate::platform::memory::write_row`] (live) or passed to [`ImageBuilder::build_disk`].

#![cfg(any(test, feature = "benchmark"))]

use crate::schema::{
    BufferSlot, DISK_SUB_HEADER_SIZE, DiskSubHeader, HEADER_SIZE, Header, IRSDK_MAX_BUFS,
    IRSDK_STATUS_CONNECTED, IRSDK_VER, SESSION_END_MARKER, VAR_HEADER_SIZE,
};
use crate::types::{VarDescriptor, VariableType};

/// A session document exercising every section the parser models.
///
/// The player's user name carries an unescaped apostrophe and the car design string starts
/// with a comma, as the simulator writes them.
pub const SAMPLE_SESSION_YAML: &str = "---
WeekendInfo:
 TrackName: lagunaseca
 TrackID: 47
 TrackLength: 3.60 km
 TrackDisplayName: WeatherTech Raceway at Laguna Seca
 TrackCity: Monterey
 TrackCountry: USA
 TrackNumTurns: 11
 TrackPitSpeedLimit: 72.42 kph
 SeriesID: 0
 SubSessionID: 0
 QualifierMustStartRace: 0
 WeekendOptions:
  NumStarters: 2
  StartingGrid: 2x2 inline pole on left
  StandingStart: 1
  NightMode: 0
  IsFixedSetup: 0
 TelemetryOptions:
  TelemetryDiskFile: \"\"

SessionInfo:
 Sessions:
 - SessionNum: 0
   SessionLaps: unlimited
   SessionTime: 600.0000 sec
   SessionType: Practice
   ResultsPositions:
   ResultsFastestLap:
 - SessionNum: 1
   SessionLaps: 10
   SessionTime: unlimited
   SessionType: Race
   ResultsPositions:
   - Position: 1
     ClassPosition: 0
     CarIdx: 1
     FastestTime: 82.5010
     LapsComplete: 4
   ResultsFastestLap:
   - CarIdx: 1
     FastestLap: 3
     FastestTime: 82.5010

CameraInfo:
 Groups:
 - GroupNum: 1
   GroupName: Nose
   Cameras:
   - CameraNum: 1
     CameraName: CamNose
 - GroupNum: 2
   GroupName: Scenic
   IsScenic: true
   Cameras:
   - CameraNum: 1
     CameraName: CamScenic

RadioInfo:
 SelectedRadioNum: 0
 Radios:
 - RadioNum: 0
   HopCount: 2
   NumFrequencies: 1
   TunedToFrequencyNum: 0
   ScanningIsOn: 1
   Frequencies:
   - FrequencyNum: 0
     FrequencyName: \"@ALLTEAMS\"
     Priority: 12
     CarIdx: -1
     EntryIdx: -1
     ClubID: 0
     CanScan: 1
     CanSquawk: 1
     Muted: 0
     IsMutable: 1
     IsDeletable: 0

DriverInfo:
 DriverCarIdx: 1
 DriverCarIdleRPM: 900.000
 DriverCarRedLine: 7500.000
 Drivers:
 - CarIdx: 0
   UserName: Pace Car
   CarNumber: \"0\"
   CarNumberRaw: 0
   CarIsPaceCar: 1
   IsSpectator: 0
 - CarIdx: 1
   UserName: Pat O'Brien
   AbbrevName: O'Brien, P
   Initials: PO
   TeamName: Pat O'Brien
   CarNumber: \"42\"
   CarNumberRaw: 42
   CarScreenName: Mazda MX-5 Cup
   CarDesignStr: ,FFFFFF,ED2129,2E2E2E
   IRating: 1350
   LicString: D 2.50
   CarIsPaceCar: 0
   IsSpectator: 0

SplitTimeInfo:
 Sectors:
 - SectorNum: 0
   SectorStartPct: 0.000000
 - SectorNum: 1
   SectorStartPct: 0.333000
 - SectorNum: 2
   SectorStartPct: 0.667000
";

/// Descriptor with empty description and unit.
pub fn descriptor(name: &str, var_type: VariableType, offset: usize, count: usize) -> VarDescriptor {
    VarDescriptor {
        name: name.to_string(),
        var_type,
        offset,
        count,
        count_as_time: false,
        description: String::new(),
        unit: String::new(),
    }
}

/// Scalar float descriptor.
pub fn float_descriptor(name: &str, offset: usize) -> VarDescriptor {
    descriptor(name, VariableType::Float32, offset, 1)
}

/// Builds byte-exact live and disk telemetry images.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    descriptors: Vec<VarDescriptor>,
    row_len: usize,
    num_buf: usize,
    tick_rate: i32,
    status: i32,
    version: i32,
    session_update: i32,
    session_yaml: String,
}

impl ImageBuilder {
    /// Connected, version 2, 60Hz, three buffers, sample session document.
    pub fn new(descriptors: Vec<VarDescriptor>, row_len: usize) -> Self {
        Self {
            descriptors,
            row_len,
            num_buf: 3,
            tick_rate: 60,
            status: IRSDK_STATUS_CONNECTED,
            version: IRSDK_VER,
            session_update: 1,
            session_yaml: SAMPLE_SESSION_YAML.to_string(),
        }
    }

    pub fn num_buf(mut self, num_buf: usize) -> Self {
        self.num_buf = num_buf.clamp(1, IRSDK_MAX_BUFS);
        self
    }

    pub fn tick_rate(mut self, tick_rate: i32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    pub fn status(mut self, status: i32) -> Self {
        self.status = status;
        self
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn session_update(mut self, update: i32) -> Self {
        self.session_update = update;
        self
    }

    /// Session document body; the end marker is appended when the image is built.
    pub fn session_yaml(mut self, yaml: impl Into<String>) -> Self {
        self.session_yaml = yaml.into();
        self
    }

    /// Live image: header, descriptors, session document, then one row per slot.
    ///
    /// Every slot starts at tick 0 with a zeroed row.
    pub fn build_live(&self) -> Vec<u8> {
        let var_header_offset = HEADER_SIZE;
        let (image, rows_start) = self.layout(var_header_offset);

        let mut header = self.header(var_header_offset);
        for slot in 0..self.num_buf {
            header.var_buf[slot] =
                BufferSlot { tick_count: 0, buf_offset: to_i32(rows_start + slot * self.row_len) };
        }
        self.finish(image, header, rows_start + self.num_buf * self.row_len)
    }

    /// Disk image: header, sub-header, descriptors, session document, then `rows` back to back.
    ///
    /// Rows are written as given, so a short last row models a file cut off mid-write.
    pub fn build_disk(&self, rows: &[Vec<u8>]) -> Vec<u8> {
        let var_header_offset = HEADER_SIZE + DISK_SUB_HEADER_SIZE;
        let (mut image, rows_start) = self.layout(var_header_offset);

        let mut header = self.header(var_header_offset);
        header.num_buf = 1;
        header.var_buf[0] = BufferSlot { tick_count: 0, buf_offset: to_i32(rows_start) };

        let sub_header = DiskSubHeader {
            session_start_date: 1_700_000_000,
            session_start_time: 0.0,
            session_end_time: rows.len() as f64 / f64::from(self.tick_rate.max(1)),
            session_lap_count: 1,
            session_record_count: to_i32(rows.len()),
        };
        image[HEADER_SIZE..HEADER_SIZE + DISK_SUB_HEADER_SIZE]
            .copy_from_slice(&sub_header.to_bytes());

        let mut image = self.finish(image, header, rows_start);
        for row in rows {
            image.extend_from_slice(row);
        }
        image
    }

    fn header(&self, var_header_offset: usize) -> Header {
        let session_offset = self.session_offset(var_header_offset);
        Header {
            ver: self.version,
            status: self.status,
            tick_rate: self.tick_rate,
            session_info_update: self.session_update,
            session_info_len: to_i32(self.session_bytes().len()),
            session_info_offset: to_i32(session_offset),
            num_vars: to_i32(self.descriptors.len()),
            var_header_offset: to_i32(var_header_offset),
            num_buf: to_i32(self.num_buf),
            buf_len: to_i32(self.row_len),
            var_buf: [BufferSlot::default(); IRSDK_MAX_BUFS],
        }
    }

    fn session_offset(&self, var_header_offset: usize) -> usize {
        var_header_offset + self.descriptors.len() * VAR_HEADER_SIZE
    }

    fn session_bytes(&self) -> Vec<u8> {
        let mut bytes = self.session_yaml.as_bytes().to_vec();
        bytes.extend_from_slice(SESSION_END_MARKER);
        bytes.extend_from_slice(b"\n\0\0\0\0");
        bytes
    }

    /// Descriptor table and session document written; returns the image and where rows begin.
    fn layout(&self, var_header_offset: usize) -> (Vec<u8>, usize) {
        let session_offset = self.session_offset(var_header_offset);
        let session = self.session_bytes();
        let rows_start = session_offset + session.len();

        let mut image = vec![0u8; rows_start];
        for (i, descriptor) in self.descriptors.iter().enumerate() {
            let start = var_header_offset + i * VAR_HEADER_SIZE;
            let record = descriptor.to_bytes().expect("test descriptor fits the record layout");
            image[start..start + VAR_HEADER_SIZE].copy_from_slice(&record);
        }
        image[session_offset..rows_start].copy_from_slice(&session);
        (image, rows_start)
    }

    fn finish(&self, mut image: Vec<u8>, header: Header, len: usize) -> Vec<u8> {
        image.resize(len.max(image.len()), 0);
        image[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        image
    }
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).expect("synthetic image fits i32 offsets")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SessionData, decode_var_descriptors, read_session_info};

    #[test]
    fn live_image_decodes_with_the_crate_decoders() -> anyhow::Result<()> {
        let descriptors = vec![float_descriptor("Speed", 0), descriptor("Gear", VariableType::Int32, 4, 1)];
        let image = ImageBuilder::new(descriptors.clone(), 8).build_live();

        let header = Header::decode(&image)?;
        header.validate(IRSDK_VER)?;
        assert!(header.is_connected());
        assert_eq!(decode_var_descriptors(&image, &header)?, descriptors);
        for slot in 0..header.active_slots() {
            assert!(header.row_range(slot)?.end <= image.len());
        }

        let data = SessionData::parse(&read_session_info(&image, &header)?)?;
        assert_eq!(data.weekend_info.track_name, "lagunaseca");
        Ok(())
    }

    #[test]
    fn disk_image_places_rows_after_the_session_document() -> anyhow::Result<()> {
        let rows = vec![vec![1u8; 4], vec![2u8; 4]];
        let image = ImageBuilder::new(vec![float_descriptor("Speed", 0)], 4).build_disk(&rows);

        let header = Header::decode(&image)?;
        let sub_header = DiskSubHeader::decode(&image[HEADER_SIZE..])?;
        assert_eq!(header.num_buf, 1);
        assert_eq!(header.var_header_offset as usize, HEADER_SIZE + DISK_SUB_HEADER_SIZE);
        assert_eq!(sub_header.session_record_count, 2);

        let start = header.row_range(0)?.start;
        assert_eq!(&image[start..start + 4], &[1u8; 4]);
        assert_eq!(image.len(), start + 8);
        Ok(())
    }
}
