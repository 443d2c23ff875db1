//! Experiment-file parsing.
//!
//! Experiments persist their traces on board as a self-describing stream of
//! variable-length records, each preceded by a one-byte record id (PID).
//! Two PIDs are structural: `0x47` is a synchronization marker and `0xFF` is
//! run-length padding (a run collapses to a single [`Record::Padding`] with
//! a count). Every other recognized PID selects a fixed sub-parser.
//!
//! ```text
//! File       := Record*
//! Record     := Sync | Timestamp | Padding | TypedRecord
//! Sync       := 0x47
//! Timestamp  := 0x01 le64            // milliseconds
//! Padding    := 0xFF+
//! TypedRecord:= pid:u8 payload(pid)
//! ```
//!
//! An unknown PID is a recoverable condition, not an error: parsing stops at
//! the last valid record boundary and the unconsumed remainder is handed
//! back to the caller, who decides whether to treat it as end-of-stream.

use bytes::Bytes;
use groundwire_codec::{Cursor, ParseResult, alternative, count, repeat};

use crate::beacon::{self, BeaconTelemetry};
use crate::errors::{ProtocolError, Result};

/// Record ids, as written by the flight software.
pub mod pid {
    /// Synchronization marker.
    pub const SYNC: u8 = 0x47;
    /// Millisecond timestamp.
    pub const TIMESTAMP: u8 = 0x01;
    /// Run-length padding byte.
    pub const PADDING: u8 = 0xFF;
    /// Gyroscope sample.
    pub const GYRO: u8 = 0x10;
    /// Experimental sun sensor, primary readout.
    pub const EXP_SUNS_PRIMARY: u8 = 0x11;
    /// Experimental sun sensor, secondary readout.
    pub const EXP_SUNS_SECONDARY: u8 = 0x12;
    /// Reference sun sensor voltages.
    pub const REF_SUNS: u8 = 0x13;
    /// Sail deployment telemetry.
    pub const SAIL: u8 = 0x18;
    /// Magnetometer sample.
    pub const MAGNETOMETER: u8 = 0x21;
    /// Commanded magnetorquer dipoles.
    pub const DIPOLES: u8 = 0x22;
    /// Payload who-am-i register.
    pub const PAYLOAD_WHOAMI: u8 = 0x30;
    /// Payload temperature block.
    pub const TEMPERATURES: u8 = 0x32;
    /// Payload photodiodes.
    pub const PHOTODIODES: u8 = 0x33;
    /// Payload housekeeping voltages.
    pub const HOUSEKEEPING: u8 = 0x34;
    /// RadFET dosimeter readout.
    pub const RADFET: u8 = 0x35;
    /// Bit-packed OBC telemetry slice (beacon body layout).
    pub const OBC_TELEMETRY: u8 = 0x36;
    /// Camera synchronization counter.
    pub const CAMERA_SYNC: u8 = 0x37;
}

/// One parsed experiment-file record. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `0x47` synchronization marker.
    Sync,
    /// `0x01`: timestamp in milliseconds.
    Timestamp {
        /// Milliseconds since experiment start.
        millis: u64,
    },
    /// A run of `0xFF` padding bytes, collapsed to its length.
    Padding {
        /// Number of padding bytes in the run.
        length: usize,
    },
    /// `0x10`: gyroscope sample, raw axes plus die temperature.
    Gyro {
        /// X axis.
        x: u16,
        /// Y axis.
        y: u16,
        /// Z axis.
        z: u16,
        /// Die temperature.
        temperature: u16,
    },
    /// `0x11`: experimental sun sensor primary readout.
    ExpSunsPrimary {
        /// Who-am-i register.
        whoami: u8,
        /// ALS status per panel.
        status: [u16; 3],
        /// Visible-light readings, 4 diodes per panel.
        visible: [[u16; 4]; 3],
        /// Structure temperatures.
        temperatures: [u16; 5],
    },
    /// `0x12`: experimental sun sensor secondary readout.
    ExpSunsSecondary {
        /// Programmed gain.
        gain: u8,
        /// Programmed integration time.
        itime: u8,
        /// Infrared readings, 4 diodes per panel.
        infrared: [[u16; 4]; 3],
    },
    /// `0x13`: reference sun sensor voltages.
    RefSuns {
        /// Cell voltages.
        voltages: [u16; 5],
    },
    /// `0x18`: sail deployment telemetry.
    Sail {
        /// Bracket temperature.
        temperature: u16,
        /// Opening indicator.
        open: u8,
    },
    /// `0x21`: magnetometer sample.
    Magnetometer {
        /// Raw axis readings.
        axes: [u32; 3],
    },
    /// `0x22`: commanded magnetorquer dipoles.
    Dipoles {
        /// Raw dipole per axis.
        dipoles: [u16; 3],
    },
    /// `0x30`: payload who-am-i register.
    PayloadWhoami {
        /// Register value.
        whoami: u8,
    },
    /// `0x32`: payload temperature block.
    Temperatures {
        /// Raw thermistor readings.
        temperatures: [u16; 9],
    },
    /// `0x33`: payload photodiodes.
    Photodiodes {
        /// Raw diode readings.
        diodes: [u16; 4],
    },
    /// `0x34`: payload housekeeping voltages.
    Housekeeping {
        /// Internal 3V3d rail.
        int_3v3d: u16,
        /// OBC 3V3d rail.
        obc_3v3d: u16,
    },
    /// `0x35`: RadFET dosimeter readout.
    RadFet {
        /// Readout status.
        status: u8,
        /// Temperature channel.
        temperature: u32,
        /// Gate voltages.
        voltages: [u32; 3],
    },
    /// `0x36`: fixed-width bit-packed OBC telemetry slice.
    ObcTelemetry {
        /// Raw beacon-layout body, [`beacon::BODY_BYTES`] long.
        body: Bytes,
    },
    /// `0x37`: camera synchronization counter.
    CameraSync {
        /// Counter value.
        count: u8,
    },
}

impl Record {
    /// Canonical serialized form of the record, PID byte included.
    ///
    /// Parsing the concatenation of canonical bytes yields the same record
    /// list, modulo collapse of adjacent padding runs.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Sync => out.push(pid::SYNC),
            Self::Timestamp { millis } => {
                out.push(pid::TIMESTAMP);
                out.extend_from_slice(&millis.to_le_bytes());
            },
            Self::Padding { length } => out.extend(std::iter::repeat_n(pid::PADDING, *length)),
            Self::Gyro { x, y, z, temperature } => {
                out.push(pid::GYRO);
                for v in [x, y, z, temperature] {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::ExpSunsPrimary { whoami, status, visible, temperatures } => {
                out.push(pid::EXP_SUNS_PRIMARY);
                out.push(*whoami);
                for v in status {
                    out.extend_from_slice(&v.to_le_bytes());
                }
                for panel in visible {
                    for v in panel {
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }
                for v in temperatures {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::ExpSunsSecondary { gain, itime, infrared } => {
                out.push(pid::EXP_SUNS_SECONDARY);
                out.push(*gain);
                out.push(*itime);
                for panel in infrared {
                    for v in panel {
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }
            },
            Self::RefSuns { voltages } => {
                out.push(pid::REF_SUNS);
                for v in voltages {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::Sail { temperature, open } => {
                out.push(pid::SAIL);
                out.extend_from_slice(&temperature.to_le_bytes());
                out.push(*open);
            },
            Self::Magnetometer { axes } => {
                out.push(pid::MAGNETOMETER);
                for v in axes {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::Dipoles { dipoles } => {
                out.push(pid::DIPOLES);
                for v in dipoles {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::PayloadWhoami { whoami } => {
                out.push(pid::PAYLOAD_WHOAMI);
                out.push(*whoami);
            },
            Self::Temperatures { temperatures } => {
                out.push(pid::TEMPERATURES);
                for v in temperatures {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::Photodiodes { diodes } => {
                out.push(pid::PHOTODIODES);
                for v in diodes {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::Housekeeping { int_3v3d, obc_3v3d } => {
                out.push(pid::HOUSEKEEPING);
                out.extend_from_slice(&int_3v3d.to_le_bytes());
                out.extend_from_slice(&obc_3v3d.to_le_bytes());
            },
            Self::RadFet { status, temperature, voltages } => {
                out.push(pid::RADFET);
                out.push(*status);
                out.extend_from_slice(&temperature.to_le_bytes());
                for v in voltages {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            },
            Self::ObcTelemetry { body } => {
                out.push(pid::OBC_TELEMETRY);
                out.extend_from_slice(body);
            },
            Self::CameraSync { count } => {
                out.push(pid::CAMERA_SYNC);
                out.push(*count);
            },
        }
        out
    }

    /// Parses the beacon-layout body of an [`Record::ObcTelemetry`] record.
    ///
    /// Returns `None` for every other record kind.
    #[must_use]
    pub fn telemetry(&self) -> Option<BeaconTelemetry> {
        match self {
            Self::ObcTelemetry { body } => Some(BeaconTelemetry::parse(body)),
            _ => None,
        }
    }
}

/// Outcome of parsing an experiment file: the records recognized up to the
/// last valid boundary, plus whatever could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentFile {
    /// Records in file order.
    pub records: Vec<Record>,
    /// Unparsed remainder; empty when the whole input was consumed.
    pub remainder: Bytes,
}

impl ExperimentFile {
    /// Parses as much of `bytes` as possible. Never fails: unknown PIDs and
    /// truncated payloads end the parse at the last record boundary, and the
    /// leftover bytes come back in `remainder`.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        let mut cursor = Cursor::new(bytes);
        let mut records = Vec::new();
        while !cursor.is_empty() {
            let mark = cursor.checkpoint();
            match record(&mut cursor) {
                Ok(rec) => records.push(rec),
                Err(_) => {
                    cursor.restore(mark);
                    break;
                },
            }
        }
        Self { records, remainder: Bytes::copy_from_slice(cursor.rest()) }
    }

    /// Like [`ExperimentFile::parse`], but any unparsed remainder is an
    /// error naming the offending PID and offset.
    pub fn parse_strict(bytes: &[u8]) -> Result<Vec<Record>> {
        let file = Self::parse(bytes);
        if file.remainder.is_empty() {
            Ok(file.records)
        } else {
            Err(ProtocolError::UnknownPid {
                pid: file.remainder[0],
                offset: bytes.len() - file.remainder.len(),
            })
        }
    }
}

/// `Record := Sync | Timestamp | Padding | TypedRecord`, tried in order with
/// the cursor restored between branches.
fn record(cursor: &mut Cursor<'_>) -> ParseResult<Record> {
    alternative(
        sync_marker,
        alternative(timestamp, alternative(padding_run, typed_record)),
    )(cursor)
}

fn sync_marker(cursor: &mut Cursor<'_>) -> ParseResult<Record> {
    cursor.expect_u8(pid::SYNC, "sync marker")?;
    Ok(Record::Sync)
}

fn timestamp(cursor: &mut Cursor<'_>) -> ParseResult<Record> {
    cursor.expect_u8(pid::TIMESTAMP, "timestamp pid")?;
    Ok(Record::Timestamp { millis: cursor.u64_le()? })
}

fn padding_run(cursor: &mut Cursor<'_>) -> ParseResult<Record> {
    cursor.expect_u8(pid::PADDING, "padding byte")?;
    let tail = repeat(|c: &mut Cursor<'_>| c.expect_u8(pid::PADDING, "padding byte"))(cursor)?;
    Ok(Record::Padding { length: 1 + tail.len() })
}

fn typed_record(cursor: &mut Cursor<'_>) -> ParseResult<Record> {
    let id = cursor.u8()?;
    match id {
        pid::GYRO => Ok(Record::Gyro {
            x: cursor.u16_le()?,
            y: cursor.u16_le()?,
            z: cursor.u16_le()?,
            temperature: cursor.u16_le()?,
        }),
        pid::EXP_SUNS_PRIMARY => Ok(Record::ExpSunsPrimary {
            whoami: cursor.u8()?,
            status: le16_array(cursor)?,
            visible: panels(cursor)?,
            temperatures: le16_array(cursor)?,
        }),
        pid::EXP_SUNS_SECONDARY => Ok(Record::ExpSunsSecondary {
            gain: cursor.u8()?,
            itime: cursor.u8()?,
            infrared: panels(cursor)?,
        }),
        pid::REF_SUNS => Ok(Record::RefSuns { voltages: le16_array(cursor)? }),
        pid::SAIL => Ok(Record::Sail { temperature: cursor.u16_le()?, open: cursor.u8()? }),
        pid::MAGNETOMETER => Ok(Record::Magnetometer { axes: le32_array(cursor)? }),
        pid::DIPOLES => Ok(Record::Dipoles { dipoles: le16_array(cursor)? }),
        pid::PAYLOAD_WHOAMI => Ok(Record::PayloadWhoami { whoami: cursor.u8()? }),
        pid::TEMPERATURES => Ok(Record::Temperatures { temperatures: le16_array(cursor)? }),
        pid::PHOTODIODES => Ok(Record::Photodiodes { diodes: le16_array(cursor)? }),
        pid::HOUSEKEEPING => Ok(Record::Housekeeping {
            int_3v3d: cursor.u16_le()?,
            obc_3v3d: cursor.u16_le()?,
        }),
        pid::RADFET => Ok(Record::RadFet {
            status: cursor.u8()?,
            temperature: cursor.u32_le()?,
            voltages: le32_array(cursor)?,
        }),
        pid::OBC_TELEMETRY => {
            let body = cursor.take_bytes(beacon::BODY_BYTES)?;
            Ok(Record::ObcTelemetry { body: Bytes::copy_from_slice(body) })
        },
        pid::CAMERA_SYNC => Ok(Record::CameraSync { count: cursor.u8()? }),
        _ => Err(cursor.fail("experiment record id")),
    }
}

fn le16_array<const N: usize>(cursor: &mut Cursor<'_>) -> ParseResult<[u16; N]> {
    let mut out = [0u16; N];
    for slot in &mut out {
        *slot = cursor.u16_le()?;
    }
    Ok(out)
}

fn le32_array<const N: usize>(cursor: &mut Cursor<'_>) -> ParseResult<[u32; N]> {
    let mut out = [0u32; N];
    for slot in &mut out {
        *slot = cursor.u32_le()?;
    }
    Ok(out)
}

/// Three panels of four 16-bit diode readings each.
fn panels(cursor: &mut Cursor<'_>) -> ParseResult<[[u16; 4]; 3]> {
    let rows = count(le16_array::<4>, 3)(cursor)?;
    let mut out = [[0u16; 4]; 3];
    for (slot, row) in out.iter_mut().zip(rows) {
        *slot = row;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_parse_hands_back_remainder() {
        // Sync, Timestamp(1000 ms), Gyro{1,2,3,4}, then an unknown PID.
        let mut input = vec![pid::SYNC, pid::TIMESTAMP];
        input.extend_from_slice(&1000u64.to_le_bytes());
        input.push(pid::GYRO);
        for v in [1u16, 2, 3, 4] {
            input.extend_from_slice(&v.to_le_bytes());
        }
        input.push(0xFE);

        let file = ExperimentFile::parse(&input);
        assert_eq!(
            file.records,
            vec![
                Record::Sync,
                Record::Timestamp { millis: 1000 },
                Record::Gyro { x: 1, y: 2, z: 3, temperature: 4 },
            ]
        );
        assert_eq!(file.remainder.as_ref(), [0xFE]);

        assert_eq!(
            ExperimentFile::parse_strict(&input),
            Err(ProtocolError::UnknownPid { pid: 0xFE, offset: input.len() - 1 })
        );
    }

    #[test]
    fn padding_run_collapses() {
        let input = [pid::SYNC, 0xFF, 0xFF, 0xFF, pid::SYNC, 0xFF];
        let file = ExperimentFile::parse(&input);
        assert_eq!(
            file.records,
            vec![
                Record::Sync,
                Record::Padding { length: 3 },
                Record::Sync,
                Record::Padding { length: 1 },
            ]
        );
        assert!(file.remainder.is_empty());
    }

    #[test]
    fn truncated_payload_stops_at_record_boundary() {
        // Gyro needs 8 payload bytes; only 3 are present.
        let input = [pid::SYNC, pid::GYRO, 0x01, 0x00, 0x02];
        let file = ExperimentFile::parse(&input);
        assert_eq!(file.records, vec![Record::Sync]);
        assert_eq!(file.remainder.as_ref(), &input[1..]);
    }

    #[test]
    fn suns_records_round_trip() {
        let primary = Record::ExpSunsPrimary {
            whoami: 0x11,
            status: [1, 2, 3],
            visible: [[10, 11, 12, 13], [20, 21, 22, 23], [30, 31, 32, 33]],
            temperatures: [100, 200, 300, 400, 500],
        };
        let secondary = Record::ExpSunsSecondary {
            gain: 2,
            itime: 7,
            infrared: [[1, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]],
        };
        let mut input = primary.canonical_bytes();
        input.extend(secondary.canonical_bytes());

        let file = ExperimentFile::parse(&input);
        assert_eq!(file.records, vec![primary, secondary]);
        assert!(file.remainder.is_empty());
    }

    #[test]
    fn obc_telemetry_record_carries_beacon_body() {
        let body = vec![0xA5u8; beacon::BODY_BYTES];
        let mut input = vec![pid::OBC_TELEMETRY];
        input.extend_from_slice(&body);

        let file = ExperimentFile::parse(&input);
        assert_eq!(file.records.len(), 1);
        let telemetry = file.records[0].telemetry().unwrap();
        assert!(!telemetry.is_truncated());
        assert!(file.records[0].canonical_bytes() == input);
    }

    /// Re-serializing a parsed file and parsing again yields the same record
    /// list, modulo padding-run collapse.
    #[test]
    fn reserialize_idempotence() {
        let records = vec![
            Record::Sync,
            Record::Timestamp { millis: 123_456_789 },
            Record::Gyro { x: 1, y: 2, z: 3, temperature: 4 },
            Record::Padding { length: 5 },
            Record::Magnetometer { axes: [0xDEAD_BEEF, 0, 42] },
            Record::Dipoles { dipoles: [7, 8, 9] },
            Record::PayloadWhoami { whoami: 0x53 },
            Record::Temperatures { temperatures: [1, 2, 3, 4, 5, 6, 7, 8, 9] },
            Record::Photodiodes { diodes: [11, 22, 33, 44] },
            Record::Housekeeping { int_3v3d: 100, obc_3v3d: 200 },
            Record::RadFet { status: 1, temperature: 0x0102_0304, voltages: [1, 2, 3] },
            Record::Sail { temperature: 77, open: 1 },
            Record::RefSuns { voltages: [5, 4, 3, 2, 1] },
            Record::CameraSync { count: 9 },
            Record::Sync,
        ];

        let wire: Vec<u8> = records.iter().flat_map(Record::canonical_bytes).collect();
        let reparsed = ExperimentFile::parse(&wire);
        assert_eq!(reparsed.records, records);
        assert!(reparsed.remainder.is_empty());

        let rewire: Vec<u8> = reparsed.records.iter().flat_map(Record::canonical_bytes).collect();
        assert_eq!(rewire, wire);
    }
}
