//! Bit-packed beacon telemetry.
//!
//! Beacon downlinks (payloads prefixed with the `0xCD` marker) and experiment
//! record `0x36` carry one concatenated little-endian bit stream. Parsing is
//! a fold of a [`BitReader`] over static per-group field tables; there is no
//! per-field code, only data. The group bit budgets are contractual:
//!
//! | group | bits | | group | bits |
//! |---|---|---|---|---|
//! | startup | 72 | | comm | 206 |
//! | program_state | 16 | | gpio | 1 |
//! | time_telemetry | 96 | | mcu_temperature | 12 |
//! | error_counters | 96 | | eps_controller_a | 400 |
//! | scrubbing | 96 | | eps_controller_b | 106 |
//! | system_uptime | 22 | | imtq | 526 |
//! | file_system | 32 | | | |
//! | antenna | 168 | | | |
//! | experiments | 24 | | | |
//! | gyroscope | 64 | | | |
//!
//! Every field exposes its raw integer; fields with a known physical meaning
//! additionally carry a converted view computed by a pure transform from the
//! raw value. If the stream ends inside a field, that field and every later
//! field report [`FieldValue::Empty`]; a truncated beacon never errors.

use groundwire_codec::BitReader;

/// Total bits in a complete beacon body.
pub const TOTAL_BITS: usize = 1937;

/// Bytes occupied by a complete beacon body (last byte zero-padded).
pub const BODY_BYTES: usize = TOTAL_BITS.div_ceil(8);

/// Pure transform from a raw field integer to an engineering value.
///
/// Closed set on purpose: telemetry converters in the source harness were
/// duck-typed callables, which made the set impossible to audit. Every
/// conversion here is one of these kinds and is side-effect free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convert {
    /// Raw value is already the engineering value.
    None,
    /// `raw * scale + offset`.
    Linear {
        /// Multiplier per LSB.
        scale: f64,
        /// Constant offset.
        offset: f64,
    },
    /// Polynomial in the raw value; coefficients from the constant term up.
    Polynomial(&'static [f64]),
    /// Piecewise polynomial: `(upper_bound, coefficients)` segments, first
    /// segment whose bound is ≥ raw wins, last segment catches the rest.
    Piecewise(&'static [(f64, &'static [f64])]),
}

impl Convert {
    /// Applies the transform; `Convert::None` has no converted view.
    #[must_use]
    pub fn apply(&self, raw: f64) -> Option<f64> {
        fn poly(coefficients: &[f64], x: f64) -> f64 {
            coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
        }

        match self {
            Self::None => None,
            Self::Linear { scale, offset } => Some(raw * scale + offset),
            Self::Polynomial(coefficients) => Some(poly(coefficients, raw)),
            Self::Piecewise(segments) => {
                let segment = segments
                    .iter()
                    .find(|(bound, _)| raw <= *bound)
                    .or_else(|| segments.last())?;
                Some(poly(segment.1, raw))
            },
        }
    }
}

/// How the raw bits of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain unsigned integer.
    Unsigned,
    /// Two's-complement signed integer.
    Signed,
}

/// Static description of one bit-packed field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name, unique within its group.
    pub name: &'static str,
    /// Width in bits (1..=64).
    pub width: u32,
    /// Signedness.
    pub kind: FieldKind,
    /// Optional converted view.
    pub convert: Convert,
}

/// Static description of one telemetry group.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    /// Group name.
    pub name: &'static str,
    /// Fields in stream order.
    pub fields: &'static [FieldSpec],
}

/// Raw value of a parsed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Unsigned field that was fully present in the stream.
    Unsigned(u64),
    /// Signed field that was fully present in the stream.
    Signed(i64),
    /// The stream ended inside or before this field.
    Empty,
}

impl FieldValue {
    /// Raw value as f64, if present.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(v) => Some(*v as f64),
            Self::Signed(v) => Some(*v as f64),
            Self::Empty => None,
        }
    }
}

/// One parsed field: raw value plus the optional converted view.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryField {
    /// Field name.
    pub name: &'static str,
    /// Width in bits.
    pub width: u32,
    /// Raw value (always exposed).
    pub value: FieldValue,
    /// Converted engineering value, when the field defines a conversion and
    /// the raw value is present.
    pub converted: Option<f64>,
}

/// One parsed group.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryGroup {
    /// Group name.
    pub name: &'static str,
    /// Fields in stream order.
    pub fields: Vec<TelemetryField>,
}

/// A fully parsed beacon body.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconTelemetry {
    /// Groups in stream order.
    pub groups: Vec<TelemetryGroup>,
}

impl BeaconTelemetry {
    /// Parses a beacon body (without the `0xCD` marker byte).
    ///
    /// Never fails: truncated input reports trailing fields as
    /// [`FieldValue::Empty`].
    #[must_use]
    pub fn parse(body: &[u8]) -> Self {
        let mut reader = BitReader::with_len(body, TOTAL_BITS.min(body.len() * 8));
        let groups = BEACON_GROUPS
            .iter()
            .map(|group| TelemetryGroup {
                name: group.name,
                fields: group.fields.iter().map(|field| read_field(&mut reader, field)).collect(),
            })
            .collect();
        Self { groups }
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&TelemetryGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Looks up a field by group and field name.
    #[must_use]
    pub fn field(&self, group: &str, field: &str) -> Option<&TelemetryField> {
        self.group(group)?.fields.iter().find(|f| f.name == field)
    }

    /// Whether any field ran off the end of the stream.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.groups
            .iter()
            .any(|g| g.fields.iter().any(|f| f.value == FieldValue::Empty))
    }
}

fn read_field(reader: &mut BitReader<'_>, spec: &FieldSpec) -> TelemetryField {
    let value = match spec.kind {
        FieldKind::Unsigned => {
            reader.take(spec.width).map_or(FieldValue::Empty, FieldValue::Unsigned)
        },
        FieldKind::Signed => {
            reader.take_signed(spec.width).map_or(FieldValue::Empty, FieldValue::Signed)
        },
    };
    let converted = value.as_f64().and_then(|raw| spec.convert.apply(raw));
    TelemetryField { name: spec.name, width: spec.width, value, converted }
}

/// Sum of all field widths in the static tables; must equal [`TOTAL_BITS`].
#[must_use]
pub fn table_bits() -> usize {
    BEACON_GROUPS.iter().flat_map(|g| g.fields).map(|f| f.width as usize).sum()
}

const fn u(name: &'static str, width: u32) -> FieldSpec {
    FieldSpec { name, width, kind: FieldKind::Unsigned, convert: Convert::None }
}

const fn uc(name: &'static str, width: u32, convert: Convert) -> FieldSpec {
    FieldSpec { name, width, kind: FieldKind::Unsigned, convert }
}

const fn s(name: &'static str, width: u32) -> FieldSpec {
    FieldSpec { name, width, kind: FieldKind::Signed, convert: Convert::None }
}

const fn sc(name: &'static str, width: u32, convert: Convert) -> FieldSpec {
    FieldSpec { name, width, kind: FieldKind::Signed, convert }
}

/// ADC step of the EPS voltage dividers, volts per LSB.
const ADC_VOLT: Convert = Convert::Linear { scale: 0.00488, offset: 0.0 };
/// MPPT channel voltage, volts per LSB (12-bit ADC, 20 V full scale).
const MPPT_VOLT: Convert = Convert::Linear { scale: 0.004_883, offset: 0.0 };
/// MPPT channel current, amperes per LSB.
const MPPT_CURR: Convert = Convert::Linear { scale: 0.000_489, offset: 0.0 };
/// Distribution rail current, amperes per LSB (10-bit ADC, 3.3 A full scale).
const RAIL_CURR: Convert = Convert::Linear { scale: 0.003_223, offset: 0.0 };
/// LM87-style thermistor: two polynomial segments around the knee at half
/// scale, degrees Celsius.
const LM87_TEMP: Convert = Convert::Piecewise(&[
    (511.0, &[-31.96, 0.1924, -0.000_032]),
    (1023.0, &[-20.05, 0.1451, -0.000_009]),
]);
/// Battery-pack thermistor (13-bit), degrees Celsius.
const BP_TEMP: Convert = Convert::Linear { scale: 0.0305, offset: -50.0 };
/// MCU die temperature (12-bit), degrees Celsius.
const MCU_TEMP: Convert = Convert::Polynomial(&[-261.8, 0.1569]);
/// Gyroscope rate, degrees per second per LSB.
const GYRO_RATE: Convert = Convert::Linear { scale: 1.0 / 14.375, offset: 0.0 };
/// Gyroscope die temperature, degrees Celsius.
const GYRO_TEMP: Convert = Convert::Linear { scale: 1.0 / 280.0, offset: 25.0 };
/// Transmitter RF power, milliwatts per LSB.
const RF_POWER: Convert = Convert::Linear { scale: 0.0027, offset: 0.0 };
/// Comm 12-bit ADC temperatures, degrees Celsius.
const COMM_TEMP: Convert = Convert::Linear { scale: -0.0546, offset: 189.5522 };
/// Receiver doppler, hertz per LSB.
const DOPPLER: Convert = Convert::Linear { scale: 13.352, offset: -22300.0 };
/// Receiver RSSI, dBm.
const RSSI: Convert = Convert::Linear { scale: 0.03, offset: -152.0 };
/// Magnetometer axis, tesla per LSB.
const MAG_FLUX: Convert = Convert::Linear { scale: 7.5e-9, offset: 0.0 };
/// Magnetorquer dipole, ampere-square-metres per LSB.
const DIPOLE: Convert = Convert::Linear { scale: 1e-4, offset: 0.0 };
/// IMTQ housekeeping voltage, volts per LSB.
const IMTQ_VOLT: Convert = Convert::Linear { scale: 0.001, offset: 0.0 };
/// IMTQ housekeeping current, amperes per LSB.
const IMTQ_CURR: Convert = Convert::Linear { scale: 0.000_1, offset: 0.0 };
/// IMTQ temperatures, degrees Celsius per LSB.
const IMTQ_TEMP: Convert = Convert::Linear { scale: 0.1, offset: 0.0 };
/// Coil current, amperes per LSB.
const COIL_CURR: Convert = Convert::Linear { scale: 0.000_1, offset: 0.0 };

/// The beacon field tables, in stream order.
pub static BEACON_GROUPS: &[GroupSpec] = &[
    GroupSpec {
        name: "startup",
        fields: &[u("boot_counter", 32), u("boot_index", 8), u("reset_reason", 32)],
    },
    GroupSpec { name: "program_state", fields: &[u("program_crc", 16)] },
    GroupSpec {
        name: "time_telemetry",
        fields: &[u("mission_time", 64), u("external_time", 32)],
    },
    GroupSpec {
        name: "error_counters",
        fields: &[
            u("comm", 8),
            u("eps", 8),
            u("rtc", 8),
            u("imtq", 8),
            u("flash_1", 8),
            u("flash_2", 8),
            u("flash_3", 8),
            u("flash_tmr", 8),
            u("fram_tmr", 8),
            u("payload", 8),
            u("camera", 8),
            u("suns", 8),
        ],
    },
    GroupSpec {
        name: "scrubbing",
        fields: &[
            u("primary_pointer", 4),
            u("secondary_pointer", 4),
            u("ram_counter", 32),
            u("primary_counter", 28),
            u("secondary_counter", 28),
        ],
    },
    GroupSpec { name: "system_uptime", fields: &[u("uptime", 22)] },
    GroupSpec { name: "file_system", fields: &[u("free_space", 32)] },
    GroupSpec {
        name: "antenna",
        fields: &[
            u("primary_antenna_1_deployed", 1),
            u("primary_antenna_2_deployed", 1),
            u("primary_antenna_3_deployed", 1),
            u("primary_antenna_4_deployed", 1),
            u("primary_antenna_1_activation_count", 8),
            u("primary_antenna_2_activation_count", 8),
            u("primary_antenna_3_activation_count", 8),
            u("primary_antenna_4_activation_count", 8),
            u("primary_antenna_1_activation_time", 12),
            u("primary_antenna_2_activation_time", 12),
            u("primary_antenna_3_activation_time", 12),
            u("primary_antenna_4_activation_time", 12),
            u("backup_antenna_1_deployed", 1),
            u("backup_antenna_2_deployed", 1),
            u("backup_antenna_3_deployed", 1),
            u("backup_antenna_4_deployed", 1),
            u("backup_antenna_1_activation_count", 8),
            u("backup_antenna_2_activation_count", 8),
            u("backup_antenna_3_activation_count", 8),
            u("backup_antenna_4_activation_count", 8),
            u("backup_antenna_1_activation_time", 12),
            u("backup_antenna_2_activation_time", 12),
            u("backup_antenna_3_activation_time", 12),
            u("backup_antenna_4_activation_time", 12),
        ],
    },
    GroupSpec {
        name: "experiments",
        fields: &[
            u("current_experiment", 4),
            u("start_result", 8),
            u("last_iteration_result", 8),
            u("iteration_counter", 4),
        ],
    },
    GroupSpec {
        name: "gyroscope",
        fields: &[
            sc("x", 16, GYRO_RATE),
            sc("y", 16, GYRO_RATE),
            sc("z", 16, GYRO_RATE),
            sc("temperature", 16, GYRO_TEMP),
        ],
    },
    GroupSpec {
        name: "comm",
        fields: &[
            u("tx_uptime", 17),
            u("tx_bitrate", 2),
            uc("tx_last_forward_power", 12, RF_POWER),
            uc("tx_last_reflected_power", 12, RF_POWER),
            uc("tx_last_amplifier_temperature", 12, COMM_TEMP),
            uc("tx_now_forward_power", 12, RF_POWER),
            uc("tx_now_amplifier_temperature", 12, COMM_TEMP),
            uc("tx_supply_current", 12, RAIL_CURR),
            u("tx_idle_state", 1),
            u("tx_beacon_state", 1),
            u("rx_uptime", 17),
            uc("rx_last_doppler", 12, DOPPLER),
            uc("rx_last_rssi", 12, RSSI),
            uc("rx_now_doppler", 12, DOPPLER),
            uc("rx_now_rssi", 12, RSSI),
            uc("rx_supply_current", 12, RAIL_CURR),
            uc("rx_supply_voltage", 12, ADC_VOLT),
            uc("rx_oscillator_temperature", 12, COMM_TEMP),
            uc("rx_amplifier_temperature", 12, COMM_TEMP),
        ],
    },
    GroupSpec { name: "gpio", fields: &[u("sail_deployed", 1)] },
    GroupSpec { name: "mcu_temperature", fields: &[uc("raw", 12, MCU_TEMP)] },
    GroupSpec {
        name: "eps_controller_a",
        fields: &[
            uc("mppt_x_sol_voltage", 12, MPPT_VOLT),
            uc("mppt_x_sol_current", 12, MPPT_CURR),
            uc("mppt_x_out_voltage", 12, MPPT_VOLT),
            uc("mppt_x_temperature", 12, COMM_TEMP),
            u("mppt_x_state", 6),
            uc("mppt_y_sol_voltage", 12, MPPT_VOLT),
            uc("mppt_y_sol_current", 12, MPPT_CURR),
            uc("mppt_y_out_voltage", 12, MPPT_VOLT),
            uc("mppt_y_temperature", 12, COMM_TEMP),
            u("mppt_y_state", 6),
            uc("mppt_z_sol_voltage", 12, MPPT_VOLT),
            uc("mppt_z_sol_current", 12, MPPT_CURR),
            uc("mppt_z_out_voltage", 12, MPPT_VOLT),
            uc("mppt_z_temperature", 12, COMM_TEMP),
            u("mppt_z_state", 6),
            uc("distr_voltage_3v3", 10, ADC_VOLT),
            uc("distr_current_3v3", 10, RAIL_CURR),
            uc("distr_voltage_5v", 10, ADC_VOLT),
            uc("distr_current_5v", 10, RAIL_CURR),
            uc("distr_voltage_vbat", 10, ADC_VOLT),
            uc("distr_current_vbat", 10, RAIL_CURR),
            u("distr_lcl_state", 7),
            u("distr_lcl_flags", 6),
            uc("batc_voltage_a", 10, ADC_VOLT),
            uc("batc_charge_current", 10, RAIL_CURR),
            uc("batc_discharge_current", 10, RAIL_CURR),
            uc("batc_temperature", 10, LM87_TEMP),
            u("batc_state", 3),
            uc("bp_temperature_a", 13, BP_TEMP),
            uc("bp_temperature_b", 13, BP_TEMP),
            u("ctrl_safety_counter", 8),
            u("ctrl_power_cycles", 16),
            u("ctrl_uptime", 32),
            uc("ctrl_temperature", 10, LM87_TEMP),
            uc("ctrl_suppl_temperature", 10, LM87_TEMP),
            uc("dcdc_temperature_3v3", 10, LM87_TEMP),
            uc("dcdc_temperature_5v", 10, LM87_TEMP),
        ],
    },
    GroupSpec {
        name: "eps_controller_b",
        fields: &[
            uc("bp_temperature_c", 10, LM87_TEMP),
            uc("batt_voltage_b", 10, ADC_VOLT),
            u("ctrl_safety_counter", 8),
            u("ctrl_power_cycles", 16),
            u("ctrl_uptime", 32),
            uc("ctrl_temperature", 10, LM87_TEMP),
            uc("ctrl_suppl_temperature", 10, LM87_TEMP),
            u("ctrl_state", 10),
        ],
    },
    GroupSpec {
        name: "imtq",
        fields: &[
            sc("magnetometer_x", 32, MAG_FLUX),
            sc("magnetometer_y", 32, MAG_FLUX),
            sc("magnetometer_z", 32, MAG_FLUX),
            u("coil_active", 1),
            sc("dipole_x", 16, DIPOLE),
            sc("dipole_y", 16, DIPOLE),
            sc("dipole_z", 16, DIPOLE),
            sc("bdot_x", 32, MAG_FLUX),
            sc("bdot_y", 32, MAG_FLUX),
            sc("bdot_z", 32, MAG_FLUX),
            uc("hk_digital_voltage", 16, IMTQ_VOLT),
            uc("hk_analog_voltage", 16, IMTQ_VOLT),
            uc("hk_digital_current", 16, IMTQ_CURR),
            uc("hk_analog_current", 16, IMTQ_CURR),
            uc("hk_mcu_temperature", 16, IMTQ_TEMP),
            sc("coil_current_x", 16, COIL_CURR),
            sc("coil_current_y", 16, COIL_CURR),
            sc("coil_current_z", 16, COIL_CURR),
            sc("coil_temperature_x", 16, IMTQ_TEMP),
            sc("coil_temperature_y", 16, IMTQ_TEMP),
            sc("coil_temperature_z", 16, IMTQ_TEMP),
            u("status", 8),
            u("mode", 2),
            u("error", 2),
            u("configuration_changed", 1),
            u("uptime", 32),
            u("selftest_init", 8),
            u("selftest_x_plus", 8),
            u("selftest_x_minus", 8),
            u("selftest_y_plus", 8),
            u("selftest_y_minus", 8),
            u("selftest_z_plus", 8),
            u("selftest_z_minus", 8),
            u("selftest_fina", 8),
        ],
    },
];
