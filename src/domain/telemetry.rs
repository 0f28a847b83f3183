// OutGauge telemetry domain model and decoder
use crate::domain::errors::MalformedPacketError;
use bytes::Buf;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Size of an OutGauge datagram including the trailing `id` field.
pub const OUTGAUGE_PACKET_LEN: usize = 96;

const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    pub speed_kmh: f64,
    pub car: String,
    pub gear: u8,
    pub rpm: f32,
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
    pub received_at: DateTime<Utc>,
}

impl TelemetrySample {
    pub fn new(speed_kmh: f64, received_at: DateTime<Utc>) -> Self {
        Self {
            speed_kmh: speed_kmh.max(0.0),
            car: String::new(),
            gear: 0,
            rpm: 0.0,
            throttle: 0.0,
            brake: 0.0,
            clutch: 0.0,
            received_at,
        }
    }
}

/// Decode one OutGauge datagram.
///
/// Layout (little endian): time u32, car [4], flags u16, gear u8, plid u8,
/// speed f32 (m/s), rpm, turbo, eng_temp, fuel, oil_pressure, oil_temp f32,
/// dash_lights u32, show_lights u32, throttle, brake, clutch f32,
/// display1 [16], display2 [16], id i32.
pub fn decode_outgauge(
    packet: &[u8],
    received_at: DateTime<Utc>,
) -> Result<TelemetrySample, MalformedPacketError> {
    if packet.len() != OUTGAUGE_PACKET_LEN {
        return Err(MalformedPacketError::WrongLength {
            expected: OUTGAUGE_PACKET_LEN,
            actual: packet.len(),
        });
    }

    let mut buf = packet;
    let _time_ms = buf.get_u32_le();
    let car = String::from_utf8_lossy(&buf[..4])
        .trim_end_matches('\0')
        .to_string();
    buf.advance(4);
    let _flags = buf.get_u16_le();
    let gear = buf.get_u8();
    let _plid = buf.get_u8();

    let speed_mps = buf.get_f32_le();
    if !speed_mps.is_finite() {
        return Err(MalformedPacketError::NonFiniteSpeed);
    }
    let rpm = buf.get_f32_le();

    // turbo, eng_temp, fuel, oil_pressure, oil_temp, dash_lights, show_lights
    buf.advance(7 * 4);
    let throttle = buf.get_f32_le();
    let brake = buf.get_f32_le();
    let clutch = buf.get_f32_le();

    Ok(TelemetrySample {
        car,
        gear,
        rpm,
        throttle,
        brake,
        clutch,
        ..TelemetrySample::new(speed_mps as f64 * MPS_TO_KMH, received_at)
    })
}

#[cfg(test)]
pub(crate) fn encode_outgauge(speed_mps: f32, car: &str, gear: u8, rpm: f32) -> Vec<u8> {
    use bytes::BufMut;

    let mut buf = Vec::with_capacity(OUTGAUGE_PACKET_LEN);
    buf.put_u32_le(123_456);
    let mut car_bytes = [0u8; 4];
    for (dst, src) in car_bytes.iter_mut().zip(car.bytes()) {
        *dst = src;
    }
    buf.put_slice(&car_bytes);
    buf.put_u16_le(0);
    buf.put_u8(gear);
    buf.put_u8(0);
    buf.put_f32_le(speed_mps);
    buf.put_f32_le(rpm);
    for _ in 0..5 {
        buf.put_f32_le(0.0);
    }
    buf.put_u32_le(0);
    buf.put_u32_le(0);
    buf.put_f32_le(0.75);
    buf.put_f32_le(0.25);
    buf.put_f32_le(0.0);
    buf.put_slice(&[0u8; 32]);
    buf.put_i32_le(0);
    buf
}
