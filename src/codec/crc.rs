//! Modbus CRC16 (poly 0xA001 reflected, init 0xFFFF), sent low byte first.

const POLYNOMIAL: u16 = 0xA001;

pub fn compute(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= *byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

pub fn verify(data: &[u8], expected_crc: u16) -> bool {
    compute(data) == expected_crc
}

/// Splits `frame` into body and trailing little-endian CRC and checks them.
/// Returns `(computed, received)`; frames under 2 bytes yield `None`.
pub fn check_frame(frame: &[u8]) -> Option<(u16, u16)> {
    if frame.len() < 2 {
        return None;
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    let received = u16::from_le_bytes([tail[0], tail[1]]);
    Some((compute(body), received))
}
