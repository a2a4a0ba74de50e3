pub mod crc;
pub mod length;
mod rtu_over_tcp;
pub(crate) mod utils;

pub use rtu_over_tcp::ModbusRtuOverTcpSerialize;

use crate::common::{SlaveId, EXCEPTION_RESPONSE_LENGTH, MIN_FRAME_SIZE};
use crate::error::{ModbusError, ModbusResult};
use crate::messages::{ApplicationDataUnit, ProtocolDataUnit};

/// `slave_id | function_code | data | crc_lo | crc_hi`
pub fn encode(pdu: &ProtocolDataUnit, slave_id: SlaveId) -> ModbusResult<Vec<u8>> {
    pdu.rtu_over_tcp_serialize(slave_id)
}

/// Strips address and CRC after checking length and checksum.
///
/// Exception replies decode like any other frame, telling them apart is
/// left to [`verify`] or to the caller.
pub fn decode(frame: &[u8]) -> ModbusResult<ProtocolDataUnit> {
    ProtocolDataUnit::rtu_over_tcp_deserialize(frame)
}

pub fn parse(frame: &[u8]) -> ModbusResult<ApplicationDataUnit> {
    ApplicationDataUnit::from_frame(frame)
}

/// Checks that `response` answers `request`: same slave, same function,
/// and the length the function code calls for. A well formed exception reply
/// comes back as [`ModbusError::Exception`].
pub fn verify(request: &[u8], response: &[u8]) -> ModbusResult<()> {
    if request.len() < MIN_FRAME_SIZE {
        return Err(ModbusError::FrameTooShort {
            length: request.len(),
        });
    }
    if response.len() < MIN_FRAME_SIZE {
        return Err(ModbusError::FrameTooShort {
            length: response.len(),
        });
    }

    if response[0] != request[0] {
        return Err(ModbusError::SlaveMismatch {
            expected: request[0],
            received: response[0],
        });
    }

    if length::is_exception_response(request, response) {
        if response.len() != EXCEPTION_RESPONSE_LENGTH {
            return Err(ModbusError::FrameLengthMismatch {
                expected: EXCEPTION_RESPONSE_LENGTH,
                actual: response.len(),
            });
        }
        return Err(ModbusError::Exception {
            function: request[1],
            code: response[2],
        });
    }

    if response[1] != request[1] {
        return Err(ModbusError::FunctionMismatch {
            expected: request[1],
            received: response[1],
        });
    }

    if let Some(expected) = length::expected_normal_length(request) {
        if response.len() != expected {
            return Err(ModbusError::FrameLengthMismatch {
                expected,
                actual: response.len(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::messages::{ExceptionCode, FunctionCode};

    const READ_REQUEST: [u8; 8] = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B];

    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc::compute(body).to_le_bytes());
        frame
    }

    #[test]
    fn test_encode_read_holding_registers() {
        let pdu = ProtocolDataUnit::new(
            FunctionCode::ReadMultipleHoldingRegisters,
            vec![0x00, 0x00, 0x00, 0x02],
        );
        assert_eq!(encode(&pdu, 1).unwrap(), READ_REQUEST.to_vec());
    }

    #[test]
    fn test_encode_decode_identity() {
        let pdus = vec![
            ProtocolDataUnit::new(0x01u8, vec![0x00, 0x13, 0x00, 0x25]),
            ProtocolDataUnit::new(0x10u8, vec![0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]),
            ProtocolDataUnit::new(0x07u8, vec![]),
            ProtocolDataUnit::new(0x83u8, vec![0x02]),
            ProtocolDataUnit::new(0x41u8, vec![0xAA; 252]),
        ];

        for slave_id in [0u8, 1, 17, 247, 255] {
            for pdu in &pdus {
                let frame = encode(pdu, slave_id).unwrap();
                assert_eq!(frame.len(), pdu.data.len() + 4);
                assert_eq!(&decode(&frame).unwrap(), pdu);

                let adu = parse(&frame).unwrap();
                assert_eq!(adu.slave_id, slave_id);
                assert_eq!(adu.to_frame().unwrap(), frame);
            }
        }
    }

    #[test]
    fn test_encode_payload_too_large() {
        let pdu = ProtocolDataUnit::new(0x10u8, vec![0; 253]);
        assert!(matches!(
            encode(&pdu, 1),
            Err(ModbusError::PayloadTooLarge { length: 253, max: 252 })
        ));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode(&[0x01, 0x03, 0xC4]),
            Err(ModbusError::FrameTooShort { length: 3 })
        ));

        let mut corrupted = READ_REQUEST.to_vec();
        corrupted[5] = 0x03;
        assert!(matches!(
            decode(&corrupted),
            Err(ModbusError::CrcMismatch { received: 0x0BC4, .. })
        ));

        assert!(matches!(
            decode(&vec![0; 257]),
            Err(ModbusError::FrameLengthMismatch { expected: 256, actual: 257 })
        ));
    }

    #[test]
    fn test_decode_read_response() {
        let response = with_crc(&[0x01, 0x03, 0x04, 0x00, 0x2A, 0x01, 0x00]);
        assert_eq!(response.len(), 9);

        verify(&READ_REQUEST, &response).unwrap();
        let pdu = decode(&response).unwrap();
        assert_eq!(pdu.function_code, 0x03);
        assert_eq!(pdu.data, vec![0x04, 0x00, 0x2A, 0x01, 0x00]);
    }

    #[test]
    fn test_verify_exception_response() {
        let response: [u8; 5] = [0x01, 0x83, 0x02, 0xC0, 0xF1];
        decode(&response).unwrap();

        let error = verify(&READ_REQUEST, &response).unwrap_err();
        assert!(matches!(error, ModbusError::Exception { function: 0x03, code: 0x02 }));
        assert_eq!(error.exception_code(), Some(ExceptionCode::IllegalDataAddress));
        assert!(!error.invalidates_connection());
    }

    #[test]
    fn test_verify_mismatches() {
        let other_slave = with_crc(&[0x02, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(
            verify(&READ_REQUEST, &other_slave),
            Err(ModbusError::SlaveMismatch { expected: 1, received: 2 })
        ));

        let other_function = with_crc(&[0x01, 0x04, 0x04, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(
            verify(&READ_REQUEST, &other_function),
            Err(ModbusError::FunctionMismatch { expected: 3, received: 4 })
        ));

        let too_few_registers = with_crc(&[0x01, 0x03, 0x02, 0x00, 0x00]);
        assert!(matches!(
            verify(&READ_REQUEST, &too_few_registers),
            Err(ModbusError::FrameLengthMismatch { expected: 9, actual: 7 })
        ));
    }
}
