use crate::codec::crc;
use crate::common::{SlaveId, MAX_FRAME_SIZE, MAX_PDU_DATA_SIZE, MIN_FRAME_SIZE};
use crate::error::{ModbusError, ModbusResult};
use crate::messages::{ApplicationDataUnit, ProtocolDataUnit};

pub trait ModbusRtuOverTcpSerialize
where
    Self: Sized,
{
    fn rtu_over_tcp_serialize(&self, slave_id: SlaveId) -> ModbusResult<Vec<u8>>;
    fn rtu_over_tcp_deserialize(data: &[u8]) -> ModbusResult<Self>;
}

impl ApplicationDataUnit {
    /// Frames `pdu` for `slave_id` with a freshly computed CRC.
    pub fn new(slave_id: SlaveId, pdu: ProtocolDataUnit) -> ModbusResult<Self> {
        let frame = pdu.rtu_over_tcp_serialize(slave_id)?;
        Self::from_frame(&frame)
    }

    /// Checks length and CRC, then splits the frame into its fields.
    pub fn from_frame(data: &[u8]) -> ModbusResult<Self> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(ModbusError::FrameTooShort { length: data.len() });
        }

        if data.len() > MAX_FRAME_SIZE {
            return Err(ModbusError::FrameLengthMismatch {
                expected: MAX_FRAME_SIZE,
                actual: data.len(),
            });
        }

        let (expected, received) = crc::check_frame(data)
            .ok_or(ModbusError::FrameTooShort { length: data.len() })?;
        if expected != received {
            return Err(ModbusError::CrcMismatch { expected, received });
        }

        let body = &data[..data.len() - 2];
        Ok(ApplicationDataUnit {
            slave_id: body[0],
            pdu: ProtocolDataUnit {
                function_code: body[1],
                data: body[2..].to_vec(),
            },
            crc: received,
        })
    }

    /// The frame exactly as held, `crc` included even if it no longer matches.
    pub fn to_frame(&self) -> ModbusResult<Vec<u8>> {
        let mut frame = self.pdu.rtu_over_tcp_serialize(self.slave_id)?;
        let crc_start = frame.len() - 2;
        frame[crc_start..].copy_from_slice(&self.crc.to_le_bytes());
        Ok(frame)
    }
}

impl ModbusRtuOverTcpSerialize for ProtocolDataUnit {
    fn rtu_over_tcp_serialize(&self, slave_id: SlaveId) -> ModbusResult<Vec<u8>> {
        if self.data.len() > MAX_PDU_DATA_SIZE {
            return Err(ModbusError::PayloadTooLarge {
                length: self.data.len(),
                max: MAX_PDU_DATA_SIZE,
            });
        }

        let mut result = Vec::with_capacity(self.data.len() + MIN_FRAME_SIZE);

        //Slave Id
        result.push(slave_id);

        //Function code
        result.push(self.function_code);

        //Data
        result.extend_from_slice(&self.data);

        //CRC, low byte first
        let crc = crc::compute(&result);
        result.extend_from_slice(&crc.to_le_bytes());

        Ok(result)
    }

    fn rtu_over_tcp_deserialize(data: &[u8]) -> ModbusResult<Self> {
        ApplicationDataUnit::from_frame(data).map(|adu| adu.pdu)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const READ_REQUEST: [u8; 8] = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B];

    #[test]
    fn test_frame_fields() {
        let adu = ApplicationDataUnit::from_frame(&READ_REQUEST).unwrap();
        assert_eq!(adu.slave_id, 0x01);
        assert_eq!(adu.pdu.function_code, 0x03);
        assert_eq!(adu.crc, 0x0BC4);
        assert_eq!(adu.crc.to_le_bytes(), [READ_REQUEST[6], READ_REQUEST[7]]);
        assert_eq!(adu.to_frame().unwrap(), READ_REQUEST.to_vec());
    }

    #[test]
    fn test_frame_uses_own_slave_id() {
        let pdu = ProtocolDataUnit::new(0x03u8, vec![0x00, 0x00, 0x00, 0x02]);
        let mut adu = ApplicationDataUnit::new(1, pdu.clone()).unwrap();
        assert_eq!(adu.crc, 0x0BC4);

        adu.slave_id = 0x11;
        adu.crc = crc::compute(&[0x11, 0x03, 0x00, 0x00, 0x00, 0x02]);
        let frame = adu.to_frame().unwrap();
        assert_eq!(frame[0], 0x11);
        assert_eq!(frame, pdu.rtu_over_tcp_serialize(0x11).unwrap());
    }

    #[test]
    fn test_frame_keeps_stale_crc() {
        let mut adu = ApplicationDataUnit::from_frame(&READ_REQUEST).unwrap();
        adu.crc = 0xBEEF;
        let frame = adu.to_frame().unwrap();
        assert_eq!(&frame[6..], &[0xEF, 0xBE]);
        assert!(matches!(
            ApplicationDataUnit::from_frame(&frame),
            Err(ModbusError::CrcMismatch { expected: 0x0BC4, received: 0xBEEF })
        ));
    }
}
