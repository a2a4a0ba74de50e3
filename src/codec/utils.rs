use crate::common::{ModbusDataType, ModbusTable};
use crate::error::{ModbusError, ModbusResult};

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;
use std::mem::discriminant;

/// Byte count followed by the packed values, as multiple writes carry them.
/// Coils are packed least significant bit first.
pub fn serialize_values(values: &[ModbusDataType]) -> ModbusResult<Vec<u8>> {
    if !check_same_data_type_variant(values) {
        return Err(ModbusError::InvalidRequest(
            "all values in a query must have the same type".to_string(),
        ));
    }

    let first_value = values.first().ok_or_else(|| {
        ModbusError::InvalidRequest("at least one value must be sent".to_string())
    })?;

    let mut result = Vec::new();

    match first_value {
        ModbusDataType::Coil(_) => {
            result.push(values.len().div_ceil(8) as u8);

            for chunk in values.chunks(8) {
                let mut aux_byte = 0u8;
                for (bit, value) in chunk.iter().enumerate() {
                    if let ModbusDataType::Coil(true) = value {
                        aux_byte |= 1 << bit;
                    }
                }
                result.push(aux_byte);
            }
        }
        ModbusDataType::Register(_) => {
            result.push((values.len() * 2) as u8);

            for value in values {
                if let ModbusDataType::Register(value) = value {
                    result.extend_from_slice(&value.to_be_bytes());
                }
            }
        }
    }
    Ok(result)
}

/// Reads a byte count and `amount` values of the table's type from `data`.
///
/// Modbus doesn't say how many coils a read reply holds, only how many bytes,
/// so the requested amount is needed to drop the padding bits.
pub fn deserialize_values(
    table: ModbusTable,
    amount: u16,
    data: &mut Cursor<&[u8]>,
) -> ModbusResult<Vec<ModbusDataType>> {
    let byte_count = data.read_u8().map_err(truncated)? as usize;

    let expected_byte_count = match table {
        ModbusTable::Coils | ModbusTable::DiscreteInput => (amount as usize).div_ceil(8),
        ModbusTable::InputRegisters | ModbusTable::HoldingRegisters => amount as usize * 2,
    };

    if expected_byte_count != byte_count {
        return Err(ModbusError::InvalidResponse(format!(
            "expected {} bytes for values, got {}",
            expected_byte_count, byte_count
        )));
    }

    let mut values = Vec::with_capacity(amount as usize);
    match table {
        ModbusTable::Coils | ModbusTable::DiscreteInput => {
            let mut aux_byte = 0u8;
            for index in 0..amount {
                if index % 8 == 0 {
                    aux_byte = data.read_u8().map_err(truncated)?;
                }
                values.push(ModbusDataType::Coil(aux_byte & 0b1 != 0));
                aux_byte >>= 1;
            }
        }
        ModbusTable::HoldingRegisters | ModbusTable::InputRegisters => {
            for _ in 0..amount {
                let raw_value = data.read_u16::<BigEndian>().map_err(truncated)?;
                values.push(ModbusDataType::Register(raw_value));
            }
        }
    }

    Ok(values)
}

fn truncated(err: std::io::Error) -> ModbusError {
    ModbusError::InvalidResponse(format!("response data truncated: {}", err))
}

fn check_same_data_type_variant(values: &[ModbusDataType]) -> bool {
    if let Some((first, others)) = values.split_first() {
        let ref_discriminant = discriminant(first);
        others.iter().all(|e| discriminant(e) == ref_discriminant)
    } else {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn coils(bits: &[bool]) -> Vec<ModbusDataType> {
        bits.iter().map(|bit| ModbusDataType::Coil(*bit)).collect()
    }

    #[test]
    fn test_serialize_coils() {
        // coils 20..=29 of the classic write multiple coils example
        let values = coils(&[true, false, true, true, false, false, true, true, true, false]);
        assert_eq!(serialize_values(&values).unwrap(), vec![0x02, 0xCD, 0x01]);
    }

    #[test]
    fn test_serialize_registers() {
        let values = vec![ModbusDataType::Register(0x000A), ModbusDataType::Register(0x0102)];
        assert_eq!(
            serialize_values(&values).unwrap(),
            vec![0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn test_serialize_rejects_mixed_or_empty() {
        assert!(serialize_values(&[]).is_err());
        assert!(serialize_values(&[ModbusDataType::Coil(true), ModbusDataType::Register(1)]).is_err());
    }

    #[test]
    fn test_deserialize_coils_drops_padding() {
        let data: &[u8] = &[0x03, 0xCD, 0x6B, 0x05];
        let values = deserialize_values(ModbusTable::Coils, 19, &mut Cursor::new(data)).unwrap();

        let expected = coils(&[
            true, false, true, true, false, false, true, true, // 0xCD
            true, true, false, true, false, true, true, false, // 0x6B
            true, false, true, // 0x05
        ]);
        assert_eq!(values, expected);
    }

    #[test]
    fn test_deserialize_registers() {
        let data: &[u8] = &[0x04, 0x02, 0x2B, 0x00, 0x00];
        let values =
            deserialize_values(ModbusTable::HoldingRegisters, 2, &mut Cursor::new(data)).unwrap();
        assert_eq!(
            values,
            vec![ModbusDataType::Register(0x022B), ModbusDataType::Register(0x0000)]
        );
    }

    #[test]
    fn test_deserialize_byte_count_mismatch() {
        let data: &[u8] = &[0x02, 0x00, 0x01];
        assert!(deserialize_values(ModbusTable::InputRegisters, 2, &mut Cursor::new(data)).is_err());

        let data: &[u8] = &[0x04, 0x00, 0x01];
        assert!(deserialize_values(ModbusTable::InputRegisters, 2, &mut Cursor::new(data)).is_err());
    }
}
