use crate::error::{ModbusError, ModbusResult};
use crate::messages::FunctionCode;

use std::time::Duration;

pub type SlaveId = u8;

/// Address + function code + 2 CRC bytes, empty data.
pub const MIN_FRAME_SIZE: usize = 4;

/// Classic RTU profile.
pub const MAX_FRAME_SIZE: usize = 256;

/// Address + function + exception code + 2 CRC bytes.
pub const EXCEPTION_RESPONSE_LENGTH: usize = 5;

/// What is left of a frame once address, function code and CRC are taken out.
pub const MAX_PDU_DATA_SIZE: usize = MAX_FRAME_SIZE - MIN_FRAME_SIZE;

pub const EXCEPTION_FLAG: u8 = 0x80;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub const MAX_READ_COILS: u16 = 2000;
pub const MAX_READ_REGISTERS: u16 = 125;
pub const MAX_WRITE_COILS: u16 = 1968;
pub const MAX_WRITE_REGISTERS: u16 = 123;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ModbusDataType {
    Coil(bool),
    Register(u16),
}

impl ModbusDataType {
    /// Value as it travels in a single write request.
    pub fn get_representation(&self) -> u16 {
        match self {
            ModbusDataType::Coil(value) => {
                if *value {
                    0xFF00
                } else {
                    0x0000
                }
            }
            ModbusDataType::Register(value) => *value,
        }
    }

    pub fn coil_from_representation(raw_value: u16) -> ModbusResult<Self> {
        match raw_value {
            0xFF00 => Ok(ModbusDataType::Coil(true)),
            0x0000 => Ok(ModbusDataType::Coil(false)),
            _ => Err(ModbusError::InvalidResponse(format!(
                "{:#06X} can't be decoded to a coil, only valid values are 0xFF00 and 0x0000",
                raw_value
            ))),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash)]
pub enum ModbusTable {
    DiscreteInput,
    Coils,
    InputRegisters,
    HoldingRegisters,
}

impl ModbusTable {
    pub fn get_table_from_function_code(function_code: FunctionCode) -> Option<ModbusTable> {
        match function_code {
            FunctionCode::WriteSingleCoil
            | FunctionCode::ReadCoils
            | FunctionCode::WriteMultipleCoils => Some(ModbusTable::Coils),
            FunctionCode::WriteSingleHoldingRegister
            | FunctionCode::ReadMultipleHoldingRegisters
            | FunctionCode::WriteMultipleHoldingRegisters
            | FunctionCode::ReadWriteMultipleRegisters => Some(ModbusTable::HoldingRegisters),
            FunctionCode::ReadInputRegisters => Some(ModbusTable::InputRegisters),
            FunctionCode::ReadDiscreteInputs => Some(ModbusTable::DiscreteInput),
            _ => None,
        }
    }
}

/// Space separated upper-case hex, used for frame logging.
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
