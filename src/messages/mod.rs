use crate::common::{SlaveId, EXCEPTION_FLAG};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoils = 1,
    ReadDiscreteInputs = 2,
    ReadMultipleHoldingRegisters = 3,
    ReadInputRegisters = 4,
    WriteSingleCoil = 5,
    WriteSingleHoldingRegister = 6,
    ReadExceptionStatus = 7,
    Diagnostic = 8,
    GetCommEventCounter = 11,
    GetCommEventLog = 12,
    WriteMultipleCoils = 15,
    WriteMultipleHoldingRegisters = 16,
    ReportServerID = 17,
    ReadFileRecord = 20,
    WriteFileRecord = 21,
    MaskWriteRegister = 22,
    ReadWriteMultipleRegisters = 23,
    ReadFIFOQueue = 24,
    ReadDeviceIdentification = 43,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 1,
    IllegalDataAddress = 2,
    IllegalDataValue = 3,
    ServerDeviceFailure = 4,
    Acknowledge = 5,
    ServerDeviceBusy = 6,
    MemoryParityError = 8,
    GatewayPathUnavailable = 0xA,
    GatewayTargetDeviceFailedToRespond = 0xB,
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::ServerDeviceFailure => "server device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::ServerDeviceBusy => "server device busy",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                "gateway target device failed to respond"
            }
        };
        f.write_str(description)
    }
}

/// Function code plus data, the part of a message that doesn't depend on the transport.
///
/// The function code is kept as a raw byte so exception replies (`code | 0x80`)
/// and codes this crate doesn't know about still round-trip.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProtocolDataUnit {
    pub function_code: u8,
    pub data: Vec<u8>,
}

impl ProtocolDataUnit {
    pub fn new(function_code: impl Into<u8>, data: Vec<u8>) -> Self {
        ProtocolDataUnit {
            function_code: function_code.into(),
            data,
        }
    }

    pub fn function(&self) -> Option<FunctionCode> {
        FunctionCode::try_from(self.function_code & !EXCEPTION_FLAG).ok()
    }

    pub fn is_exception(&self) -> bool {
        self.function_code & EXCEPTION_FLAG != 0
    }

    /// Exception code carried by an exception reply, `None` for normal replies.
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.data.first().copied()
        } else {
            None
        }
    }
}

/// A full RTU frame: `slave_id | function_code | data | crc_lo | crc_hi`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ApplicationDataUnit {
    pub slave_id: SlaveId,
    pub pdu: ProtocolDataUnit,
    pub crc: u16,
}
