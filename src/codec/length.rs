//! How many bytes a response to a given request occupies on the wire.
//!
//! RTU frames carry no length field, so the size of a reply has to be
//! worked out from the request's function code and, for replies that
//! carry a byte count, from the first bytes of the reply itself.

use crate::common::{EXCEPTION_FLAG, EXCEPTION_RESPONSE_LENGTH};
use crate::messages::FunctionCode;

use byteorder::{BigEndian, ByteOrder};

/// Address, function code and byte count.
pub const BYTE_COUNT_HEADER_SIZE: usize = 3;

/// Address, function code and a two byte count.
pub const WORD_COUNT_HEADER_SIZE: usize = 4;

const CRC_SIZE: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResponseShape {
    /// Length known from the request alone.
    Fixed(usize),
    /// Third byte of the reply holds the number of data bytes that follow.
    ByteCounted,
    /// Third and fourth bytes of the reply hold the big-endian number of bytes that follow.
    WordCounted,
    /// No layout known for this function code.
    Unknown,
}

pub fn response_shape(request: &[u8]) -> ResponseShape {
    let Some(&function_code) = request.get(1) else {
        return ResponseShape::Unknown;
    };

    match FunctionCode::try_from(function_code) {
        Ok(
            FunctionCode::ReadCoils
            | FunctionCode::ReadDiscreteInputs
            | FunctionCode::ReadMultipleHoldingRegisters
            | FunctionCode::ReadInputRegisters
            | FunctionCode::ReadWriteMultipleRegisters
            | FunctionCode::GetCommEventLog
            | FunctionCode::ReportServerID
            | FunctionCode::ReadFileRecord
            | FunctionCode::WriteFileRecord,
        ) => ResponseShape::ByteCounted,
        // address, value
        Ok(FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleHoldingRegister) => {
            ResponseShape::Fixed(8)
        }
        // start address, quantity
        Ok(FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleHoldingRegisters) => {
            ResponseShape::Fixed(8)
        }
        // status, event count
        Ok(FunctionCode::GetCommEventCounter) => ResponseShape::Fixed(8),
        // address, and mask, or mask
        Ok(FunctionCode::MaskWriteRegister) => ResponseShape::Fixed(10),
        Ok(FunctionCode::ReadExceptionStatus) => ResponseShape::Fixed(5),
        // diagnostics echo the request
        Ok(FunctionCode::Diagnostic) => ResponseShape::Fixed(request.len()),
        // byte count, FIFO count, values
        Ok(FunctionCode::ReadFIFOQueue) => ResponseShape::WordCounted,
        Ok(FunctionCode::ReadDeviceIdentification) | Err(_) => ResponseShape::Unknown,
    }
}

/// Length of a normal (non-exception) reply, predicted from the request alone.
///
/// `None` when the reply's size can only be learnt from the reply's own byte
/// count, or when the function code has no known layout.
pub fn expected_normal_length(request: &[u8]) -> Option<usize> {
    match response_shape(request) {
        ResponseShape::Fixed(length) => Some(length),
        ResponseShape::Unknown | ResponseShape::WordCounted => None,
        ResponseShape::ByteCounted => {
            let quantity = request.get(4..6).map(BigEndian::read_u16)? as usize;
            let data_size = match FunctionCode::try_from(request[1]).ok()? {
                FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                    quantity.div_ceil(8)
                }
                FunctionCode::ReadMultipleHoldingRegisters
                | FunctionCode::ReadInputRegisters
                | FunctionCode::ReadWriteMultipleRegisters => quantity * 2,
                _ => return None,
            };
            Some(BYTE_COUNT_HEADER_SIZE + data_size + CRC_SIZE)
        }
    }
}

pub fn expected_exception_length() -> usize {
    EXCEPTION_RESPONSE_LENGTH
}

/// True when the reply's function byte is the request's function code with the high bit set.
pub fn is_exception_response(request: &[u8], response: &[u8]) -> bool {
    match (request.get(1), response.get(1)) {
        (Some(request_function), Some(response_function)) => {
            *response_function == request_function | EXCEPTION_FLAG
        }
        _ => false,
    }
}

/// Total length of the reply whose first bytes are `header`.
///
/// `header` must hold at least [`WORD_COUNT_HEADER_SIZE`] bytes. `None` means
/// the length can't be determined and the caller has to settle for what it has.
pub fn response_length(request: &[u8], header: &[u8]) -> Option<usize> {
    if header.len() < BYTE_COUNT_HEADER_SIZE {
        return None;
    }

    if is_exception_response(request, header) {
        return Some(expected_exception_length());
    }

    match response_shape(request) {
        ResponseShape::Fixed(length) => Some(length),
        ResponseShape::ByteCounted => {
            Some(BYTE_COUNT_HEADER_SIZE + header[2] as usize + CRC_SIZE)
        }
        ResponseShape::WordCounted => {
            let count = header.get(2..4).map(BigEndian::read_u16)? as usize;
            Some(WORD_COUNT_HEADER_SIZE + count + CRC_SIZE)
        }
        ResponseShape::Unknown => None,
    }
}
