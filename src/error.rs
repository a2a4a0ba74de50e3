use crate::messages::ExceptionCode;

use std::io;
use std::time::Duration;
use thiserror::Error;

pub type ModbusResult<T> = Result<T, ModbusError>;

#[derive(Debug, Error)]
pub enum ModbusError {
    #[error("couldn't connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write request: {0}")]
    Write(#[source] io::Error),

    #[error("failed to read response: {0}")]
    Read(#[source] io::Error),

    #[error("no complete response within {0:?}")]
    Timeout(Duration),

    #[error("frame too short: {length} bytes, at least 4 required")]
    FrameTooShort { length: usize },

    #[error("frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLengthMismatch { expected: usize, actual: usize },

    #[error("crc mismatch: computed {expected:#06X}, frame carries {received:#06X}")]
    CrcMismatch { expected: u16, received: u16 },

    #[error("pdu data of {length} bytes exceeds the maximum of {max}")]
    PayloadTooLarge { length: usize, max: usize },

    #[error("slave answered function {function:#04X} with exception {code:#04X}")]
    Exception { function: u8, code: u8 },

    #[error("response from slave {received}, request was addressed to slave {expected}")]
    SlaveMismatch { expected: u8, received: u8 },

    #[error("response function {received:#04X} doesn't match request function {expected:#04X}")]
    FunctionMismatch { expected: u8, received: u8 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ModbusError {
    /// Whether the exchange broke at the transport level. The stored
    /// connection can't be trusted afterwards and the next call re-dials.
    pub fn invalidates_connection(&self) -> bool {
        matches!(
            self,
            ModbusError::Connection { .. }
                | ModbusError::Write(_)
                | ModbusError::Read(_)
                | ModbusError::Timeout(_)
        )
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, ModbusError::Exception { .. })
    }

    /// The exception code the slave sent, if it is one the protocol defines.
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            ModbusError::Exception { code, .. } => ExceptionCode::try_from(*code).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_connection_invalidation() {
        let timeout = ModbusError::Timeout(Duration::from_secs(1));
        let read = ModbusError::Read(io::Error::from(io::ErrorKind::UnexpectedEof));
        let crc = ModbusError::CrcMismatch {
            expected: 0x0BC4,
            received: 0,
        };
        let exception = ModbusError::Exception {
            function: 0x03,
            code: 0x02,
        };

        assert!(timeout.invalidates_connection());
        assert!(read.invalidates_connection());
        assert!(!crc.invalidates_connection());
        assert!(!exception.invalidates_connection());
        assert!(!ModbusError::FrameTooShort { length: 2 }.invalidates_connection());
    }

    #[test]
    fn test_exception_code() {
        let error = ModbusError::Exception {
            function: 0x03,
            code: 0x02,
        };
        assert!(error.is_exception());
        assert_eq!(error.exception_code(), Some(ExceptionCode::IllegalDataAddress));

        let unknown = ModbusError::Exception {
            function: 0x03,
            code: 0x7F,
        };
        assert_eq!(unknown.exception_code(), None);
    }
}
