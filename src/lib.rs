pub mod codec;
mod common;
pub mod communication;
mod config;
mod error;
mod master;
pub mod messages;

pub use codec::{decode, encode, verify, ModbusRtuOverTcpSerialize};
pub use communication::{ModbusConnector, ModbusSocket, RtuOverTcpTransport, TcpConnector};
pub use master::RtuOverTcpMaster;

pub use common::{
    ModbusDataType, ModbusTable, SlaveId, DEFAULT_TIMEOUT, EXCEPTION_RESPONSE_LENGTH,
    MAX_FRAME_SIZE, MAX_PDU_DATA_SIZE, MIN_FRAME_SIZE,
};
pub use config::RtuOverTcpConfig;
pub use error::{ModbusError, ModbusResult};
pub use messages::{ApplicationDataUnit, ExceptionCode, FunctionCode, ProtocolDataUnit};
