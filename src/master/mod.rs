use crate::codec::{self, utils};
use crate::common::{
    ModbusDataType, ModbusTable, SlaveId, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS,
    MAX_WRITE_REGISTERS,
};
use crate::communication::RtuOverTcpTransport;
use crate::config::RtuOverTcpConfig;
use crate::error::{ModbusError, ModbusResult};
use crate::messages::{FunctionCode, ProtocolDataUnit};

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::debug;

/// Typed Modbus requests on top of the RTU over TCP codec and transport.
pub struct RtuOverTcpMaster {
    transport: RtuOverTcpTransport,
    slave_id: SlaveId,
}

impl RtuOverTcpMaster {
    pub fn new(address: impl Into<String>, slave_id: SlaveId) -> Self {
        Self::with_transport(RtuOverTcpTransport::new(address), slave_id)
    }

    pub fn with_transport(transport: RtuOverTcpTransport, slave_id: SlaveId) -> Self {
        RtuOverTcpMaster {
            transport,
            slave_id,
        }
    }

    pub fn from_config(config: &RtuOverTcpConfig) -> ModbusResult<Self> {
        let transport = RtuOverTcpTransport::from_config(config)?;
        Ok(Self::with_transport(transport, config.slave_id))
    }

    pub fn slave_id(&self) -> SlaveId {
        self.slave_id
    }

    pub fn set_slave_id(&mut self, slave_id: SlaveId) {
        self.slave_id = slave_id;
    }

    pub fn transport(&self) -> &RtuOverTcpTransport {
        &self.transport
    }

    pub async fn connect(&self) -> ModbusResult<()> {
        self.transport.connect().await
    }

    pub async fn close(&self) -> ModbusResult<()> {
        self.transport.close().await
    }

    /// One raw exchange: the reply must come from the addressed slave, carry a
    /// valid CRC and answer the same function, exceptions become errors.
    pub async fn execute(&self, pdu: &ProtocolDataUnit) -> ModbusResult<ProtocolDataUnit> {
        let request = codec::encode(pdu, self.slave_id)?;
        let response = self.transport.send(&request).await?;

        let reply = codec::decode(&response)?;
        codec::verify(&request, &response)?;

        Ok(reply)
    }

    pub async fn read_coils(&self, address: u16, amount: u16) -> ModbusResult<Vec<bool>> {
        let values = self.read_values(FunctionCode::ReadCoils, address, amount).await?;
        Ok(coils(values))
    }

    pub async fn read_discrete_inputs(&self, address: u16, amount: u16) -> ModbusResult<Vec<bool>> {
        let values = self
            .read_values(FunctionCode::ReadDiscreteInputs, address, amount)
            .await?;
        Ok(coils(values))
    }

    pub async fn read_holding_registers(
        &self,
        address: u16,
        amount: u16,
    ) -> ModbusResult<Vec<u16>> {
        let values = self
            .read_values(FunctionCode::ReadMultipleHoldingRegisters, address, amount)
            .await?;
        Ok(registers(values))
    }

    pub async fn read_input_registers(&self, address: u16, amount: u16) -> ModbusResult<Vec<u16>> {
        let values = self
            .read_values(FunctionCode::ReadInputRegisters, address, amount)
            .await?;
        Ok(registers(values))
    }

    pub async fn write_single_coil(&self, address: u16, value: bool) -> ModbusResult<()> {
        self.write_single_value(FunctionCode::WriteSingleCoil, address, ModbusDataType::Coil(value))
            .await
    }

    pub async fn write_single_register(&self, address: u16, value: u16) -> ModbusResult<()> {
        self.write_single_value(
            FunctionCode::WriteSingleHoldingRegister,
            address,
            ModbusDataType::Register(value),
        )
        .await
    }

    pub async fn write_multiple_coils(&self, address: u16, values: &[bool]) -> ModbusResult<()> {
        let values: Vec<ModbusDataType> = values.iter().map(|v| ModbusDataType::Coil(*v)).collect();
        self.write_multiple_values(FunctionCode::WriteMultipleCoils, address, &values)
            .await
    }

    pub async fn write_multiple_registers(&self, address: u16, values: &[u16]) -> ModbusResult<()> {
        let values: Vec<ModbusDataType> =
            values.iter().map(|v| ModbusDataType::Register(*v)).collect();
        self.write_multiple_values(FunctionCode::WriteMultipleHoldingRegisters, address, &values)
            .await
    }

    async fn read_values(
        &self,
        function_code: FunctionCode,
        address: u16,
        amount: u16,
    ) -> ModbusResult<Vec<ModbusDataType>> {
        let table = table_for(function_code)?;
        let max = match table {
            ModbusTable::Coils | ModbusTable::DiscreteInput => MAX_READ_COILS,
            ModbusTable::HoldingRegisters | ModbusTable::InputRegisters => MAX_READ_REGISTERS,
        };
        check_amount(amount, max)?;

        let mut data = Vec::with_capacity(4);
        data.extend_from_slice(&address.to_be_bytes());
        data.extend_from_slice(&amount.to_be_bytes());

        debug!(slave_id = self.slave_id, ?function_code, address, amount, "read");
        let reply = self.execute(&ProtocolDataUnit::new(function_code, data)).await?;

        let mut cursor = Cursor::new(reply.data.as_slice());
        utils::deserialize_values(table, amount, &mut cursor)
    }

    async fn write_single_value(
        &self,
        function_code: FunctionCode,
        address: u16,
        value: ModbusDataType,
    ) -> ModbusResult<()> {
        let mut data = Vec::with_capacity(4);
        data.extend_from_slice(&address.to_be_bytes());
        data.extend_from_slice(&value.get_representation().to_be_bytes());

        debug!(slave_id = self.slave_id, ?function_code, address, ?value, "write");
        let reply = self.execute(&ProtocolDataUnit::new(function_code, data)).await?;

        // the slave echoes the request
        let mut cursor = Cursor::new(reply.data.as_slice());
        let echoed_address = cursor.read_u16::<BigEndian>().map_err(short_reply)?;
        let raw_value = cursor.read_u16::<BigEndian>().map_err(short_reply)?;
        let echoed_value = match value {
            ModbusDataType::Coil(_) => ModbusDataType::coil_from_representation(raw_value)?,
            ModbusDataType::Register(_) => ModbusDataType::Register(raw_value),
        };

        if echoed_address != address || echoed_value != value {
            return Err(ModbusError::InvalidResponse(format!(
                "slave confirmed {:?} at {}, {:?} was written at {}",
                echoed_value, echoed_address, value, address
            )));
        }
        Ok(())
    }

    async fn write_multiple_values(
        &self,
        function_code: FunctionCode,
        address: u16,
        values: &[ModbusDataType],
    ) -> ModbusResult<()> {
        let table = table_for(function_code)?;
        let max = match table {
            ModbusTable::Coils | ModbusTable::DiscreteInput => MAX_WRITE_COILS,
            ModbusTable::HoldingRegisters | ModbusTable::InputRegisters => MAX_WRITE_REGISTERS,
        };
        let amount = u16::try_from(values.len()).unwrap_or(u16::MAX);
        check_amount(amount, max)?;

        let mut data = Vec::new();
        data.extend_from_slice(&address.to_be_bytes());
        data.extend_from_slice(&amount.to_be_bytes());
        data.extend_from_slice(&utils::serialize_values(values)?);

        debug!(slave_id = self.slave_id, ?function_code, address, amount, "write");
        let reply = self.execute(&ProtocolDataUnit::new(function_code, data)).await?;

        let mut cursor = Cursor::new(reply.data.as_slice());
        let echoed_address = cursor.read_u16::<BigEndian>().map_err(short_reply)?;
        let echoed_amount = cursor.read_u16::<BigEndian>().map_err(short_reply)?;

        if echoed_address != address || echoed_amount != amount {
            return Err(ModbusError::InvalidResponse(format!(
                "slave confirmed {} values at {}, {} were written at {}",
                echoed_amount, echoed_address, amount, address
            )));
        }
        Ok(())
    }
}

fn table_for(function_code: FunctionCode) -> ModbusResult<ModbusTable> {
    ModbusTable::get_table_from_function_code(function_code).ok_or_else(|| {
        ModbusError::InvalidRequest(format!("{:?} doesn't address any table", function_code))
    })
}

fn check_amount(amount: u16, max: u16) -> ModbusResult<()> {
    if amount == 0 || amount > max {
        return Err(ModbusError::InvalidRequest(format!(
            "amount must be between 1 and {}, got {}",
            max, amount
        )));
    }
    Ok(())
}

fn short_reply(err: std::io::Error) -> ModbusError {
    ModbusError::InvalidResponse(format!("reply too short: {}", err))
}

fn coils(values: Vec<ModbusDataType>) -> Vec<bool> {
    values
        .into_iter()
        .filter_map(|value| match value {
            ModbusDataType::Coil(value) => Some(value),
            ModbusDataType::Register(_) => None,
        })
        .collect()
}

fn registers(values: Vec<ModbusDataType>) -> Vec<u16> {
    values
        .into_iter()
        .filter_map(|value| match value {
            ModbusDataType::Register(value) => Some(value),
            ModbusDataType::Coil(_) => None,
        })
        .collect()
}
