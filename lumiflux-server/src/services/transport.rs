use std::io;

use async_trait::async_trait;
use lumiflux_api::UnitId;
use tokio::net::lookup_host;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

use crate::configs::Transport;
use crate::errors::TransportError;

/// Enable flag, 1 to switch the driver on and 0 to switch it off.
pub const ENABLE_REGISTER: u16 = 25;
/// Brightness setpoint, scaled against the calibrated max flux.
pub const SETPOINT_REGISTER: u16 = 38;
/// Raw setpoint corresponding to full brightness.
pub const MAX_FLUX_REGISTER: u16 = 132;
/// First of two power registers, high word first.
pub const POWER_REGISTER: u16 = 257;

/// Connection-oriented register client. One instance is one connection and is
/// not reentrant, so callers serialize access to it.
#[async_trait]
pub trait RegisterTransport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn read_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: UnitId,
    ) -> Result<Vec<u16>, TransportError>;

    async fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
        unit: UnitId,
    ) -> Result<(), TransportError>;

    async fn close(&mut self);
}

/// Modbus TCP client. Connects lazily and drops the connection after a link
/// failure so the next `connect` starts fresh.
pub struct ModbusTransport {
    host: String,
    port: u16,
    context: Option<Context>,
}

impl ModbusTransport {
    pub fn new(transport: &Transport) -> Self {
        Self {
            host: transport.host.clone(),
            port: transport.port,
            context: None,
        }
    }

    fn settle<T>(&mut self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        if let Err(e) = &result {
            if e.is_link_failure() {
                tracing::debug!("Dropping connection to {}:{} after: {}", self.host, self.port, e);
                self.context = None;
            }
        }
        result
    }
}

fn flatten<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(TransportError::Exception(exception.to_string())),
        Err(e) => Err(TransportError::Protocol(e.to_string())),
    }
}

#[async_trait]
impl RegisterTransport for ModbusTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.context.is_some() {
            return Ok(());
        }

        let address = lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} did not resolve to an address", self.host),
                )
            })?;

        tracing::debug!("Connect to register transport at {}", address);

        self.context = Some(tcp::connect(address).await?);

        Ok(())
    }

    async fn read_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: UnitId,
    ) -> Result<Vec<u16>, TransportError> {
        let context = self.context.as_mut().ok_or(TransportError::NotConnected)?;
        context.set_slave(Slave(unit));

        let result = flatten(context.read_holding_registers(address, count).await);
        self.settle(result)
    }

    async fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
        unit: UnitId,
    ) -> Result<(), TransportError> {
        let context = self.context.as_mut().ok_or(TransportError::NotConnected)?;
        context.set_slave(Slave(unit));

        let result = flatten(context.write_multiple_registers(address, values).await);
        self.settle(result)
    }

    async fn close(&mut self) {
        if let Some(mut context) = self.context.take() {
            if let Err(e) = context.disconnect().await {
                tracing::debug!("Error while closing register transport: {}", e);
            }
        }
    }
}
