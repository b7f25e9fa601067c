//! Test double for `ModbusTransport`.

use async_trait::async_trait;
use std::collections::HashMap;

use super::client::ModbusTransport;
use super::protocol::{Command, FunctionKind, Response, TransportFault};
use crate::utils::error::ModbusError;

#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(Response),
    Fail(String),
}

/// Replies from a fixed script keyed by unit address and records what was sent.
#[derive(Debug)]
pub struct ScriptedTransport {
    by_function: HashMap<(u8, FunctionKind), Scripted>,
    by_unit: HashMap<u8, Scripted>,
    default: Scripted,
    pub sent: Vec<Command>,
    pub close_calls: usize,
}

impl ScriptedTransport {
    /// Every unit without a scripted reply times out.
    pub fn silent() -> Self {
        Self::with_default(Response::TransportFault(TransportFault::Timeout))
    }

    pub fn with_default(response: Response) -> Self {
        Self {
            by_function: HashMap::new(),
            by_unit: HashMap::new(),
            default: Scripted::Respond(response),
            sent: Vec::new(),
            close_calls: 0,
        }
    }

    pub fn reply(mut self, unit: u8, response: Response) -> Self {
        self.by_unit.insert(unit, Scripted::Respond(response));
        self
    }

    /// Reply used only for write commands to `unit`.
    pub fn reply_to_write(mut self, unit: u8, response: Response) -> Self {
        self.by_function.insert(
            (unit, FunctionKind::WriteSingleRegister),
            Scripted::Respond(response),
        );
        self
    }

    pub fn fail(mut self, unit: u8, reason: &str) -> Self {
        self.by_unit.insert(unit, Scripted::Fail(reason.to_string()));
        self
    }

    pub fn sent_units(&self) -> Vec<u8> {
        self.sent.iter().map(|c| c.unit.get()).collect()
    }
}

#[async_trait]
impl ModbusTransport for ScriptedTransport {
    async fn exchange(&mut self, command: &Command) -> Result<Response, ModbusError> {
        self.sent.push(*command);
        let unit = command.unit.get();
        let scripted = self
            .by_function
            .get(&(unit, command.function()))
            .or_else(|| self.by_unit.get(&unit))
            .unwrap_or(&self.default);
        match scripted {
            Scripted::Respond(response) => Ok(response.clone()),
            Scripted::Fail(reason) => Err(ModbusError::CommunicationError(reason.clone())),
        }
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }
}
