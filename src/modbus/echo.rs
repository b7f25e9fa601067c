//! Local-echo suppression for half-duplex RS485 adapters.
//!
//! Some adapters hand the master its own transmitted frame back. The check
//! here compares the decoded payload with the argument the last command would
//! have echoed. For writes that is the written value. A read carries no
//! written value, so its second argument (the register count) stands in for
//! it. That read comparison is a heuristic: a real device whose registers all
//! hold the requested count is classified as an echo. `EchoPolicy` lets either
//! check be switched off.
//!
//! The check only sees replies the codec accepted. A raw local echo of a 0x03
//! probe is the request itself; its third byte reads as a byte count of zero,
//! so the frame is cut at five bytes and fails the CRC check. That unit is
//! counted absent, not inconclusive.

use serde::{Deserialize, Serialize};

use super::protocol::{Command, Payload, Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoPolicy {
    pub check_reads: bool,
    pub check_writes: bool,
}

impl Default for EchoPolicy {
    fn default() -> Self {
        Self {
            check_reads: true,
            // a genuine 0x06 reply is byte-identical to the request
            check_writes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoClassifier {
    policy: EchoPolicy,
}

impl EchoClassifier {
    pub fn new(policy: EchoPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EchoPolicy {
        self.policy
    }

    pub fn is_echo(&self, response: &Response, last_command: Option<&Command>) -> bool {
        let Some(command) = last_command else {
            return false;
        };
        let Response::Ok(payload) = response else {
            return false;
        };

        match (command.request, payload) {
            (Request::ReadHoldingRegisters { count, .. }, Payload::Registers(registers)) => {
                self.policy.check_reads
                    && !registers.is_empty()
                    && registers.iter().all(|&r| r == count)
            }
            (
                Request::WriteSingleRegister { value, .. },
                Payload::Written {
                    value: confirmed, ..
                },
            ) => {
                self.policy.check_writes && *confirmed == value
            }
            _ => false,
        }
    }
}
