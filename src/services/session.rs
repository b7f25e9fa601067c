use log::warn;

use crate::modbus::{
    Command, CommandTracker, EchoClassifier, EchoPolicy, ModbusTransport, Response, TransportFault,
};

/// Reply to an issued command, already run through the echo classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub response: Response,
    pub echo: bool,
}

/// A master's view of one bus: the transport plus the latest-command slot.
///
/// Every request goes through [`MasterSession::issue`], which takes `&mut self`,
/// so at most one command is ever outstanding.
pub struct MasterSession<T: ModbusTransport> {
    transport: T,
    tracker: CommandTracker,
    classifier: EchoClassifier,
}

impl<T: ModbusTransport> MasterSession<T> {
    pub fn new(transport: T, policy: EchoPolicy) -> Self {
        Self {
            transport,
            tracker: CommandTracker::new(),
            classifier: EchoClassifier::new(policy),
        }
    }

    pub async fn issue(&mut self, command: Command) -> Outcome {
        self.tracker.record(command);

        let response = match self.transport.exchange(&command).await {
            Ok(response) => response,
            Err(e) => {
                warn!("⚠️  {} failed: {}", command, e);
                Response::TransportFault(TransportFault::Io(e.to_string()))
            }
        };

        let echo = self.classifier.is_echo(&response, self.tracker.last());
        Outcome { response, echo }
    }

    pub fn last_command(&self) -> Option<&Command> {
        self.tracker.last()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn close(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::testing::ScriptedTransport;
    use crate::modbus::{Payload, UnitAddress};

    #[tokio::test]
    async fn test_issue_records_command_and_classifies() {
        let transport =
            ScriptedTransport::silent().reply(5, Response::Ok(Payload::Registers(vec![1])));
        let mut session = MasterSession::new(transport, EchoPolicy::default());
        assert!(session.last_command().is_none());

        let probe = Command::read_holding_registers(UnitAddress::new(5).unwrap(), 0, 1);
        let outcome = session.issue(probe).await;

        assert_eq!(session.last_command(), Some(&probe));
        assert!(outcome.echo);
        assert!(outcome.response.is_ok());
    }

    #[tokio::test]
    async fn test_transport_error_becomes_fault() {
        let transport = ScriptedTransport::silent().fail(2, "device unplugged");
        let mut session = MasterSession::new(transport, EchoPolicy::default());

        let outcome = session
            .issue(Command::read_holding_registers(UnitAddress::new(2).unwrap(), 0, 1))
            .await;

        assert!(!outcome.echo);
        assert!(matches!(
            outcome.response,
            Response::TransportFault(TransportFault::Io(ref reason))
                if reason.contains("device unplugged")
        ));
    }

    #[tokio::test]
    async fn test_close_reaches_transport_once() {
        let mut session = MasterSession::new(ScriptedTransport::silent(), EchoPolicy::default());
        session
            .issue(Command::read_holding_registers(UnitAddress::new(1).unwrap(), 0, 1))
            .await;
        assert_eq!(session.transport().close_calls, 0);

        session.close();
        assert_eq!(session.into_transport().close_calls, 1);
    }
}
