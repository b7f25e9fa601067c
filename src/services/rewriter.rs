use log::{info, warn};

use super::session::MasterSession;
use crate::modbus::{Command, ModbusTransport, UnitAddress};
use crate::utils::error::ChangeFailure;

/// Vendor holding register that stores the slave address.
pub const DEFAULT_ADDRESS_REGISTER: u16 = 0x0110;

pub struct AddressRewriter<'a, T: ModbusTransport> {
    session: &'a mut MasterSession<T>,
    address_register: u16,
}

impl<'a, T: ModbusTransport> AddressRewriter<'a, T> {
    pub fn new(session: &'a mut MasterSession<T>, address_register: u16) -> Self {
        Self {
            session,
            address_register,
        }
    }

    /// Writes `new` into the address register of `current`. Success means the
    /// device acknowledged the write; the new address is not read back.
    pub async fn change_address(
        &mut self,
        current: UnitAddress,
        new: UnitAddress,
    ) -> Result<(), ChangeFailure> {
        info!("📝 Changing unit {} to address {}", current, new);
        let command =
            Command::write_single_register(current, self.address_register, u16::from(new.get()));
        let outcome = self.session.issue(command).await;

        if outcome.echo {
            warn!("🔁 Write to unit {} came back as an echo", current);
            return Err(ChangeFailure::Inconclusive);
        }

        match outcome.response.fault() {
            None => {
                info!("✅ Unit {} acknowledged new address {}", current, new);
                Ok(())
            }
            Some(detail) => {
                warn!("❌ Address change on unit {} failed: {}", current, detail);
                Err(ChangeFailure::ProtocolOrTransport(detail))
            }
        }
    }
}
