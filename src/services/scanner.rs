use log::{debug, info};
use std::time::Duration;
use tokio::time::sleep;

use super::session::MasterSession;
use crate::config::settings::ScanConfig;
use crate::modbus::{AddressRange, Command, ExceptionCode, ModbusTransport, Response, UnitAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub register: u16,
    pub count: u16,
    pub inter_probe_delay: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            register: 0,
            count: 1,
            inter_probe_delay: Duration::ZERO,
        }
    }
}

impl From<&ScanConfig> for ProbeSettings {
    fn from(config: &ScanConfig) -> Self {
        Self {
            register: config.probe_register,
            count: config.probe_count,
            inter_probe_delay: Duration::from_millis(config.inter_probe_delay_ms),
        }
    }
}

/// Addresses confirmed present, in ascending probe order, plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    present: Vec<UnitAddress>,
    inconclusive: Vec<UnitAddress>,
    exceptions: Vec<(UnitAddress, ExceptionCode)>,
    probes: usize,
}

impl ScanResult {
    pub fn present(&self) -> &[UnitAddress] {
        &self.present
    }

    pub fn contains(&self, unit: UnitAddress) -> bool {
        self.present.contains(&unit)
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    /// Units whose reply looked like our own request echoed back.
    pub fn inconclusive(&self) -> &[UnitAddress] {
        &self.inconclusive
    }

    /// Units that answered with an exception frame and were counted absent.
    pub fn exceptions(&self) -> &[(UnitAddress, ExceptionCode)] {
        &self.exceptions
    }

    pub fn probes(&self) -> usize {
        self.probes
    }
}

pub struct BusScanner<'a, T: ModbusTransport> {
    session: &'a mut MasterSession<T>,
    settings: ProbeSettings,
}

impl<'a, T: ModbusTransport> BusScanner<'a, T> {
    pub fn new(session: &'a mut MasterSession<T>, settings: ProbeSettings) -> Self {
        Self { session, settings }
    }

    /// Probes every address in `range` once, ascending. A fault on one
    /// address never stops the scan.
    pub async fn scan(&mut self, range: AddressRange) -> ScanResult {
        info!(
            "🔍 Scanning units {}..={} ({} addresses)",
            range.first(),
            range.last(),
            range.len()
        );
        let mut result = ScanResult::default();

        for (index, unit) in range.iter().enumerate() {
            if index > 0 && !self.settings.inter_probe_delay.is_zero() {
                sleep(self.settings.inter_probe_delay).await;
            }

            let probe =
                Command::read_holding_registers(unit, self.settings.register, self.settings.count);
            let outcome = self.session.issue(probe).await;
            result.probes += 1;

            if outcome.echo {
                debug!("🔁 Unit {}: reply matches the probe, treating as inconclusive", unit);
                result.inconclusive.push(unit);
                continue;
            }

            match outcome.response {
                Response::Ok(_) => {
                    info!("✅ Unit {} responded", unit);
                    result.present.push(unit);
                }
                Response::ProtocolFault(code) => {
                    debug!("📵 Unit {} answered with {}", unit, code);
                    result.exceptions.push((unit, code));
                }
                Response::TransportFault(fault) => {
                    debug!("📵 Unit {}: {}", unit, fault);
                }
            }
        }

        info!(
            "📊 Scan finished: {} present, {} inconclusive, {} probes",
            result.present.len(),
            result.inconclusive.len(),
            result.probes
        );
        result
    }
}
