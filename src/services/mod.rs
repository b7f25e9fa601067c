pub mod rewriter;
pub mod scanner;
pub mod session;

pub use rewriter::{AddressRewriter, DEFAULT_ADDRESS_REGISTER};
pub use scanner::{BusScanner, ProbeSettings, ScanResult};
pub use session::{MasterSession, Outcome};
