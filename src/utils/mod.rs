pub mod error;

pub use error::{ChangeFailure, InputValidationError, ModbusError};
