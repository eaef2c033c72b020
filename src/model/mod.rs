use derive_more::Display;

use crate::accounting::AccountingError;

pub mod attendance;
pub mod department;
pub mod employee;
pub mod faculty;
pub mod leave_request;
pub mod payroll;
pub mod reimbursement;
pub mod role;
pub mod user;

/// A stored row that does not fit its domain type.
#[derive(Debug, Display)]
pub enum ConversionError {
    #[display(fmt = "unknown {} value '{}'", field, value)]
    UnknownValue { field: &'static str, value: String },

    #[display(fmt = "row {}: {}", id, source)]
    Dates { id: u64, source: AccountingError },
}

impl std::error::Error for ConversionError {}

pub(crate) fn parse_column<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<T, ConversionError> {
    value.parse().map_err(|_| ConversionError::UnknownValue {
        field,
        value: value.to_string(),
    })
}
