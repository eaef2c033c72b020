pub mod attendance;
pub mod dashboard;
pub mod employee;
pub mod faculty;
pub mod leave_request;
pub mod payroll;
pub mod reimbursement;
