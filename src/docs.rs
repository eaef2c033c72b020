use crate::accounting::{DayEntry, LeaveStats};
use crate::api::attendance::CheckInReq;
use crate::api::dashboard::{
    AdminDashboard, CompanyWise, EmployeeDashboard, LeaveToday, StatusCount, TodayCounts,
    TrendPoint, WfhToday,
};
use crate::api::employee::{
    CreateEmployee, EmployeeListResponse, EmployeeQuery, LinkAccount, UpdateEmployee,
};
use crate::api::faculty::{
    AssignFaculty, ChangeFacultyManager, CreateFacultyManager, FacultyFilter, UpdateFacultyStatus,
};
use crate::api::leave_request::{
    CreateLeave, LeaveFilter, LeaveListResponse, ReviewLeave, UpdateLeave, YearQuery,
};
use crate::api::payroll::{CreatePayroll, PaginatedPayrollResponse, PayrollQuery, UpdatePayroll};
use crate::api::reimbursement::{CreateReimbursement, ReimbursementView, ReviewReimbursement};
use crate::model::attendance::AttendanceStatus;
use crate::model::department::DepartmentHeadcount;
use crate::model::employee::{Employee, EmployeeBrief};
use crate::model::faculty::{FacultyManager, FacultyStatus, FreelanceFaculty};
use crate::model::leave_request::{LeaveRow, LeaveStatus, LeaveType};
use crate::model::payroll::{Payroll, PayrollSummary};
use crate::model::reimbursement::{BillRow, NewBill, ReimbursementRow, ReimbursementStatus};
use crate::model::role::Company;
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM System API",
        version = "1.0.0",
        description = r#"
## Human Resource Management (HRM) System

Backend for two companies (Agility and Lyfshilp) sharing one HR portal.

### 🔹 Key Features
- **Leave & WFH**
  - Apply, edit, withdraw, approve/reject, yearly KPIs
- **Attendance**
  - Daily check-in (office or WFH), check-out, merged yearly timeline
- **Dashboard**
  - Company-wide counters for admins, personal KPIs for employees
- **Reimbursements**
  - Bill-backed expense claims reviewed by admins or department managers
- **Employees & Payroll**
  - Admin-maintained directory and monthly payroll
- **Freelance Faculty**
  - Faculty managers and the freelance faculty assigned to them

### 🔐 Security
Every `/api` endpoint needs a **JWT Bearer** access token from `/auth/login`.
Department managers review requests of their own departments only.

### 📦 Response Format
- JSON everywhere; errors are `{ "success": false, "message": "..." }`
- Pagination on list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::dashboard::dashboard,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::review_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::leave_summary,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_timeline,

        crate::api::reimbursement::create_reimbursement,
        crate::api::reimbursement::my_reimbursements,
        crate::api::reimbursement::employee_delete,
        crate::api::reimbursement::manager_reimbursements,
        crate::api::reimbursement::all_reimbursements,
        crate::api::reimbursement::admin_delete,
        crate::api::reimbursement::update_status,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::link_account,

        crate::api::faculty::create_manager,
        crate::api::faculty::list_managers,
        crate::api::faculty::assign_faculty,
        crate::api::faculty::list_faculties,
        crate::api::faculty::update_status,
        crate::api::faculty::change_manager,

        crate::api::payroll::create_payroll,
        crate::api::payroll::update_payroll,
        crate::api::payroll::get_payroll,
        crate::api::payroll::list_payrolls
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            Company,
            LeaveType,
            LeaveStatus,
            LeaveRow,
            LeaveFilter,
            LeaveListResponse,
            CreateLeave,
            UpdateLeave,
            ReviewLeave,
            YearQuery,
            LeaveStats,
            DayEntry,
            AttendanceStatus,
            CheckInReq,
            AdminDashboard,
            EmployeeDashboard,
            TodayCounts,
            TrendPoint,
            CompanyWise,
            StatusCount,
            LeaveToday,
            WfhToday,
            DepartmentHeadcount,
            PayrollSummary,
            ReimbursementStatus,
            ReimbursementRow,
            ReimbursementView,
            BillRow,
            NewBill,
            CreateReimbursement,
            ReviewReimbursement,
            EmployeeBrief,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeQuery,
            EmployeeListResponse,
            LinkAccount,
            FacultyStatus,
            FacultyManager,
            FreelanceFaculty,
            CreateFacultyManager,
            AssignFaculty,
            FacultyFilter,
            UpdateFacultyStatus,
            ChangeFacultyManager,
            Payroll,
            PaginatedPayrollResponse,
            CreatePayroll,
            UpdatePayroll,
            PayrollQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Dashboard", description = "Role-dependent landing page"),
        (name = "Leave", description = "Leave and WFH requests"),
        (name = "Attendance", description = "Daily attendance and yearly timeline"),
        (name = "Reimbursement", description = "Expense claims"),
        (name = "Employee", description = "Employee directory (admin)"),
        (name = "Faculty", description = "Freelance faculty and their managers (admin)"),
        (name = "Payroll", description = "Monthly payroll (admin)"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme the protected paths refer to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_scope() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/auth/login",
            "/api/dashboard",
            "/api/leave/{leave_id}/approve",
            "/api/attendance/me",
            "/api/reimbursement/{id}/status",
            "/api/payroll",
            "/api/employee/{employee_id}/account",
            "/api/faculty/managers/{manager_id}/faculties",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
