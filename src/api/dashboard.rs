//! Role-dependent landing page numbers.
//!
//! Admins get company-wide counters; employees get their own yearly
//! [`LeaveStats`] straight from the accounting engine.

use std::collections::BTreeMap;

use actix_web::{HttpResponse, web};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::accounting::{DateRange, LeaveStats};
use crate::api::leave_request::{LEAVE_COLUMNS, YearQuery, leave_stats};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceRecord, AttendanceRow, AttendanceStatus};
use crate::model::department::DepartmentHeadcount;
use crate::model::leave_request::LeaveRow;
use crate::model::payroll::{Payroll, PayrollSummary};
use crate::model::role::{Company, Role};

const TREND_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TodayCounts {
    pub present: i64,
    pub wfh: i64,
    pub absent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TrendPoint {
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub present: i64,
    pub wfh: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CompanyWise {
    pub agility: i64,
    pub lyfshilp: i64,
}

impl CompanyWise {
    pub fn total(&self) -> i64 {
        self.agility + self.lyfshilp
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct StatusCount {
    #[schema(example = "PENDING")]
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveToday {
    #[serde(flatten)]
    pub leave: LeaveRow,
    /// Inclusive length of the whole request
    pub days: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct WfhToday {
    pub employee_id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
    #[schema(example = "09:10:00", value_type = String, nullable = true)]
    pub check_in: Option<chrono::NaiveTime>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub total_employees: i64,
    pub total_departments: i64,
    pub today: TodayCounts,
    pub leave_summary: Vec<StatusCount>,
    pub payroll_summary: PayrollSummary,
    pub company_wise: CompanyWise,
    pub departments: Vec<DepartmentHeadcount>,
    pub attendance_trend: Vec<TrendPoint>,
    pub leaves_trend: Vec<LeaveRow>,
    pub leaves_today: Vec<LeaveToday>,
    pub wfh_today: Vec<WfhToday>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeDashboard {
    #[serde(flatten)]
    pub stats: LeaveStats,
    pub payroll_history: Vec<Payroll>,
    pub attendance_trend: Vec<TrendPoint>,
}

/// Check-ins with PRESENT count as present, WFH rows as wfh; everyone else is absent.
fn today_counts(total_employees: i64, today: NaiveDate, records: &[AttendanceRecord]) -> TodayCounts {
    let todays = records.iter().filter(|r| r.date == today);

    let (present, wfh) = todays.fold((0, 0), |(p, w), r| match r.status {
        AttendanceStatus::Present if r.check_in => (p + 1, w),
        AttendanceStatus::Wfh => (p, w + 1),
        _ => (p, w),
    });

    TodayCounts {
        present,
        wfh,
        absent: (total_employees - (present + wfh)).max(0),
    }
}

/// One point per day from `today - days + 1` to `today`, zero-filled.
fn attendance_trend(today: NaiveDate, days: i64, records: &[AttendanceRecord]) -> Vec<TrendPoint> {
    let first = today - Duration::days(days - 1);

    let mut points: BTreeMap<NaiveDate, TrendPoint> = (0..days)
        .map(|offset| first + Duration::days(offset))
        .map(|date| {
            (
                date,
                TrendPoint {
                    date,
                    present: 0,
                    wfh: 0,
                },
            )
        })
        .collect();

    for record in records {
        let Some(point) = points.get_mut(&record.date) else {
            continue;
        };
        match record.status {
            AttendanceStatus::Present if record.check_in => point.present += 1,
            AttendanceStatus::Wfh => point.wfh += 1,
            _ => {}
        }
    }

    points.into_values().collect()
}

fn company_wise(rows: &[(u8, i64)]) -> CompanyWise {
    rows.iter()
        .fold(CompanyWise::default(), |mut acc, (role_id, count)| {
            match Role::from_id(*role_id).and_then(Role::company) {
                Some(Company::Agility) => acc.agility += count,
                Some(Company::Lyfshilp) => acc.lyfshilp += count,
                None => {}
            }
            acc
        })
}

async fn fetch_attendance_between(
    pool: &MySqlPool,
    employee_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<AttendanceRecord>> {
    let rows = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, status
        FROM attendance
        WHERE date BETWEEN ? AND ?
        AND (? IS NULL OR employee_id = ?)
        ORDER BY date ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(employee_id)
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| AttendanceRecord::try_from(row).map_err(AppError::from))
        .collect()
}

async fn admin_dashboard(pool: &MySqlPool, today: NaiveDate) -> AppResult<AdminDashboard> {
    let role_counts = sqlx::query_as::<_, (u8, i64)>(
        "SELECT role_id, COUNT(*) FROM users WHERE role_id IN (?, ?) GROUP BY role_id",
    )
    .bind(Role::AgilityEmployee.id())
    .bind(Role::LyfEmployee.id())
    .fetch_all(pool)
    .await?;
    let company_wise = company_wise(&role_counts);

    let departments = sqlx::query_as::<_, DepartmentHeadcount>(
        r#"
        SELECT d.id, d.name, COUNT(e.id) AS count
        FROM departments d
        LEFT JOIN employees e ON e.department_id = d.id
        GROUP BY d.id, d.name
        ORDER BY d.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let trend_start = today - Duration::days(TREND_DAYS - 1);
    let recent = fetch_attendance_between(pool, None, trend_start, today).await?;

    let leave_summary = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT status, COUNT(*) AS count
        FROM leave_requests
        WHERE is_deleted = FALSE
        GROUP BY status
        "#,
    )
    .fetch_all(pool)
    .await?;

    let payroll_rows = sqlx::query_as::<_, Payroll>(
        r#"
        SELECT id, employee_id, salary_month, base_salary, bonus, deductions, net_salary
        FROM payroll
        ORDER BY salary_month DESC
        LIMIT 12
        "#,
    )
    .fetch_all(pool)
    .await?;

    let month_start = today.with_day(1).unwrap_or(today);
    let leaves_trend = sqlx::query_as::<_, LeaveRow>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests \
         WHERE is_deleted = FALSE AND start_date >= ? ORDER BY start_date ASC"
    ))
    .bind(month_start)
    .fetch_all(pool)
    .await?;

    let leaves_today = sqlx::query_as::<_, LeaveRow>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests \
         WHERE is_deleted = FALSE AND start_date <= ? AND end_date >= ? ORDER BY start_date ASC"
    ))
    .bind(today)
    .bind(today)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|leave| -> AppResult<LeaveToday> {
        let days = DateRange::from_parts(leave.start_date, leave.end_date)?.days();
        Ok(LeaveToday { leave, days })
    })
    .collect::<AppResult<Vec<_>>>()?;

    let wfh_today = sqlx::query_as::<_, WfhToday>(
        r#"
        SELECT a.employee_id, e.first_name, e.last_name, a.check_in
        FROM attendance a
        JOIN employees e ON e.id = a.employee_id
        WHERE a.date = ? AND a.status = ?
        ORDER BY e.first_name
        "#,
    )
    .bind(today)
    .bind(AttendanceStatus::Wfh.as_ref())
    .fetch_all(pool)
    .await?;

    let total_employees = company_wise.total();

    Ok(AdminDashboard {
        total_employees,
        total_departments: departments.len() as i64,
        today: today_counts(total_employees, today, &recent),
        leave_summary,
        payroll_summary: PayrollSummary::from_rows(&payroll_rows),
        company_wise,
        departments,
        attendance_trend: attendance_trend(today, TREND_DAYS, &recent),
        leaves_trend,
        leaves_today,
        wfh_today,
    })
}

async fn employee_dashboard(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
    leave_quota: i64,
    today: NaiveDate,
) -> AppResult<EmployeeDashboard> {
    let stats = leave_stats(pool, employee_id, year, leave_quota).await?;

    let payroll_history = sqlx::query_as::<_, Payroll>(
        r#"
        SELECT id, employee_id, salary_month, base_salary, bonus, deductions, net_salary
        FROM payroll
        WHERE employee_id = ?
        ORDER BY salary_month DESC
        LIMIT 6
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    let trend_start = today - Duration::days(TREND_DAYS - 1);
    let recent = fetch_attendance_between(pool, Some(employee_id), trend_start, today).await?;

    Ok(EmployeeDashboard {
        stats,
        payroll_history,
        attendance_trend: attendance_trend(today, TREND_DAYS, &recent),
    })
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(YearQuery),
    responses(
        (status = 200, description = "Admin payload (AdminDashboard) or employee payload (EmployeeDashboard) under `stats`", body = Object, example = json!({
            "success": true,
            "admin": false,
            "stats": {
                "year": 2026,
                "present_days": 3,
                "total_leaves": 13,
                "approved_leaves": 6,
                "wfh_days": 3,
                "wfh_applied": 4,
                "leave_quota": 21,
                "remaining_leaves": 15,
                "attendance": [],
                "payroll_history": [],
                "attendance_trend": []
            }
        })),
        (status = 400, description = "Unsupported year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<YearQuery>,
) -> AppResult<HttpResponse> {
    let today = Local::now().date_naive();

    if auth.is_admin() {
        let stats = admin_dashboard(pool.get_ref(), today).await?;
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "admin": true,
            "stats": stats
        })));
    }

    let employee_id = auth.employee_id()?;
    let stats = employee_dashboard(
        pool.get_ref(),
        employee_id,
        query.resolve(),
        config.yearly_leave_quota,
        today,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "admin": false,
        "stats": stats
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn record(employee_id: u64, date: NaiveDate, check_in: bool, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            employee_id,
            date,
            check_in,
            status,
        }
    }

    #[test]
    fn today_counts_split_present_and_wfh() {
        let records = vec![
            record(1, d(10), true, AttendanceStatus::Present),
            record(2, d(10), true, AttendanceStatus::Wfh),
            record(3, d(10), true, AttendanceStatus::Present),
            // yesterday does not count
            record(4, d(9), true, AttendanceStatus::Present),
        ];

        assert_eq!(
            today_counts(10, d(10), &records),
            TodayCounts {
                present: 2,
                wfh: 1,
                absent: 7
            }
        );
    }

    #[test]
    fn absent_never_goes_negative() {
        let records = vec![
            record(1, d(10), true, AttendanceStatus::Present),
            record(2, d(10), true, AttendanceStatus::Present),
        ];
        assert_eq!(today_counts(1, d(10), &records).absent, 0);
    }

    #[test]
    fn trend_is_zero_filled_and_ascending() {
        let records = vec![
            record(1, d(4), true, AttendanceStatus::Present),
            record(1, d(10), true, AttendanceStatus::Wfh),
            record(2, d(10), true, AttendanceStatus::Present),
            // outside the window
            record(1, d(1), true, AttendanceStatus::Present),
        ];

        let trend = attendance_trend(d(10), 7, &records);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend.first().map(|p| p.date), Some(d(4)));
        assert_eq!(trend.last().map(|p| p.date), Some(d(10)));
        assert_eq!(trend[0].present, 1);
        assert_eq!((trend[6].present, trend[6].wfh), (1, 1));
        assert!(trend[1..6].iter().all(|p| p.present == 0 && p.wfh == 0));
    }

    #[test]
    fn company_counts_ignore_admins_and_unknown_roles() {
        let counts = company_wise(&[(1, 2), (2, 14), (3, 9), (9, 1)]);
        assert_eq!(
            counts,
            CompanyWise {
                agility: 14,
                lyfshilp: 9
            }
        );
        assert_eq!(counts.total(), 23);
    }
}
