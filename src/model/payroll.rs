use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payroll {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub salary_month: NaiveDate,
    pub base_salary: f64,
    pub bonus: f64,
    pub deductions: f64,
    pub net_salary: f64,
}

pub fn net_salary(base_salary: f64, bonus: f64, deductions: f64) -> f64 {
    base_salary + bonus - deductions
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayrollSummary {
    pub total_base: f64,
    pub total_bonus: f64,
    pub total_deduction: f64,
    pub total_net: f64,
}

impl PayrollSummary {
    pub fn from_rows(rows: &[Payroll]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, p| {
            acc.total_base += p.base_salary;
            acc.total_bonus += p.bonus;
            acc.total_deduction += p.deductions;
            acc.total_net += p.net_salary;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payroll(id: u64, base: f64, bonus: f64, deductions: f64) -> Payroll {
        Payroll {
            id,
            employee_id: 1,
            salary_month: NaiveDate::from_ymd_opt(2026, id as u32, 1).unwrap(),
            base_salary: base,
            bonus,
            deductions,
            net_salary: net_salary(base, bonus, deductions),
        }
    }

    #[test]
    fn net_adds_bonus_and_subtracts_deductions() {
        assert_eq!(net_salary(50_000.0, 5_000.0, 2_000.0), 53_000.0);
    }

    #[test]
    fn summary_totals_every_column() {
        let rows = vec![payroll(1, 1000.0, 100.0, 50.0), payroll(2, 2000.0, 0.0, 250.0)];
        let summary = PayrollSummary::from_rows(&rows);
        assert_eq!(
            summary,
            PayrollSummary {
                total_base: 3000.0,
                total_bonus: 100.0,
                total_deduction: 300.0,
                total_net: 2800.0,
            }
        );
        assert_eq!(PayrollSummary::from_rows(&[]), PayrollSummary::default());
    }
}
