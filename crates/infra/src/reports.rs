//! Report aggregation queries.
//!
//! Reports are read-only compositions over the other repositories; nothing
//! here mutates state.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use plantops_core::DomainError;

use crate::error::RepoResult;
use crate::expenses::{CategoryTotal, ExpenseRepo};
use crate::production::ProductionRepo;
use crate::products::ProductRepo;
use crate::sales::{SaleRepo, TopProduct};
use crate::stock::{StockLedger, StockLevelRow};
use crate::users::UserRepo;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub today: TodaySnapshot,
    pub monthly: MonthlyTotals,
    pub kpis: Kpis,
    pub top_product: Option<TopProduct>,
    pub low_stock_alerts: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodaySnapshot {
    pub date: NaiveDate,
    pub production_runs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTotals {
    pub total_sales: Decimal,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Kpis {
    pub total_production_runs: i64,
    pub total_products: i64,
    pub low_stock_alerts: i64,
    pub active_users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub period: Period,
    pub production: MonthlyProduction,
    pub sales: MonthlyTotalsOnly,
    pub expenses: MonthlyExpenses,
    pub income: IncomeSummary,
    pub inventory: InventorySnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyProduction {
    pub total_runs: i64,
    pub output_by_product: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTotalsOnly {
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyExpenses {
    pub total_amount: Decimal,
    pub by_category: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomeSummary {
    pub net_income: Decimal,
    /// Percentage of sales kept after expenses, rounded to 2 decimals.
    pub profit_margin: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub stock_levels: Vec<StockLevelRow>,
    pub low_stock_count: usize,
    pub low_stock_items: Vec<StockLevelRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionSummaryEntry {
    pub product_name: String,
    pub total_input: Decimal,
    pub total_output: Decimal,
    /// Output as a percentage of input, rounded to 2 decimals.
    pub efficiency: Decimal,
    pub runs_count: i64,
}

#[derive(Clone)]
pub struct ReportsRepo {
    production: ProductionRepo,
    sales: SaleRepo,
    expenses: ExpenseRepo,
    stock: StockLedger,
    products: ProductRepo,
    users: UserRepo,
}

impl ReportsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            production: ProductionRepo::new(pool.clone()),
            sales: SaleRepo::new(pool.clone()),
            expenses: ExpenseRepo::new(pool.clone()),
            stock: StockLedger::new(pool.clone()),
            products: ProductRepo::new(pool.clone()),
            users: UserRepo::new(pool),
        }
    }

    pub async fn dashboard(&self, today: NaiveDate) -> RepoResult<DashboardReport> {
        let (month_start, month_end) = month_bounds(today.year(), today.month())?;

        let total_sales = self.sales.total_between(month_start, month_end).await?;
        let total_expenses = self.expenses.total_between(month_start, month_end).await?;
        let low_stock_alerts = self.stock.low_stock().await?.len() as i64;

        Ok(DashboardReport {
            today: TodaySnapshot {
                date: today,
                production_runs: self.production.count_between(today, today).await?,
            },
            monthly: MonthlyTotals {
                total_sales,
                total_expenses,
                net_income: total_sales - total_expenses,
            },
            kpis: Kpis {
                total_production_runs: self.production.count().await?,
                total_products: self.products.count().await?,
                low_stock_alerts,
                active_users: self.users.count().await?,
            },
            top_product: self.sales.top_product_between(month_start, month_end).await?,
            low_stock_alerts,
        })
    }

    pub async fn monthly(&self, year: i32, month: u32) -> RepoResult<MonthlyReport> {
        let (start_date, end_date) = month_bounds(year, month)?;

        let runs = self.production.by_date_range(start_date, end_date).await?;
        let mut output_by_product: BTreeMap<String, Decimal> = BTreeMap::new();
        for run in &runs {
            *output_by_product
                .entry(run.product_name.clone())
                .or_insert(Decimal::ZERO) += run.output_qty;
        }

        let total_sales = self.sales.total_between(start_date, end_date).await?;
        let total_expenses = self.expenses.total_between(start_date, end_date).await?;
        let by_category = self.expenses.totals_by_category(start_date, end_date).await?;
        let net_income = total_sales - total_expenses;

        let profit_margin = if total_sales > Decimal::ZERO {
            (net_income / total_sales * Decimal::from(100)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let stock_levels = self.stock.list().await?;
        let low_stock_items = self.stock.low_stock().await?;

        Ok(MonthlyReport {
            period: Period {
                year,
                month,
                start_date,
                end_date,
            },
            production: MonthlyProduction {
                total_runs: runs.len() as i64,
                output_by_product,
            },
            sales: MonthlyTotalsOnly {
                total_amount: total_sales,
            },
            expenses: MonthlyExpenses {
                total_amount: total_expenses,
                by_category,
            },
            income: IncomeSummary {
                net_income,
                profit_margin,
            },
            inventory: InventorySnapshot {
                low_stock_count: low_stock_items.len(),
                stock_levels,
                low_stock_items,
            },
        })
    }

    pub async fn production_summary(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<ProductionSummaryEntry>> {
        let runs = self.production.by_date_range(start, end).await?;

        let mut summary: BTreeMap<String, ProductionSummaryEntry> = BTreeMap::new();
        for run in &runs {
            let entry = summary
                .entry(run.product_name.clone())
                .or_insert_with(|| ProductionSummaryEntry {
                    product_name: run.product_name.clone(),
                    total_input: Decimal::ZERO,
                    total_output: Decimal::ZERO,
                    efficiency: Decimal::ZERO,
                    runs_count: 0,
                });
            entry.total_input += run.input_qty;
            entry.total_output += run.output_qty;
            entry.runs_count += 1;
        }

        Ok(summary
            .into_values()
            .map(|mut entry| {
                entry.efficiency = if entry.total_input > Decimal::ZERO {
                    (entry.total_output / entry.total_input * Decimal::from(100)).round_dp(2)
                } else {
                    Decimal::ZERO
                };
                entry
            })
            .collect())
    }
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), DomainError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DomainError::validation(format!("invalid month: {year}-{month}")))?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| DomainError::validation(format!("invalid month: {year}-{month}")))?
        .pred_opt()
        .ok_or_else(|| DomainError::validation(format!("invalid month: {year}-{month}")))?;

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_cover_whole_month() {
        let (start, end) = month_bounds(2025, 2).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());

        let (start, end) = month_bounds(2025, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn month_bounds_reject_bad_month() {
        assert!(month_bounds(2025, 13).is_err());
        assert!(month_bounds(2025, 0).is_err());
    }
}
