use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Whether a contribution has been received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Pending,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Pending => write!(f, "Pending"),
        }
    }
}

/// A member contribution record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub date: NaiveDate,
    /// Amount in francs CFA
    pub amount: u32,
    pub status: PaymentStatus,
    /// Storage URL of the uploaded receipt image, if any
    pub receipt: Option<String>,
}

/// Distinct contribution years, most recent first (the year filter)
pub fn available_years(payments: &[Payment]) -> Vec<i32> {
    let mut years: Vec<i32> = payments.iter().map(|p| p.date.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Filter by year and, when given, month (`None` keeps the whole year)
pub fn filter_by_period(payments: &[Payment], year: i32, month: Option<u32>) -> Vec<&Payment> {
    payments
        .iter()
        .filter(|p| p.date.year() == year && month.map_or(true, |m| p.date.month() == m))
        .collect()
}

/// Sum of received contributions, in francs CFA
pub fn total_paid(payments: &[Payment]) -> u64 {
    payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Paid)
        .map(|p| u64::from(p.amount))
        .sum()
}
