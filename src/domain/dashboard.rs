use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Back-office dashboard counters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardStats {
    pub new_contacts: i64,
    pub total_contacts: i64,
    pub new_estimates: i64,
    pub total_estimates: i64,
    /// Quotation count per status
    pub quotations_by_status: BTreeMap<String, i64>,
    pub accepted_quotation_value: Decimal,
    pub active_projects: i64,
    pub open_tasks: i64,
    pub overdue_tasks: i64,
    pub contacts_last_30_days: i64,
    pub estimates_last_30_days: i64,
}
