use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 无人认领的账单行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedItem {
    pub id: u32,
    pub name: String,
    pub total: BigDecimal,
}

/// 分账结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSplit {
    /// 客人 -> 应付金额 (按首次出现顺序)
    pub shares: IndexMap<String, BigDecimal>,
    pub unassigned: Vec<UnassignedItem>,
    pub assigned_total: BigDecimal,
    pub unassigned_total: BigDecimal,
    pub computed_at: DateTime<Utc>,
}
