use crate::error::{Result, SplitError};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 账单行 (按小票打印顺序)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: u32,
    pub name: String,
    #[serde(deserialize_with = "super::money::deserialize")]
    pub price: BigDecimal,
    pub count: u32,
    #[serde(deserialize_with = "super::money::deserialize")]
    pub total: BigDecimal,
}

/// 识别出的规范账单，识别后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub items: Vec<LineItem>,
    #[serde(rename = "total", deserialize_with = "super::money::deserialize")]
    pub grand_total: BigDecimal,
}

/// 单行金额不符 (price * count 与打印的 total)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineMismatch {
    pub id: u32,
    pub expected: BigDecimal,
    pub printed: BigDecimal,
}

/// 金额核对报告 - 只报告，不修正
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsReport {
    pub line_mismatches: Vec<LineMismatch>,
    pub items_sum: BigDecimal,
    pub grand_total: BigDecimal,
    pub grand_total_delta: BigDecimal,
    pub grand_total_ok: bool,
}

impl TotalsReport {
    pub fn is_consistent(&self) -> bool {
        self.line_mismatches.is_empty() && self.grand_total_ok
    }
}

/// 发给匹配模型的精简账单行: 价格与它无关
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DigestItem {
    pub id: u32,
    pub name: String,
    pub count: u32,
}

impl Order {
    /// 结构不变量: id 为正且唯一，count > 0，金额非负
    /// 识别结果与外部传入的账单都要经过这里
    pub fn validate(&self) -> Result<()> {
        let mut seen_ids = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if item.id == 0 {
                return Err(SplitError::schema(format!("item {:?} has id 0", item.name)));
            }
            if !seen_ids.insert(item.id) {
                return Err(SplitError::schema(format!("duplicate item id {}", item.id)));
            }
            if item.count == 0 {
                return Err(SplitError::schema(format!("item {} has count 0", item.id)));
            }
            if item.price < BigDecimal::zero() || item.total < BigDecimal::zero() {
                return Err(SplitError::schema(format!("item {} has a negative amount", item.id)));
            }
        }
        if self.grand_total < BigDecimal::zero() {
            return Err(SplitError::schema("bill total is negative"));
        }
        Ok(())
    }

    pub fn ids(&self) -> Vec<u32> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn item(&self, id: u32) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn digest(&self) -> Vec<DigestItem> {
        self.items
            .iter()
            .map(|item| DigestItem {
                id: item.id,
                name: item.name.clone(),
                count: item.count,
            })
            .collect()
    }

    pub fn items_sum(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + &item.total)
    }

    /// 核对 total ≈ price * count 以及 grand_total ≈ Σ total
    pub fn check_totals(&self, tolerance: &BigDecimal) -> TotalsReport {
        let line_mismatches: Vec<LineMismatch> = self
            .items
            .iter()
            .filter_map(|item| {
                let expected = &item.price * &BigDecimal::from(item.count);
                if (&expected - &item.total).abs() > *tolerance {
                    Some(LineMismatch {
                        id: item.id,
                        expected,
                        printed: item.total.clone(),
                    })
                } else {
                    None
                }
            })
            .collect();

        let items_sum = self.items_sum();
        let grand_total_delta = &self.grand_total - &items_sum;
        let grand_total_ok = grand_total_delta.abs() <= *tolerance;

        TotalsReport {
            line_mismatches,
            items_sum,
            grand_total: self.grand_total.clone(),
            grand_total_delta,
            grand_total_ok,
        }
    }
}
