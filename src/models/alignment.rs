use super::order::Order;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 某账单行对应的客人 (重复表示重复点单)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub id: u32,
    pub guests: Vec<String>,
}

/// 对齐结果: 每个账单行 id 恰好一条记录，按账单顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlignmentResult {
    records: Vec<AlignmentRecord>,
}

/// 客人认领数量与账单数量不一致 - 交由人工核对，不是错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDiscrepancy {
    pub id: u32,
    pub name: String,
    pub billed: u32,
    pub attributed: usize,
}

impl AlignmentResult {
    pub fn new(records: Vec<AlignmentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[AlignmentRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AlignmentRecord> {
        self.records
    }

    pub fn ids(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.id).collect()
    }

    pub fn guests_for(&self, id: u32) -> Option<&[String]> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.guests.as_slice())
    }

    /// 合并多位客人的对齐结果: 按 id 拼接客人序列，保留重复
    pub fn concat(order: &Order, parts: impl IntoIterator<Item = AlignmentResult>) -> Self {
        let mut merged: IndexMap<u32, Vec<String>> =
            order.items.iter().map(|item| (item.id, Vec::new())).collect();

        for part in parts {
            for record in part.records {
                if let Some(guests) = merged.get_mut(&record.id) {
                    guests.extend(record.guests);
                }
            }
        }

        Self {
            records: merged
                .into_iter()
                .map(|(id, guests)| AlignmentRecord { id, guests })
                .collect(),
        }
    }

    pub fn discrepancies(&self, order: &Order) -> Vec<CountDiscrepancy> {
        self.records
            .iter()
            .filter_map(|record| {
                let item = order.item(record.id)?;
                if record.guests.len() == item.count as usize {
                    return None;
                }
                Some(CountDiscrepancy {
                    id: item.id,
                    name: item.name.clone(),
                    billed: item.count,
                    attributed: record.guests.len(),
                })
            })
            .collect()
    }
}
