use crate::error::{Result, SplitError};
use crate::models::{AlignmentResult, CostSplit, Order, UnassignedItem};
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use indexmap::IndexMap;
use std::path::Path;

/// 按对齐结果分账
/// 客人在某行中每出现一次，分得该行 total / 出现总次数
pub fn split_costs(order: &Order, alignment: &AlignmentResult) -> CostSplit {
    let mut shares: IndexMap<String, BigDecimal> = IndexMap::new();
    let mut unassigned = Vec::new();
    let mut assigned_total = BigDecimal::zero();
    let mut unassigned_total = BigDecimal::zero();

    for item in &order.items {
        let guests = alignment.guests_for(item.id).unwrap_or(&[]);
        if guests.is_empty() {
            unassigned_total += &item.total;
            unassigned.push(UnassignedItem {
                id: item.id,
                name: item.name.clone(),
                total: item.total.clone(),
            });
            continue;
        }

        let portion = &item.total / &BigDecimal::from(guests.len() as u64);
        for guest in guests {
            *shares.entry(guest.clone()).or_insert_with(BigDecimal::zero) += &portion;
        }
        assigned_total += &item.total;
    }

    // 最后统一保留两位小数
    for share in shares.values_mut() {
        *share = share.round(2);
    }

    if !unassigned.is_empty() {
        tracing::warn!(
            "{} item(s) totalling {} were not claimed by any guest",
            unassigned.len(),
            unassigned_total
        );
    }

    CostSplit {
        shares,
        unassigned,
        assigned_total,
        unassigned_total,
        computed_at: Utc::now(),
    }
}

/// 导出分账结果到 CSV
pub fn export_split_csv(split: &CostSplit, output_path: &Path) -> Result<()> {
    use csv::Writer;
    use std::fs::File;

    let file = File::create(output_path).map_err(|e| SplitError::io(output_path, e))?;
    let mut writer = Writer::from_writer(file);

    let rows = split
        .shares
        .iter()
        .map(|(guest, amount)| [guest.clone(), amount.to_string()])
        .chain(
            split
                .unassigned
                .iter()
                .map(|item| [format!("unassigned:{}", item.id), item.total.to_string()]),
        );

    writer
        .write_record(["guest", "amount"])
        .map_err(|e| SplitError::io(output_path, e))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| SplitError::io(output_path, e))?;
    }

    writer.flush().map_err(|e| SplitError::io(output_path, e))?;
    Ok(())
}
