use crate::config::ImageConfig;
use crate::decoder::decode;
use crate::error::{Result, SplitError};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::imaging;
use crate::models::money::parse_decimal;
use crate::models::{LineItem, Order};
use crate::prompts::bill_recognition::SYSTEM;
use bigdecimal::{BigDecimal, Zero};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 账单照片识别: 预处理 -> 视觉模型 -> 解码 -> 结构校验
pub struct BillRecognizer {
    gateway: Arc<dyn CompletionGateway>,
}

impl BillRecognizer {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }

    pub async fn recognize_bill(&self, image_path: &Path, config: &ImageConfig) -> Result<Order> {
        tracing::info!("Recognizing bill {}", image_path.display());

        // 解码/缩放是 CPU 工作，放到阻塞线程池
        let path: PathBuf = image_path.to_path_buf();
        let image_config = config.clone();
        let encoded = tokio::task::spawn_blocking(move || imaging::encode(&path, &image_config))
            .await
            .map_err(|e| SplitError::io(image_path, e))??;

        let request = CompletionRequest::vision(SYSTEM, encoded);
        let raw = self.gateway.complete(&request).await?;
        let order = parse_order(&decode(&raw)?)?;

        tracing::info!(
            "Bill {} recognized: {} items, total {}",
            image_path.display(),
            order.items.len(),
            order.grand_total
        );
        Ok(order)
    }
}

/// 校验模型返回的账单结构 (字段齐全、类型正确、id 唯一)
pub fn parse_order(value: &Value) -> Result<Order> {
    let bill = value
        .as_object()
        .ok_or_else(|| SplitError::schema("bill must be a JSON object with `items` and `total`"))?;
    let raw_items = bill
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| SplitError::schema("bill is missing the `items` array"))?;
    let grand_total = bill
        .get("total")
        .filter(|v| v.is_number())
        .and_then(parse_decimal)
        .ok_or_else(|| SplitError::schema("bill is missing a numeric `total`"))?;

    let mut items = Vec::with_capacity(raw_items.len());
    for (idx, raw) in raw_items.iter().enumerate() {
        let position = idx + 1;
        let fields = raw
            .as_object()
            .ok_or_else(|| SplitError::schema(format!("item #{} is not an object", position)))?;

        let item = LineItem {
            id: positive_int(fields, "id", position)?,
            name: fields
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| field_error("name", "a string", position))?
                .to_string(),
            price: non_negative_decimal(fields, "price", position)?,
            count: positive_int(fields, "count", position)?,
            total: non_negative_decimal(fields, "total", position)?,
        };
        items.push(item);
    }

    let order = Order { items, grand_total };
    order.validate()?;
    Ok(order)
}

fn field_error(field: &str, expected: &str, position: usize) -> SplitError {
    SplitError::schema(format!(
        "item #{}: `{}` is missing or not {}",
        position, field, expected
    ))
}

fn positive_int(fields: &Map<String, Value>, field: &str, position: usize) -> Result<u32> {
    fields
        .get(field)
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| field_error(field, "a positive integer", position))
}

fn non_negative_decimal(fields: &Map<String, Value>, field: &str, position: usize) -> Result<BigDecimal> {
    fields
        .get(field)
        .filter(|v| v.is_number())
        .and_then(parse_decimal)
        .filter(|d| *d >= BigDecimal::zero())
        .ok_or_else(|| field_error(field, "a non-negative number", position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn bill() -> Value {
        json!({
            "items": [
                {"id": 1, "name": "Aviation", "price": 12.5, "count": 3, "total": 37.5},
                {"id": 2, "name": "Cezar Roll", "price": 9.99, "count": 1, "total": 9.99}
            ],
            "total": 47.49
        })
    }

    #[test]
    fn parses_valid_bill_in_print_order() {
        let order = parse_order(&bill()).unwrap();
        assert_eq!(order.ids(), vec![1, 2]);
        assert_eq!(order.items[0].name, "Aviation");
        assert_eq!(order.items[0].count, 3);
        assert_eq!(order.items[1].price, BigDecimal::from_str("9.99").unwrap());
        assert_eq!(order.grand_total, BigDecimal::from_str("47.49").unwrap());
    }

    #[test]
    fn rejects_missing_field() {
        let mut value = bill();
        value["items"][1].as_object_mut().unwrap().remove("price");
        let err = parse_order(&value).unwrap_err();
        assert!(matches!(err, SplitError::Schema(ref m) if m.contains("price")));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut value = bill();
        value["items"][1]["id"] = json!(1);
        assert!(matches!(parse_order(&value), Err(SplitError::Schema(m)) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_wrong_types() {
        let cases = [
            ("id", json!("1")),
            ("id", json!(0)),
            ("count", json!(1.5)),
            ("price", json!("12.5")),
            ("total", json!(-1)),
            ("name", json!(42)),
        ];
        for (field, bad) in cases {
            let mut value = bill();
            value["items"][0][field] = bad;
            assert!(
                matches!(parse_order(&value), Err(SplitError::Schema(_))),
                "{} should be rejected",
                field
            );
        }
    }

    #[test]
    fn rejects_missing_total_or_items() {
        assert!(matches!(parse_order(&json!({"items": []})), Err(SplitError::Schema(_))));
        assert!(matches!(parse_order(&json!({"total": 1})), Err(SplitError::Schema(_))));
        assert!(matches!(parse_order(&json!([1, 2])), Err(SplitError::Schema(_))));
    }

    #[test]
    fn total_mismatch_is_not_rejected_here() {
        let mut value = bill();
        value["total"] = json!(1000);
        assert!(parse_order(&value).is_ok());
    }
}
