use crate::error::{Result, SplitError};
use serde_json::Value;

/// 严格解析模型输出；不剥离 markdown 代码块，不抽取内嵌 JSON
pub fn decode(raw_text: &str) -> Result<Value> {
    serde_json::from_str(raw_text).map_err(|e| SplitError::Decode {
        message: e.to_string(),
        raw: raw_text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_structured_values() {
        let values = [
            json!({"2 авиации": ["Саня"], "пицца пепперони": ["Вика", "Лера"]}),
            json!([{"id": 1, "guests": ["Саня", "Саня", "Вика"]}, {"id": 2, "guests": []}]),
            json!({"items": [{"id": 1, "name": "Aviation", "price": 12.5, "count": 3, "total": 37.5}], "total": 37.5}),
        ];
        for value in values {
            let raw = serde_json::to_string(&value).unwrap();
            assert_eq!(decode(&raw).unwrap(), value);
        }
    }

    #[test]
    fn mention_order_survives_decoding() {
        let value = decode(r#"{"цезарь ролл": ["Ваня"], "2 авиации": ["Саня"]}"#).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["цезарь ролл", "2 авиации"]);
    }

    #[test]
    fn rejects_non_json_with_raw_text() {
        match decode("not json") {
            Err(SplitError::Decode { raw, .. }) => assert_eq!(raw, "not json"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn does_not_strip_markdown_fences() {
        let fenced = "```json\n{\"total\": 1}\n```";
        assert!(matches!(decode(fenced), Err(SplitError::Decode { .. })));
    }

    #[test]
    fn rejects_trailing_commentary() {
        assert!(matches!(
            decode("{\"total\": 1} Here is your bill!"),
            Err(SplitError::Decode { .. })
        ));
    }
}
