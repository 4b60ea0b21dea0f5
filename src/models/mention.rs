use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 单个客人描述中抽取出的 "提及 -> 客人列表"
/// 键保持口述原文，值中重复的名字表示重复点单
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestMentionMap(IndexMap<String, Vec<String>>);

impl GuestMentionMap {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, mention: impl Into<String>, guests: Vec<String>) {
        self.0.insert(mention.into(), guests);
    }

    pub fn get(&self, mention: &str) -> Option<&[String]> {
        self.0.get(mention).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 出现过的客人 (去重，按首次出现顺序)
    pub fn guests(&self) -> Vec<&str> {
        let mut seen: indexmap::IndexSet<&str> = indexmap::IndexSet::new();
        for guests in self.0.values() {
            seen.extend(guests.iter().map(String::as_str));
        }
        seen.into_iter().collect()
    }

    /// 缓存键用的稳定表示
    pub fn entries(&self) -> Vec<(String, Vec<String>)> {
        self.0
            .iter()
            .map(|(mention, guests)| (mention.clone(), guests.clone()))
            .collect()
    }
}

impl FromIterator<(String, Vec<String>)> for GuestMentionMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_plain_object_in_order() {
        let mut map = GuestMentionMap::new();
        map.insert("2 авиации", vec!["Саня".to_string()]);
        map.insert("пицца пепперони", vec!["Вика".to_string(), "Лера".to_string()]);

        let rendered = serde_json::to_string(&map).unwrap();
        assert_eq!(
            rendered,
            r#"{"2 авиации":["Саня"],"пицца пепперони":["Вика","Лера"]}"#
        );
    }

    #[test]
    fn guests_are_unique_in_first_seen_order() {
        let map: GuestMentionMap = serde_json::from_value(json!({
            "пицца маргарита": ["Саня", "Ваня"],
            "2 авиации": ["Саня", "Саня"],
            "суши": ["Митя"]
        }))
        .unwrap();
        assert_eq!(map.guests(), ["Саня", "Ваня", "Митя"]);
        assert_eq!(map.get("2 авиации").unwrap().len(), 2);
    }
}
