use crate::decoder::decode;
use crate::error::{Result, SplitError};
use crate::gateway::{CompletionGateway, CompletionRequest, ModelProfile};
use crate::models::{AlignmentRecord, AlignmentResult, DigestItem, GuestMentionMap, Order};
use crate::prompts::alignment::{render_context, SYSTEM};
use crate::prompts::PROMPT_VERSION;
use dashmap::DashMap;
use futures::future::try_join_all;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 缓存键: (提示词版本, 精简账单, 客人提及)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AlignmentKey {
    prompt_version: &'static str,
    digest: Vec<DigestItem>,
    mentions: Vec<(String, Vec<String>)>,
}

/// 有上限的结果缓存，满了随机淘汰一条
struct AlignmentCache {
    entries: DashMap<AlignmentKey, AlignmentResult>,
    capacity: usize,
}

impl AlignmentCache {
    fn get(&self, key: &AlignmentKey) -> Option<AlignmentResult> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    fn insert(&self, key: AlignmentKey, result: AlignmentResult) {
        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            // 先拿到键再删除，不能在持有迭代器引用时 remove
            let victim = self.entries.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(key, result);
    }
}

/// 对齐服务
/// 语义匹配交给模型，id 覆盖等不变量在这里独立校验
pub struct Aligner {
    gateway: Arc<dyn CompletionGateway>,
    cache: Option<AlignmentCache>,
}

impl Aligner {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway, cache: None }
    }

    /// 相同输入复用结果 (模型调用是确定性的)，最多保留 capacity 条
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = Some(AlignmentCache {
            entries: DashMap::new(),
            capacity,
        });
        self
    }

    pub async fn align(&self, guest_mentions: &GuestMentionMap, order: &Order) -> Result<AlignmentResult> {
        order.validate()?;
        let result = self.align_validated(guest_mentions, order).await?;
        // 单份描述只是部分视角，数量差异只在 debug 级别记录
        log_discrepancies(&result, order, tracing::Level::DEBUG);
        Ok(result)
    }

    /// 多位客人: 每份描述单独对齐 (并发)，再按 id 拼接
    pub async fn align_all(&self, guest_mentions: &[GuestMentionMap], order: &Order) -> Result<AlignmentResult> {
        order.validate()?;
        tracing::info!(
            "Aligning {} description(s) against {} item(s) with prompts {}",
            guest_mentions.len(),
            order.items.len(),
            PROMPT_VERSION
        );
        let parts = try_join_all(guest_mentions.iter().map(|m| self.align_validated(m, order))).await?;
        let merged = AlignmentResult::concat(order, parts);
        log_discrepancies(&merged, order, tracing::Level::WARN);
        Ok(merged)
    }

    async fn align_validated(&self, guest_mentions: &GuestMentionMap, order: &Order) -> Result<AlignmentResult> {
        let digest = order.digest();

        // 无需调用模型的情况
        if digest.is_empty() || guest_mentions.is_empty() {
            return Ok(AlignmentResult::concat(order, std::iter::empty()));
        }

        let key = AlignmentKey {
            prompt_version: PROMPT_VERSION,
            digest,
            mentions: guest_mentions.entries(),
        };
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            tracing::debug!("Alignment cache hit for {} item(s)", key.digest.len());
            return Ok(hit);
        }

        let request = CompletionRequest::text(
            SYSTEM,
            Value::String(render_context(guest_mentions, &key.digest)),
            ModelProfile::DeepText,
        );
        let raw = self.gateway.complete(&request).await?;
        let result = parse_alignment(&decode(&raw)?, order)?;

        if let Some(cache) = &self.cache {
            cache.insert(key, result.clone());
        }
        Ok(result)
    }
}

fn log_discrepancies(result: &AlignmentResult, order: &Order, level: tracing::Level) {
    for d in result.discrepancies(order) {
        if level == tracing::Level::WARN {
            tracing::warn!("Item {} ({}): billed {}, attributed {}", d.id, d.name, d.billed, d.attributed);
        } else {
            tracing::debug!("Item {} ({}): billed {}, attributed {}", d.id, d.name, d.billed, d.attributed);
        }
    }
}

/// 校验模型输出: 每个账单 id 恰好一条，不多不少；结果按账单顺序返回
pub fn parse_alignment(value: &Value, order: &Order) -> Result<AlignmentResult> {
    let records = value
        .as_array()
        .ok_or_else(|| SplitError::schema("alignment must be a JSON array of {id, guests}"))?;

    let canonical: BTreeSet<u32> = order.ids().into_iter().collect();
    let mut by_id: IndexMap<u32, Vec<String>> = IndexMap::with_capacity(records.len());

    for (idx, raw) in records.iter().enumerate() {
        let fields = raw
            .as_object()
            .ok_or_else(|| SplitError::schema(format!("alignment record #{} is not an object", idx + 1)))?;
        let id = fields
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| SplitError::schema(format!("alignment record #{} has no integer id", idx + 1)))?;
        let guests = match fields.get("guests") {
            // null 视为未解析
            Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|g| {
                    g.as_str().map(str::to_string).ok_or_else(|| {
                        SplitError::schema(format!("alignment for id {} has a non-string guest {}", id, g))
                    })
                })
                .collect::<Result<Vec<String>>>()?,
            _ => {
                return Err(SplitError::schema(format!(
                    "alignment for id {} is missing the guests list",
                    id
                )))
            }
        };

        if !canonical.contains(&id) {
            return Err(SplitError::schema(format!("alignment returned unknown id {}", id)));
        }
        if by_id.insert(id, guests).is_some() {
            return Err(SplitError::schema(format!("alignment returned id {} more than once", id)));
        }
    }

    let missing: Vec<u32> = canonical
        .iter()
        .filter(|id| !by_id.contains_key(*id))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(SplitError::schema(format!("alignment is missing ids {:?}", missing)));
    }

    Ok(AlignmentResult::new(
        order
            .items
            .iter()
            .map(|item| AlignmentRecord {
                id: item.id,
                guests: by_id.swap_remove(&item.id).unwrap_or_default(),
            })
            .collect(),
    ))
}
