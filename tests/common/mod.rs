#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use bill_split_ai::gateway::{CompletionGateway, CompletionRequest};
use bill_split_ai::models::{GuestMentionMap, LineItem, Order};
use bill_split_ai::Result;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// 按请求内容应答的假网关，记录所有请求
pub struct FnGateway<F> {
    responder: F,
    pub calls: Mutex<Vec<CompletionRequest>>,
}

impl<F> FnGateway<F>
where
    F: Fn(&CompletionRequest) -> Result<String> + Send + Sync,
{
    pub fn new(responder: F) -> Arc<Self> {
        Arc::new(Self {
            responder,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl<F> CompletionGateway for FnGateway<F>
where
    F: Fn(&CompletionRequest) -> Result<String> + Send + Sync,
{
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

/// 永不返回的网关，用于验证取消
pub struct PendingGateway {
    pub dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionGateway for PendingGateway {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending::<Result<String>>().await
    }
}

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn item(id: u32, name: &str, price: &str, count: u32, total: &str) -> LineItem {
    LineItem {
        id,
        name: name.to_string(),
        price: dec(price),
        count,
        total: dec(total),
    }
}

/// 示例账单: Aviation x3, Cezar Roll, Sushi salmon, Pepperoni, Margarita
pub fn table_order() -> Order {
    Order {
        items: vec![
            item(1, "Aviation", "12.50", 3, "37.50"),
            item(2, "Cezar Roll", "9.99", 1, "9.99"),
            item(3, "Sushi salmon", "14.00", 1, "14.00"),
            item(4, "Pepperoni", "15.00", 1, "15.00"),
            item(5, "Margarita", "12.00", 1, "12.00"),
        ],
        grand_total: dec("88.49"),
    }
}

pub fn mentions(entries: &[(&str, &[&str])]) -> GuestMentionMap {
    entries
        .iter()
        .map(|(mention, guests)| {
            (
                mention.to_string(),
                guests.iter().map(|g| g.to_string()).collect(),
            )
        })
        .collect()
}

/// 整桌一次性描述
pub fn table_mentions() -> GuestMentionMap {
    mentions(&[
        ("2 авиации", &["Саня"]),
        ("цезарь ролл", &["Ваня"]),
        ("1 авиация", &["Вика"]),
        ("суши с сососем", &["Митя"]),
        ("пицца пепперони", &["Вика", "Лера"]),
        ("пицца маргарита", &["Саня", "Ваня", "Митя"]),
    ])
}

pub const TABLE_ALIGNMENT: &str = r#"[
  {"id": 1, "guests": ["Саня", "Саня", "Вика"]},
  {"id": 2, "guests": ["Ваня"]},
  {"id": 3, "guests": ["Митя"]},
  {"id": 4, "guests": ["Вика", "Лера"]},
  {"id": 5, "guests": ["Саня", "Ваня", "Митя"]}
]"#;
