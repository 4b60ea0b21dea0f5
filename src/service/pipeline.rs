use super::aligner::Aligner;
use super::bill_recognition::BillRecognizer;
use super::guest_extraction::{transcribe_description, MentionExtractor};
use super::split::split_costs;
use crate::config::AppConfig;
use crate::error::{Result, SplitError};
use crate::gateway::{CompletionGateway, Transcriber};
use crate::models::money::from_f64;
use crate::prompts::PROMPT_VERSION;
use crate::models::{AlignmentResult, CostSplit, CountDiscrepancy, GuestMentionMap, Order, TotalsReport};
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// 对账结果 (对齐 + 数量差异 + 金额核对 + 分账)
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub alignment: AlignmentResult,
    pub discrepancies: Vec<CountDiscrepancy>,
    pub totals: TotalsReport,
    pub split: CostSplit,
    /// 产生该结果的提示词版本
    pub prompt_version: &'static str,
}

/// 分账服务: 组合三个任务，网关与配置在构造时注入
pub struct SplitService {
    recognizer: BillRecognizer,
    extractor: MentionExtractor,
    aligner: Aligner,
    transcriber: Option<Arc<dyn Transcriber>>,
    config: AppConfig,
    tolerance: BigDecimal,
}

impl SplitService {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        transcriber: Option<Arc<dyn Transcriber>>,
        config: AppConfig,
    ) -> Self {
        let aligner = Aligner::new(gateway.clone());
        let aligner = if config.reconcile.cache_alignments {
            aligner.with_cache(config.reconcile.cache_capacity)
        } else {
            aligner
        };

        Self {
            recognizer: BillRecognizer::new(gateway.clone()),
            extractor: MentionExtractor::new(gateway),
            aligner,
            transcriber,
            tolerance: from_f64(config.reconcile.tolerance),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn recognize_bill(&self, image_path: &Path) -> Result<Order> {
        self.recognizer
            .recognize_bill(image_path, &self.config.image)
            .await
    }

    pub async fn extract_guest_mentions(&self, description_text: &str) -> Result<GuestMentionMap> {
        self.extractor.extract_guest_mentions(description_text).await
    }

    pub async fn transcribe_description(&self, audio_path: &Path, prompt: Option<&str>) -> Result<String> {
        let transcriber = self
            .transcriber
            .as_deref()
            .ok_or_else(|| SplitError::Unsupported("no transcription backend configured".to_string()))?;
        transcribe_description(transcriber, audio_path, prompt).await
    }

    pub async fn align(&self, guest_mentions: &GuestMentionMap, order: &Order) -> Result<AlignmentResult> {
        self.aligner.align(guest_mentions, order).await
    }

    pub fn check_totals(&self, order: &Order) -> TotalsReport {
        order.check_totals(&self.tolerance)
    }

    /// 多位客人的描述对齐到同一张账单，并给出分账
    pub async fn reconcile(&self, order: &Order, guest_mentions: &[GuestMentionMap]) -> Result<Reconciliation> {
        let totals = self.check_totals(order);
        if !totals.is_consistent() {
            tracing::warn!(
                "Bill totals are inconsistent: {} line mismatch(es), grand total delta {}",
                totals.line_mismatches.len(),
                totals.grand_total_delta
            );
        }

        let alignment = self.aligner.align_all(guest_mentions, order).await?;
        let discrepancies = alignment.discrepancies(order);
        let split = split_costs(order, &alignment);

        tracing::info!(
            "Reconciled {} item(s) for {} guest(s), {} discrepancy(ies)",
            order.items.len(),
            split.shares.len(),
            discrepancies.len()
        );

        Ok(Reconciliation {
            alignment,
            discrepancies,
            totals,
            split,
            prompt_version: PROMPT_VERSION,
        })
    }
}
