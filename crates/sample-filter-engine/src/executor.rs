//! 筛选执行器
//!
//! 按样本判断分两阶段：先对样本本身逐个判断样本级条件，任一不通过立即返回；
//! 再对子项目判断项目级条件，至少一个子项目同时满足全部项目级条件才通过。
//! 没有子项目的样本直接通过第二阶段。按项目判断时只有一个项目，不做展开。

use crate::filter::CompositeFilter;
use crate::models::{Sample, Scope, TestItem};
use lab_shared::config::FilterConfig;
use std::fmt;
use tracing::debug;

/// 条件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    OrderType,
    SampleType,
    Audit,
    Transmission,
    AiReview,
    Status,
    Qualitative,
    Recheck,
    ReagentLot,
    Alarm,
    ExaminationTime,
    SampleNumber,
    Barcode,
    PatientId,
    PatientName,
    Print,
    SampleAssays,
    ItemAssays,
    Dilution,
    Device,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OrderType => "order_type",
            Self::SampleType => "sample_type",
            Self::Audit => "audit",
            Self::Transmission => "transmission",
            Self::AiReview => "ai_review",
            Self::Status => "status",
            Self::Qualitative => "qualitative",
            Self::Recheck => "recheck",
            Self::ReagentLot => "reagent_lot",
            Self::Alarm => "alarm",
            Self::ExaminationTime => "examination_time",
            Self::SampleNumber => "sample_number",
            Self::Barcode => "barcode",
            Self::PatientId => "patient_id",
            Self::PatientName => "patient_name",
            Self::Print => "print",
            Self::SampleAssays => "sample_assays",
            Self::ItemAssays => "item_assays",
            Self::Dilution => "dilution",
            Self::Device => "device",
        };
        write!(f, "{}", s)
    }
}

/// 第一阶段：对样本本身判断
const SAMPLE_STAGE: [ConditionKind; 17] = [
    ConditionKind::OrderType,
    ConditionKind::SampleType,
    ConditionKind::Audit,
    ConditionKind::Transmission,
    ConditionKind::AiReview,
    ConditionKind::Status,
    ConditionKind::Qualitative,
    ConditionKind::Recheck,
    ConditionKind::ReagentLot,
    ConditionKind::Alarm,
    ConditionKind::ExaminationTime,
    ConditionKind::SampleNumber,
    ConditionKind::Barcode,
    ConditionKind::PatientId,
    ConditionKind::PatientName,
    ConditionKind::Print,
    ConditionKind::SampleAssays,
];

/// 第二阶段：对每个子项目判断
const ITEM_STAGE: [ConditionKind; 4] = [
    ConditionKind::ItemAssays,
    ConditionKind::ReagentLot,
    ConditionKind::Dilution,
    ConditionKind::Device,
];

/// 按项目判断时的条件，样本级的项目全包含条件不参与
const ITEM_CONTEXT: [ConditionKind; 19] = [
    ConditionKind::ItemAssays,
    ConditionKind::Dilution,
    ConditionKind::Device,
    ConditionKind::OrderType,
    ConditionKind::SampleType,
    ConditionKind::Audit,
    ConditionKind::Transmission,
    ConditionKind::AiReview,
    ConditionKind::Status,
    ConditionKind::Qualitative,
    ConditionKind::Recheck,
    ConditionKind::ReagentLot,
    ConditionKind::Alarm,
    ConditionKind::ExaminationTime,
    ConditionKind::SampleNumber,
    ConditionKind::Barcode,
    ConditionKind::PatientId,
    ConditionKind::PatientName,
    ConditionKind::Print,
];

/// 不通过的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// 某个条件不通过
    Condition(ConditionKind),
    /// 没有子项目满足全部项目级条件
    NoMatchingItem,
}

/// 判断结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub passed: bool,
    pub rejected_by: Option<Rejection>,
    /// 第二阶段中第一个满足条件的子项目在 `Sample::items` 中的位置
    pub matched_item: Option<usize>,
    pub evaluation_trace: Vec<String>,
}

impl FilterOutcome {
    fn passed() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }
}

/// 筛选执行器
pub struct FilterExecutor {
    /// 定性结果条件是否参与判断
    qualitative_enabled: bool,
    /// 是否记录评估追踪
    trace_enabled: bool,
}

impl FilterExecutor {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            qualitative_enabled: config.qualitative_enabled,
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 按样本判断
    pub fn evaluate_sample(&self, filter: &CompositeFilter, sample: &Sample) -> FilterOutcome {
        let mut outcome = FilterOutcome::passed();

        let scope = Scope::Sample(sample);
        if let Some(kind) =
            self.first_failure(filter, &SAMPLE_STAGE, scope, &mut outcome, "sample")
        {
            return self.reject(outcome, Rejection::Condition(kind), sample.id);
        }

        if sample.items.is_empty() {
            self.trace(&mut outcome, || "items: 无子项目，第二阶段直接通过".to_string());
            return outcome;
        }

        for (index, item) in sample.items.iter().enumerate() {
            let scope = Scope::Item { sample, item };
            let path = format!("items[{}]", index);
            if self.first_failure(filter, &ITEM_STAGE, scope, &mut outcome, &path).is_none() {
                self.trace(&mut outcome, || format!("items: 子项目 {} 满足全部项目级条件", index));
                outcome.matched_item = Some(index);
                return outcome;
            }
        }

        self.reject(outcome, Rejection::NoMatchingItem, sample.id)
    }

    /// 按项目判断
    pub fn evaluate_item(
        &self,
        filter: &CompositeFilter,
        sample: &Sample,
        item: &TestItem,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::passed();
        let scope = Scope::Item { sample, item };

        match self.first_failure(filter, &ITEM_CONTEXT, scope, &mut outcome, "item") {
            Some(kind) => self.reject(outcome, Rejection::Condition(kind), sample.id),
            None => outcome,
        }
    }

    pub fn is_sample_pass(&self, filter: &CompositeFilter, sample: &Sample) -> bool {
        self.evaluate_sample(filter, sample).passed
    }

    pub fn is_item_pass(&self, filter: &CompositeFilter, sample: &Sample, item: &TestItem) -> bool {
        self.evaluate_item(filter, sample, item).passed
    }

    /// 依次判断，返回第一个不通过的条件（短路）
    fn first_failure(
        &self,
        filter: &CompositeFilter,
        kinds: &[ConditionKind],
        scope: Scope<'_>,
        outcome: &mut FilterOutcome,
        path: &str,
    ) -> Option<ConditionKind> {
        for &kind in kinds {
            let matched = self.judge(filter, kind, &scope);
            self.trace(outcome, || {
                format!(
                    "{}: {} => {}",
                    path,
                    kind,
                    if matched { "MATCHED" } else { "NOT_MATCHED" }
                )
            });

            if !matched {
                return Some(kind);
            }
        }
        None
    }

    fn judge(&self, filter: &CompositeFilter, kind: ConditionKind, scope: &Scope<'_>) -> bool {
        let sample = scope.sample();
        match kind {
            ConditionKind::OrderType => filter.order_type.is_pass(scope),
            ConditionKind::SampleType => filter.sample_type.is_pass(scope),
            ConditionKind::Audit => filter.audit.is_pass(scope),
            ConditionKind::Transmission => filter.transmission.is_pass(scope),
            ConditionKind::AiReview => filter.ai_review.is_pass(scope),
            ConditionKind::Status => filter.status.is_pass(scope),
            ConditionKind::Qualitative => {
                !self.qualitative_enabled || filter.qualitative.is_pass(scope)
            }
            ConditionKind::Recheck => filter.recheck.is_pass(scope),
            ConditionKind::ReagentLot => filter.reagent_lot.is_pass(scope),
            ConditionKind::Alarm => filter.alarm.is_pass(scope),
            ConditionKind::ExaminationTime => filter.examination_time.is_pass(scope),
            ConditionKind::SampleNumber => filter.sample_number.is_pass(sample),
            ConditionKind::Barcode => filter.barcode.is_pass(sample),
            ConditionKind::PatientId => filter.patient_id.is_pass(sample),
            ConditionKind::PatientName => filter.patient_name.is_pass(sample),
            ConditionKind::Print => filter.print.is_pass(scope),
            ConditionKind::SampleAssays => filter.sample_assays.is_pass(sample),
            ConditionKind::ItemAssays => scope
                .item()
                .is_none_or(|item| filter.item_assays.is_pass(item)),
            ConditionKind::Dilution => filter.dilution.is_pass(scope),
            ConditionKind::Device => scope.item().is_none_or(|item| filter.device.is_pass(item)),
        }
    }

    fn reject(
        &self,
        mut outcome: FilterOutcome,
        rejection: Rejection,
        sample_id: i64,
    ) -> FilterOutcome {
        debug!(sample_id, ?rejection, "样本未通过筛选");
        outcome.passed = false;
        outcome.rejected_by = Some(rejection);
        outcome
    }

    fn trace(&self, outcome: &mut FilterOutcome, line: impl FnOnce() -> String) {
        if self.trace_enabled {
            outcome.evaluation_trace.push(line());
        }
    }
}

impl Default for FilterExecutor {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
