//! 组合筛选条件
//!
//! 一个 `CompositeFilter` 聚合全部条件类别。类别之间是"与"的关系，
//! 类别内部的选项之间是"或"的关系，判断逻辑见 [`crate::executor`]。

use crate::conditions::{
    AssayCondition, AssayItemCondition, BarcodeCondition, ConditionState, DeviceCondition,
    FlagCondition, PatientCondition, PatientIdField, PatientNameField, ReagentLotCondition,
    SampleNumberCondition, TimeRangeCondition,
};
use crate::directory::ProjectDirectory;
use crate::models::ViewMode;
use crate::options::{
    AiReviewOption, AlarmOption, AuditOption, DilutionOption, OrderType, PrintOption,
    QualitativeOption, RecheckOption, SampleTypeOption, StatusOption, TransmissionOption,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 实时筛选条件的序号
pub const LIVE_INDEX: usize = 0;

/// 组合筛选条件
///
/// `index` 为 0 表示实时筛选，1..=5 表示快捷筛选，不参与持久化，加载时按位置重新分配。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeFilter {
    pub name: String,
    pub enabled: bool,
    #[serde(skip)]
    pub index: usize,

    pub order_type: FlagCondition<OrderType>,
    pub status: FlagCondition<StatusOption>,
    pub sample_type: FlagCondition<SampleTypeOption>,
    pub audit: FlagCondition<AuditOption>,
    pub recheck: FlagCondition<RecheckOption>,
    pub alarm: FlagCondition<AlarmOption>,
    pub dilution: FlagCondition<DilutionOption>,
    pub print: FlagCondition<PrintOption>,
    pub transmission: FlagCondition<TransmissionOption>,
    pub ai_review: FlagCondition<AiReviewOption>,
    pub qualitative: FlagCondition<QualitativeOption>,

    pub reagent_lot: ReagentLotCondition,
    pub examination_time: TimeRangeCondition,
    pub sample_number: SampleNumberCondition,
    pub barcode: BarcodeCondition,
    pub device: DeviceCondition,
    pub patient_id: PatientCondition<PatientIdField>,
    pub patient_name: PatientCondition<PatientNameField>,

    /// 按样本显示时的项目条件（全包含）
    pub sample_assays: AssayCondition,
    /// 按项目显示时的项目条件（属于）
    pub item_assays: AssayItemCondition,
}

/// 条件数目与描述汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSummary {
    pub count: usize,
    /// 每个非空条件一行
    pub description: String,
}

impl CompositeFilter {
    /// 空的实时筛选条件
    pub fn live() -> Self {
        Self::default()
    }

    /// 空的快捷筛选条件
    pub fn preset(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_live(&self) -> bool {
        self.index == LIVE_INDEX
    }

    /// 同时设置样本级和项目级的项目条件
    pub fn set_assays(&mut self, codes: BTreeSet<i32>, directory: &dyn ProjectDirectory) {
        self.sample_assays.select(codes.clone(), directory);
        self.item_assays.select(codes, directory);
    }

    /// 清空全部条件，保留名称、启用状态和序号
    pub fn reset(&mut self) {
        for condition in self.conditions_mut() {
            condition.reset();
        }
    }

    /// 按显示顺序排列的条件
    fn display_order(&self, view: ViewMode, qualitative_enabled: bool) -> Vec<&dyn ConditionState> {
        let leading: [&dyn ConditionState; 15] = [
            &self.examination_time,
            &self.sample_number,
            &self.barcode,
            &self.device,
            &self.patient_id,
            &self.patient_name,
            &self.reagent_lot,
            &self.order_type,
            &self.sample_type,
            &self.dilution,
            &self.status,
            &self.transmission,
            &self.ai_review,
            &self.recheck,
            &self.audit,
        ];

        let mut conditions = leading.to_vec();
        if qualitative_enabled {
            conditions.push(&self.qualitative);
        }
        conditions.push(&self.print);
        conditions.push(&self.alarm);
        match view {
            ViewMode::BySample => conditions.push(&self.sample_assays),
            ViewMode::ByItem => conditions.push(&self.item_assays),
        }
        conditions
    }

    fn conditions_mut(&mut self) -> [&mut dyn ConditionState; 20] {
        [
            &mut self.examination_time,
            &mut self.sample_number,
            &mut self.barcode,
            &mut self.device,
            &mut self.patient_id,
            &mut self.patient_name,
            &mut self.reagent_lot,
            &mut self.order_type,
            &mut self.sample_type,
            &mut self.dilution,
            &mut self.status,
            &mut self.transmission,
            &mut self.ai_review,
            &mut self.recheck,
            &mut self.audit,
            &mut self.qualitative,
            &mut self.print,
            &mut self.alarm,
            &mut self.sample_assays,
            &mut self.item_assays,
        ]
    }

    /// 汇总条件数目和描述
    pub fn summary(&self, view: ViewMode, qualitative_enabled: bool) -> ConditionSummary {
        let conditions = self.display_order(view, qualitative_enabled);

        let count = conditions.iter().map(|c| c.count()).sum();
        let description = conditions
            .iter()
            .map(|c| c.description())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        ConditionSummary { count, description }
    }

    /// 是否未设置任何条件（不论显示粒度和定性开关）
    pub fn has_no_conditions(&self) -> bool {
        self.display_order(ViewMode::BySample, true)
            .iter()
            .all(|c| c.is_empty())
            && self.item_assays.is_empty()
    }

    /// 空白的快捷筛选位：无名称、未启用、无条件
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && !self.enabled && self.has_no_conditions()
    }
}
