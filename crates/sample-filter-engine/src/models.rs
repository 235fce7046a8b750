//! 筛选引擎领域模型
//!
//! 样本与项目记录由外部存储提供，引擎只读取其中参与筛选判断的字段。

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 样本类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleCategory {
    Patient,
    Calibrator,
    QualityControl,
}

/// 样本来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    SerumPlasma,
    WholeBlood,
    Urine,
    Effusion,
    CerebrospinalFluid,
    Other,
}

/// 样本或项目的检测状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Pending,
    Testing,
    Tested,
}

/// 吸样量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuckVolType {
    Standard,
    Decrease,
    Increase,
}

/// 定性判断结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualJudge {
    Positive,
    Negative,
}

/// 样本（检测申请）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: i64,
    /// 样本号，可能包含非数字字符
    pub seq_no: String,
    pub barcode: String,
    pub category: Option<SampleCategory>,
    /// 急诊标记
    #[serde(default)]
    pub stat: bool,
    pub source_type: Option<SourceType>,
    pub status: Option<TestStatus>,
    #[serde(default)]
    pub audit: bool,
    #[serde(default)]
    pub printed: bool,
    #[serde(default)]
    pub uploaded: bool,
    pub patient_id: Option<i64>,
    pub end_test_time: Option<NaiveDateTime>,
    pub end_retest_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub items: Vec<TestItem>,
}

impl Sample {
    /// 样本下所有项目的项目编号
    pub fn assay_codes(&self) -> BTreeSet<i32> {
        self.items.iter().map(|item| item.assay_code).collect()
    }

    /// 样本已使用的试剂批号（各项目批号的并集）
    pub fn reagent_lots(&self) -> BTreeSet<&str> {
        self.items
            .iter()
            .flat_map(|item| item.reagent_lots.iter().map(String::as_str))
            .collect()
    }
}

/// 项目（样本上的一次检测）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    pub id: i64,
    pub assay_code: i32,
    pub device_sn: Option<String>,
    #[serde(default)]
    pub module_index: i32,
    pub status: Option<TestStatus>,
    pub end_time: Option<NaiveDateTime>,
    pub retest_end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub rerun: bool,
    /// 复查结果的键，大于 0 时视为已有复查
    pub recheck_result_key: Option<i64>,
    #[serde(default)]
    pub result_status_codes: String,
    #[serde(default)]
    pub retest_result_status_codes: String,
    #[serde(default)]
    pub reagent_lots: Vec<String>,
    pub suck_vol_type: Option<SuckVolType>,
    pub dilution_factor: Option<i32>,
    pub pre_dilution_factor: Option<i32>,
    pub first_qual: Option<QualJudge>,
    pub retest_qual: Option<QualJudge>,
    pub ai_flagged: Option<bool>,
}

impl TestItem {
    /// 是否有复查（设置了 rerun 或已有复查结果）
    pub fn has_recheck(&self) -> bool {
        self.rerun || self.recheck_result_key.is_some_and(|key| key > 0)
    }

    /// 首测或复查是否有数据报警
    pub fn has_alarm(&self) -> bool {
        !self.result_status_codes.is_empty() || !self.retest_result_status_codes.is_empty()
    }

    /// 首测或复查的定性结果是否为指定值
    pub fn has_qualitative(&self, judge: QualJudge) -> bool {
        self.first_qual == Some(judge) || self.retest_qual == Some(judge)
    }

    /// 是否机外稀释（手工稀释）
    pub fn is_pre_diluted(&self) -> bool {
        self.pre_dilution_factor.is_some_and(|factor| factor > 1)
    }
}

/// 条件判断时的记录上下文
///
/// 每次判断都显式传入，条件本身不持有任何记录引用。
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// 按样本判断，项目相关的条件在全部子项目上聚合
    Sample(&'a Sample),
    /// 按项目判断，样本级字段取自所属样本
    Item {
        sample: &'a Sample,
        item: &'a TestItem,
    },
}

impl<'a> Scope<'a> {
    pub fn sample(&self) -> &'a Sample {
        match *self {
            Scope::Sample(sample) => sample,
            Scope::Item { sample, .. } => sample,
        }
    }

    pub fn item(&self) -> Option<&'a TestItem> {
        match *self {
            Scope::Sample(_) => None,
            Scope::Item { item, .. } => Some(item),
        }
    }

    /// 当前粒度下参与聚合的项目：按样本时为全部子项目，按项目时只有该项目
    pub fn items(&self) -> std::slice::Iter<'a, TestItem> {
        match *self {
            Scope::Sample(sample) => sample.items.iter(),
            Scope::Item { item, .. } => std::slice::from_ref(item).iter(),
        }
    }
}

/// 消费方的显示粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    BySample,
    ByItem,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: i32, lots: &[&str]) -> TestItem {
        TestItem {
            assay_code: code,
            reagent_lots: lots.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_aggregates() {
        let sample = Sample {
            items: vec![item(1, &["L1", "L2"]), item(2, &["L2", "L3"])],
            ..Default::default()
        };

        assert_eq!(sample.assay_codes(), BTreeSet::from([1, 2]));
        assert_eq!(sample.reagent_lots(), BTreeSet::from(["L1", "L2", "L3"]));
    }

    #[test]
    fn test_recheck_key_must_be_positive() {
        let mut item = TestItem::default();
        assert!(!item.has_recheck());

        item.recheck_result_key = Some(0);
        assert!(!item.has_recheck());

        item.recheck_result_key = Some(12);
        assert!(item.has_recheck());

        item.recheck_result_key = None;
        item.rerun = true;
        assert!(item.has_recheck());
    }

    #[test]
    fn test_qualitative_checks_first_and_retest() {
        let item = TestItem {
            first_qual: Some(QualJudge::Negative),
            retest_qual: Some(QualJudge::Positive),
            ..Default::default()
        };

        assert!(item.has_qualitative(QualJudge::Negative));
        assert!(item.has_qualitative(QualJudge::Positive));
    }

    #[test]
    fn test_scope_items() {
        let sample = Sample {
            items: vec![item(1, &[]), item(2, &[])],
            ..Default::default()
        };

        assert_eq!(Scope::Sample(&sample).items().count(), 2);

        let scope = Scope::Item {
            sample: &sample,
            item: &sample.items[1],
        };
        assert_eq!(scope.items().count(), 1);
        assert_eq!(scope.item().map(|i| i.assay_code), Some(2));
        assert_eq!(scope.sample().items.len(), 2);
    }

    #[test]
    fn test_sample_deserialization_defaults() {
        let json = r#"
        {
            "id": 7,
            "seq_no": "0012",
            "barcode": "ABC001",
            "category": "patient",
            "source_type": "serum_plasma",
            "status": "tested",
            "patient_id": null,
            "end_test_time": "2024-01-15T10:00:00",
            "end_retest_time": null
        }
        "#;

        let sample: Sample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.category, Some(SampleCategory::Patient));
        assert!(!sample.stat);
        assert!(sample.items.is_empty());
        assert!(sample.end_test_time.is_some());
    }
}
