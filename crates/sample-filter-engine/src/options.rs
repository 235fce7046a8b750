//! 多选条件的选项定义
//!
//! 每个多选条件对应一个封闭枚举，枚举值的判定规则用穷尽匹配实现，
//! 增删选项时编译器会检查所有分支。

use crate::models::{
    QualJudge, SampleCategory, Scope, SourceType, SuckVolType, TestItem, TestStatus,
};
use std::fmt;

/// 多选条件的选项
///
/// 选项在位集中的位置由 `position` 决定，`ALL` 按位置顺序列出全部选项。
pub trait FlagOption: Copy + Eq + fmt::Debug + 'static {
    /// 条件标题，用于生成条件描述
    const TITLE: &'static str;

    /// 全部选项，下标即位置
    const ALL: &'static [Self];

    /// 选项在位集中的位置
    fn position(self) -> usize;

    /// 选项显示名称
    fn label(self) -> &'static str;

    /// 记录在当前上下文中是否属于该选项
    fn holds(self, scope: &Scope<'_>) -> bool;

    /// 根据位置查找选项
    fn from_position(position: usize) -> Option<Self> {
        Self::ALL.get(position).copied()
    }
}

/// 订单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Routine = 0,
    Emergency = 1,
    Calibrator = 2,
    QualityControl = 3,
}

impl FlagOption for OrderType {
    const TITLE: &'static str = "订单类型";
    const ALL: &'static [Self] = &[
        Self::Routine,
        Self::Emergency,
        Self::Calibrator,
        Self::QualityControl,
    ];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Routine => "常规",
            Self::Emergency => "急诊",
            Self::Calibrator => "校准",
            Self::QualityControl => "质控",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let sample = scope.sample();
        let derived = match sample.category {
            Some(SampleCategory::Patient) if sample.stat => Self::Emergency,
            Some(SampleCategory::Patient) => Self::Routine,
            Some(SampleCategory::Calibrator) => Self::Calibrator,
            Some(SampleCategory::QualityControl) => Self::QualityControl,
            None => return false,
        };
        derived == self
    }
}

/// 检测状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusOption {
    Pending = 0,
    Testing = 1,
    Tested = 2,
}

impl FlagOption for StatusOption {
    const TITLE: &'static str = "状态";
    const ALL: &'static [Self] = &[Self::Pending, Self::Testing, Self::Tested];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Pending => "待测",
            Self::Testing => "检测中",
            Self::Tested => "已完成",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let status = match scope.item() {
            Some(item) => item.status,
            None => scope.sample().status,
        };
        let expected = match self {
            Self::Pending => TestStatus::Pending,
            Self::Testing => TestStatus::Testing,
            Self::Tested => TestStatus::Tested,
        };
        status == Some(expected)
    }
}

/// 样本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleTypeOption {
    SerumPlasma = 0,
    WholeBlood = 1,
    Urine = 2,
    Effusion = 3,
    CerebrospinalFluid = 4,
    Other = 5,
}

impl FlagOption for SampleTypeOption {
    const TITLE: &'static str = "样本类型";
    const ALL: &'static [Self] = &[
        Self::SerumPlasma,
        Self::WholeBlood,
        Self::Urine,
        Self::Effusion,
        Self::CerebrospinalFluid,
        Self::Other,
    ];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::SerumPlasma => "血清/血浆",
            Self::WholeBlood => "全血",
            Self::Urine => "尿液",
            Self::Effusion => "浆膜腔积液",
            Self::CerebrospinalFluid => "脑脊液",
            Self::Other => "其他",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let expected = match self {
            Self::SerumPlasma => SourceType::SerumPlasma,
            Self::WholeBlood => SourceType::WholeBlood,
            Self::Urine => SourceType::Urine,
            Self::Effusion => SourceType::Effusion,
            Self::CerebrospinalFluid => SourceType::CerebrospinalFluid,
            Self::Other => SourceType::Other,
        };
        scope.sample().source_type == Some(expected)
    }
}

/// 审核状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditOption {
    Audited = 0,
    NotAudited = 1,
}

impl FlagOption for AuditOption {
    const TITLE: &'static str = "审核";
    const ALL: &'static [Self] = &[Self::Audited, Self::NotAudited];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Audited => "已审核",
            Self::NotAudited => "未审核",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let audited = scope.sample().audit;
        match self {
            Self::Audited => audited,
            Self::NotAudited => !audited,
        }
    }
}

/// 打印状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrintOption {
    Printed = 0,
    NotPrinted = 1,
}

impl FlagOption for PrintOption {
    const TITLE: &'static str = "打印";
    const ALL: &'static [Self] = &[Self::Printed, Self::NotPrinted];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Printed => "已打印",
            Self::NotPrinted => "未打印",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let printed = scope.sample().printed;
        match self {
            Self::Printed => printed,
            Self::NotPrinted => !printed,
        }
    }
}

/// 传输状态（是否已发送 LIS）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransmissionOption {
    Sent = 0,
    NotSent = 1,
}

impl FlagOption for TransmissionOption {
    const TITLE: &'static str = "传输";
    const ALL: &'static [Self] = &[Self::Sent, Self::NotSent];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Sent => "已传输",
            Self::NotSent => "未传输",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let uploaded = scope.sample().uploaded;
        match self {
            Self::Sent => uploaded,
            Self::NotSent => !uploaded,
        }
    }
}

/// AI 识别结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiReviewOption {
    Flagged = 0,
    NotFlagged = 1,
}

impl FlagOption for AiReviewOption {
    const TITLE: &'static str = "AI识别";
    const ALL: &'static [Self] = &[Self::Flagged, Self::NotFlagged];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Flagged => "有标记",
            Self::NotFlagged => "无标记",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let flagged = scope.items().any(|item| item.ai_flagged == Some(true));
        match self {
            Self::Flagged => flagged,
            Self::NotFlagged => !flagged,
        }
    }
}

/// 复查状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecheckOption {
    HasRecheck = 0,
    NoRecheck = 1,
}

impl FlagOption for RecheckOption {
    const TITLE: &'static str = "复查";
    const ALL: &'static [Self] = &[Self::HasRecheck, Self::NoRecheck];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::HasRecheck => "有复查",
            Self::NoRecheck => "无复查",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let rechecked = scope.items().any(TestItem::has_recheck);
        match self {
            Self::HasRecheck => rechecked,
            Self::NoRecheck => !rechecked,
        }
    }
}

/// 数据报警
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmOption {
    HasAlarm = 0,
    NoAlarm = 1,
}

impl FlagOption for AlarmOption {
    const TITLE: &'static str = "数据报警";
    const ALL: &'static [Self] = &[Self::HasAlarm, Self::NoAlarm];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::HasAlarm => "有报警",
            Self::NoAlarm => "无报警",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let alarmed = scope.items().any(TestItem::has_alarm);
        match self {
            Self::HasAlarm => alarmed,
            Self::NoAlarm => !alarmed,
        }
    }
}

/// 定性结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualitativeOption {
    Positive = 0,
    Negative = 1,
}

impl FlagOption for QualitativeOption {
    const TITLE: &'static str = "定性结果";
    const ALL: &'static [Self] = &[Self::Positive, Self::Negative];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Positive => "阳性",
            Self::Negative => "阴性",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        let judge = match self {
            Self::Positive => QualJudge::Positive,
            Self::Negative => QualJudge::Negative,
        };
        scope.items().any(|item| item.has_qualitative(judge))
    }
}

/// 稀释状态
///
/// 按样本判断时，任一子项目满足即成立。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DilutionOption {
    Undiluted = 0,
    InnerDilution = 1,
    InnerIncrease = 2,
    Manual = 3,
}

impl DilutionOption {
    fn holds_for(self, item: &TestItem) -> bool {
        let unit_factor = item.dilution_factor == Some(1);
        match self {
            // 常量稀释即未稀释
            Self::Undiluted => {
                !item.is_pre_diluted()
                    && item.suck_vol_type == Some(SuckVolType::Standard)
                    && unit_factor
            }
            // 减量或倍数稀释
            Self::InnerDilution => {
                (item.suck_vol_type == Some(SuckVolType::Decrease) && unit_factor)
                    || item.dilution_factor.is_some_and(|factor| factor > 1)
            }
            Self::InnerIncrease => item.suck_vol_type == Some(SuckVolType::Increase) && unit_factor,
            Self::Manual => item.is_pre_diluted(),
        }
    }
}

impl FlagOption for DilutionOption {
    const TITLE: &'static str = "稀释状态";
    const ALL: &'static [Self] = &[
        Self::Undiluted,
        Self::InnerDilution,
        Self::InnerIncrease,
        Self::Manual,
    ];

    fn position(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Self::Undiluted => "未稀释",
            Self::InnerDilution => "机内稀释",
            Self::InnerIncrease => "机内增量",
            Self::Manual => "手工稀释",
        }
    }

    fn holds(self, scope: &Scope<'_>) -> bool {
        scope.items().any(|item| self.holds_for(item))
    }
}
