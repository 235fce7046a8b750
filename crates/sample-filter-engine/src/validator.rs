//! 保存前校验
//!
//! 校验失败时不修改任何已保存的状态。

use crate::conditions::{RangeBounds, parse_time};
use crate::error::ValidationError;
use crate::filter::CompositeFilter;
use crate::models::ViewMode;
use lab_shared::config::FilterConfig;
use std::collections::HashSet;

type Result<T> = std::result::Result<T, ValidationError>;

/// 筛选条件校验器
pub struct FilterValidator {
    qualitative_enabled: bool,
}

impl FilterValidator {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            qualitative_enabled: config.qualitative_enabled,
        }
    }

    /// 实时筛选：至少一个条件，范围有序
    pub fn validate_live(&self, filter: &CompositeFilter) -> Result<()> {
        self.validate_not_empty(filter)?;
        self.validate_ranges(filter)
    }

    /// 快捷筛选：名称非空，至少一个条件，范围有序
    pub fn validate_preset(&self, filter: &CompositeFilter) -> Result<()> {
        if filter.name.trim().is_empty() {
            return Err(ValidationError::EmptyPresetName {
                index: filter.index,
            });
        }

        self.validate_not_empty(filter)?;
        self.validate_ranges(filter)
    }

    /// 校验全部快捷筛选
    ///
    /// 空白位置跳过，其余逐个校验，名称在非空白位置之间必须唯一。
    pub fn validate_presets(&self, presets: &[CompositeFilter]) -> Result<()> {
        let mut names = HashSet::new();

        for preset in presets.iter().filter(|p| !p.is_blank()) {
            self.validate_preset(preset)?;

            let name = preset.name.trim();
            if !names.insert(name) {
                return Err(ValidationError::DuplicatePresetName {
                    name: name.to_string(),
                });
            }
        }

        Ok(())
    }

    /// 范围条件：样本号和条码不能倒置，检测时间必须成对且可解析
    pub fn validate_ranges(&self, filter: &CompositeFilter) -> Result<()> {
        filter.sample_number.check_order()?;
        filter.barcode.check_order()?;
        Self::validate_time_range(filter.examination_time.bounds())
    }

    fn validate_time_range(bounds: &RangeBounds) -> Result<()> {
        if bounds.is_empty() {
            return Ok(());
        }
        if bounds.start.is_empty() || bounds.end.is_empty() {
            return Err(ValidationError::IncompleteTimeRange);
        }

        let parse = |value: &str| {
            parse_time(value).ok_or_else(|| ValidationError::MalformedTime {
                value: value.to_string(),
            })
        };
        let start = parse(&bounds.start)?;
        let end = parse(&bounds.end)?;

        if start > end {
            return Err(ValidationError::InvertedTimeRange {
                start: bounds.start.clone(),
                end: bounds.end.clone(),
            });
        }
        Ok(())
    }

    fn validate_not_empty(&self, filter: &CompositeFilter) -> Result<()> {
        let summary = filter.summary(ViewMode::BySample, self.qualitative_enabled);
        if summary.count == 0 {
            return Err(ValidationError::EmptyFilter);
        }
        Ok(())
    }
}

impl Default for FilterValidator {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
