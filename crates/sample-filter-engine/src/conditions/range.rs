//! 范围条件
//!
//! 检测时间按闭区间比较；样本号和条码在两端均为纯数字时按任意长度整数比较，
//! 否则退化为子串包含判断。

use super::{ConditionState, StoredCondition, render};
use crate::error::ValidationError;
use crate::models::{Sample, Scope};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::marker::PhantomData;

/// 范围的起止值，任一端为空表示该端不限
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeBounds {
    pub start: String,
    pub end: String,
}

impl RangeBounds {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into().trim().to_string(),
            end: end.into().trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }

    fn describe(&self, title: &str) -> String {
        if self.is_empty() {
            return String::new();
        }

        let content = match (self.start.is_empty(), self.end.is_empty()) {
            (false, false) => format!("{}-{}", self.start, self.end),
            (false, true) => self.start.clone(),
            _ => self.end.clone(),
        };
        render(title, &content)
    }
}

/// 解析时间字符串
///
/// 支持 "2024-01-15 10:00:00"、"2024-01-15T10:00:00"、"2024/01/15 10:00:00"、
/// RFC 3339 以及纯日期（取当天零点）。
pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(time) = NaiveDateTime::parse_from_str(value, format) {
            return Some(time);
        }
    }

    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.naive_local());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// 检测时间条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCondition<RangeBounds>")]
pub struct TimeRangeCondition {
    selection: RangeBounds,
    count: usize,
    description: String,
}

impl TimeRangeCondition {
    const TITLE: &'static str = "检测日期";

    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        let mut condition = Self::default();
        condition.set_bounds(start, end);
        condition
    }

    pub fn bounds(&self) -> &RangeBounds {
        &self.selection
    }

    pub fn set_bounds(&mut self, start: impl Into<String>, end: impl Into<String>) {
        self.selection = RangeBounds::new(start, end);
        self.count = usize::from(!self.selection.is_empty());
        self.description = self.selection.describe(Self::TITLE);
    }

    /// 解析后的时间区间；起止相同时结束时间延伸到当天最后一刻
    pub fn interval(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = parse_time(&self.selection.start)?;
        let end = if self.selection.start == self.selection.end {
            start.date().and_hms_micro_opt(23, 59, 59, 999_999)?
        } else {
            parse_time(&self.selection.end)?
        };
        Some((start, end))
    }

    /// 任一相关时间（完成时间、复查完成时间）落在区间内即通过；区间无法解析时不通过
    pub fn is_pass(&self, scope: &Scope<'_>) -> bool {
        if self.selection.is_empty() {
            return true;
        }

        let Some((start, end)) = self.interval() else {
            return false;
        };

        let (finished, rechecked) = match scope.item() {
            Some(item) => (item.end_time, item.retest_end_time),
            None => {
                let sample = scope.sample();
                (sample.end_test_time, sample.end_retest_time)
            }
        };

        // 没有完成时间的记录不参与时间筛选
        let Some(finished) = finished else {
            return false;
        };

        std::iter::once(finished)
            .chain(rechecked)
            .any(|time| time >= start && time <= end)
    }
}

impl From<StoredCondition<RangeBounds>> for TimeRangeCondition {
    fn from(stored: StoredCondition<RangeBounds>) -> Self {
        let RangeBounds { start, end } = stored.selection;
        Self::new(start, end)
    }
}

impl ConditionState for TimeRangeCondition {
    fn count(&self) -> usize {
        self.count
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 是否为纯数字串
pub(crate) fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// 按整数值比较两个纯数字串，忽略前导零，长度不受限
pub(crate) fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// 文本范围判断
///
/// 只有一端时判断是否包含该端；两端都是纯数字时按整数区间判断，
/// 记录值不是纯数字则不通过；否则任一端是记录值的子串即通过。
pub(crate) fn text_range_matches(value: &str, bounds: &RangeBounds) -> bool {
    let (start, end) = (bounds.start.as_str(), bounds.end.as_str());
    if start.is_empty() {
        return value.contains(end);
    }
    if end.is_empty() {
        return value.contains(start);
    }

    if is_digits(start) && is_digits(end) {
        if !is_digits(value) {
            return false;
        }
        return cmp_digits(value, start) != Ordering::Less
            && cmp_digits(value, end) != Ordering::Greater;
    }

    value.contains(end) || value.contains(start)
}

/// 文本范围条件作用的样本字段
pub trait RangeField {
    const TITLE: &'static str;

    fn value(sample: &Sample) -> &str;

    /// 起始值大于结束值时的校验错误
    fn inverted(start: String, end: String) -> ValidationError;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleNumberField;

impl RangeField for SampleNumberField {
    const TITLE: &'static str = "样本号";

    fn value(sample: &Sample) -> &str {
        &sample.seq_no
    }

    fn inverted(start: String, end: String) -> ValidationError {
        ValidationError::InvertedSampleNumberRange { start, end }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarcodeField;

impl RangeField for BarcodeField {
    const TITLE: &'static str = "样本条码";

    fn value(sample: &Sample) -> &str {
        &sample.barcode
    }

    fn inverted(start: String, end: String) -> ValidationError {
        ValidationError::InvertedBarcodeRange { start, end }
    }
}

/// 样本号或条码的范围条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", from = "StoredCondition<RangeBounds>")]
pub struct TextRangeCondition<F: RangeField> {
    selection: RangeBounds,
    count: usize,
    description: String,
    #[serde(skip)]
    _field: PhantomData<F>,
}

pub type SampleNumberCondition = TextRangeCondition<SampleNumberField>;
pub type BarcodeCondition = TextRangeCondition<BarcodeField>;

impl<F: RangeField> TextRangeCondition<F> {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        let mut condition = Self::default();
        condition.set_bounds(start, end);
        condition
    }

    pub fn bounds(&self) -> &RangeBounds {
        &self.selection
    }

    pub fn set_bounds(&mut self, start: impl Into<String>, end: impl Into<String>) {
        self.selection = RangeBounds::new(start, end);
        self.count = usize::from(!self.selection.is_empty());
        self.description = self.selection.describe(F::TITLE);
    }

    /// 两端均为纯数字且起始值大于结束值
    pub fn is_inverted(&self) -> bool {
        let RangeBounds { start, end } = &self.selection;
        is_digits(start) && is_digits(end) && cmp_digits(start, end) == Ordering::Greater
    }

    /// 起止值倒置时返回对应的校验错误
    pub fn check_order(&self) -> Result<(), ValidationError> {
        if self.is_inverted() {
            return Err(F::inverted(
                self.selection.start.clone(),
                self.selection.end.clone(),
            ));
        }
        Ok(())
    }

    pub fn is_pass(&self, sample: &Sample) -> bool {
        if self.selection.is_empty() {
            return true;
        }

        text_range_matches(F::value(sample), &self.selection)
    }
}

impl<F: RangeField> From<StoredCondition<RangeBounds>> for TextRangeCondition<F> {
    fn from(stored: StoredCondition<RangeBounds>) -> Self {
        let RangeBounds { start, end } = stored.selection;
        Self::new(start, end)
    }
}

impl<F: RangeField> Default for TextRangeCondition<F> {
    fn default() -> Self {
        Self {
            selection: RangeBounds::default(),
            count: 0,
            description: String::new(),
            _field: PhantomData,
        }
    }
}

impl<F: RangeField> ConditionState for TextRangeCondition<F> {
    fn count(&self) -> usize {
        self.count
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
