//! 筛选条件
//!
//! 每个条件持有用户的选择、条件数目和条件描述。描述在选择变化时立即重新生成，
//! 判断时不再计算。选择为空的条件无条件通过。

pub mod flags;
pub mod lookup;
pub mod range;

pub use flags::{FlagCondition, FlagSet};
pub use lookup::{
    AssayCondition, AssayItemCondition, DeviceCondition, DeviceSelection, NO_MATCH_PATIENT,
    PatientCondition, PatientField, PatientIdField, PatientNameField, ReagentLotCondition,
    device_display_name, device_options,
};
pub use range::{
    BarcodeCondition, BarcodeField, RangeBounds, RangeField, SampleNumberCondition,
    SampleNumberField, TextRangeCondition, TimeRangeCondition, parse_time,
};

use serde::Deserialize;

/// 条件的持久化形式
///
/// 条件数目不从存储中读取，加载时由选择重新推导，描述也尽量由选择重新生成。
#[derive(Debug, Default, Deserialize)]
#[serde(default, bound(deserialize = "S: Deserialize<'de> + Default"))]
pub(crate) struct StoredCondition<S> {
    pub selection: S,
    /// 需要外部目录才能生成的描述在加载时沿用保存的值
    pub description: String,
}

/// 所有条件共有的状态
pub trait ConditionState {
    /// 条件数目，选择为空时为 0
    fn count(&self) -> usize;

    /// 条件描述，选择为空时为空串
    fn description(&self) -> &str;

    /// 清空选择
    fn reset(&mut self);

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// 生成 "标题：内容" 形式的描述
pub(crate) fn render(title: &str, content: &str) -> String {
    format!("{}：{}", title, content)
}
