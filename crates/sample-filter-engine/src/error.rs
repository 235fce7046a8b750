//! 筛选引擎错误类型

use thiserror::Error;

/// 保存前校验失败的原因
///
/// 全部可恢复：调用方应提示用户并保留之前已接受的状态。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("必须至少选择一个筛选条件")]
    EmptyFilter,

    #[error("快捷筛选名称不能为空: 第 {index} 个快捷筛选")]
    EmptyPresetName { index: usize },

    #[error("名字有重复，不能保存: {name}")]
    DuplicatePresetName { name: String },

    #[error("开始样本号大于结束样本号: {start} > {end}")]
    InvertedSampleNumberRange { start: String, end: String },

    #[error("开始条码大于结束条码: {start} > {end}")]
    InvertedBarcodeRange { start: String, end: String },

    #[error("必须同时设置开始和结束时间")]
    IncompleteTimeRange,

    #[error("无法解析检测时间: '{value}'")]
    MalformedTime { value: String },

    #[error("检测日期结束时间早于开始时间: {start} > {end}")]
    InvertedTimeRange { start: String, end: String },

    #[error("快捷筛选序号越界: {index}")]
    PresetIndexOutOfRange { index: usize },

    #[error("快捷筛选未启用或条件为空，不能应用: 第 {index} 个快捷筛选")]
    PresetNotApplicable { index: usize },
}

/// 筛选引擎错误
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("筛选条件校验失败: {0}")]
    Validation(#[from] ValidationError),

    #[error("字典存储访问失败: {key} - {message}")]
    Dictionary { key: String, message: String },

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FilterError>;
