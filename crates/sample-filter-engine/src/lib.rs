//! 样本筛选引擎
//!
//! 判断检测样本及其项目是否满足用户定义的筛选条件，支持：
//! - 多选条件（位集保存，选项之间"或"）
//! - 范围条件（任意长度数字比较，非数字时子串匹配）
//! - 设备、项目、试剂批号和患者条件（通过外部目录解析）
//! - 样本级与项目级两阶段判断
//! - 五个快捷筛选加一个实时筛选的管理与 JSON 持久化

pub mod conditions;
pub mod directory;
pub mod error;
pub mod executor;
pub mod filter;
pub mod models;
pub mod options;
pub mod store;
pub mod test_utils;
pub mod validator;

pub use conditions::{ConditionState, DeviceSelection, NO_MATCH_PATIENT, device_options};
pub use directory::{
    DeviceDirectory, DeviceRecord, DirectoryError, PatientDirectory, PatientQuery, PatientRecord,
    ProjectDirectory, ProjectSpace,
};
pub use error::{FilterError, Result, ValidationError};
pub use executor::{ConditionKind, FilterExecutor, FilterOutcome, Rejection};
pub use filter::{CompositeFilter, ConditionSummary, LIVE_INDEX};
pub use models::{
    QualJudge, Sample, SampleCategory, Scope, SourceType, SuckVolType, TestItem, TestStatus,
    ViewMode,
};
pub use options::FlagOption;
pub use store::{DictionaryStore, MemoryDictionary, PRESET_COUNT, PresetStore};
pub use validator::FilterValidator;
