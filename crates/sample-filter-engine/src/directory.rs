//! 外部目录接口
//!
//! 患者、设备、项目信息由外部服务维护，引擎只通过下列 trait 查询，
//! 便于替换实现和 mock 测试。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 目录查询失败的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("目录查询超时: {0:?}")]
    Timeout(Duration),

    #[error("目录服务不可用: {0}")]
    Unavailable(String),
}

/// 患者记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// 患者记录的内部标识，对应 `Sample::patient_id`
    pub id: i64,
    /// 病历号
    pub medical_record_no: String,
    pub name: String,
}

/// 患者模糊查询条件，未设置的字段不参与匹配
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatientQuery {
    pub id_like: Option<String>,
    pub name_like: Option<String>,
    pub timeout: Duration,
}

/// 设备记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub serial: String,
    pub name: String,
    pub group_name: Option<String>,
    /// 模块数，大于 1 时显示名按模块区分 A/B
    pub module_count: i32,
}

/// 项目编号所属的编号空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSpace {
    /// 普通项目
    Ordinary,
    /// 计算项目
    Calculated,
}

/// 患者目录
#[cfg_attr(test, mockall::automock)]
pub trait PatientDirectory: Send + Sync {
    fn find_patients(&self, query: &PatientQuery) -> Result<Vec<PatientRecord>, DirectoryError>;
}

/// 设备目录
#[cfg_attr(test, mockall::automock)]
pub trait DeviceDirectory: Send + Sync {
    fn find_device(&self, serial: &str) -> Option<DeviceRecord>;

    /// 设备组的成员序列号；不是设备组时返回空
    fn find_device_group_members(&self, serial: &str) -> Vec<String>;
}

/// 项目目录
#[cfg_attr(test, mockall::automock)]
pub trait ProjectDirectory: Send + Sync {
    fn project_space(&self, code: i32) -> ProjectSpace;

    fn resolve_project_name(&self, code: i32, space: ProjectSpace) -> Option<String>;
}
