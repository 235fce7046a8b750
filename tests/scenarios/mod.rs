//! 工作页筛选场景测试
//!
//! 从配置加载开始，覆盖跨 crate 的完整使用流程：
//! - 配置文件与环境变量
//! - 按样本、按项目两种视图下的筛选
//! - 快捷筛选的保存、加载与兼容旧数据

pub mod persistence;
pub mod workpage;

use filter_engine::Sample;
use filter_engine::test_utils::{
    StaticDeviceDirectory, StaticPatientDirectory, StaticProjectDirectory,
};
use std::path::PathBuf;

/// 场景测试用的外部目录
pub struct Directories {
    pub patients: StaticPatientDirectory,
    pub devices: StaticDeviceDirectory,
    pub projects: StaticProjectDirectory,
}

impl Directories {
    pub fn new() -> Self {
        Self {
            patients: StaticPatientDirectory::new()
                .with_patient(100, "ZY20240001", "张三")
                .with_patient(101, "ZY20240002", "李四")
                .with_patient(102, "MZ20240003", "张小明"),
            devices: StaticDeviceDirectory::new()
                .with_device("BS-01", "生化仪", Some("A线"), 1)
                .with_device("IM-01", "免疫仪", Some("A线"), 2)
                .with_group("LINE-A", &["BS-01", "IM-01"]),
            projects: StaticProjectDirectory::new()
                .with_assay(11, "ALT")
                .with_assay(12, "AST")
                .with_assay(21, "HBsAg")
                .with_calculated(9001, "AST/ALT"),
        }
    }
}

impl Default for Directories {
    fn default() -> Self {
        Self::new()
    }
}

/// 从 JSON 载入工作页样本，结构与上游存储导出一致
pub fn load_worklist() -> Vec<Sample> {
    let raw = r#"
    [
        {
            "id": 1, "seq_no": "000101", "barcode": "2403150001",
            "category": "patient", "source_type": "serum_plasma", "status": "tested",
            "audit": true, "printed": true, "uploaded": true, "patient_id": 100,
            "end_test_time": "2024-03-15T09:12:00",
            "items": [
                { "id": 11, "assay_code": 11, "device_sn": "BS-01", "module_index": 1,
                  "status": "tested", "end_time": "2024-03-15T09:10:00",
                  "reagent_lots": ["R1-240301"], "suck_vol_type": "standard",
                  "dilution_factor": 1 },
                { "id": 12, "assay_code": 12, "device_sn": "BS-01", "module_index": 1,
                  "status": "tested", "end_time": "2024-03-15T09:12:00",
                  "reagent_lots": ["R1-240302"], "suck_vol_type": "standard", "dilution_factor": 1,
                  "result_status_codes": "H" }
            ]
        },
        {
            "id": 2, "seq_no": "000102", "barcode": "2403150002",
            "category": "patient", "stat": true, "source_type": "serum_plasma", "status": "tested",
            "patient_id": 101,
            "end_test_time": "2024-03-15T10:40:00",
            "items": [
                { "id": 21, "assay_code": 21, "device_sn": "IM-01", "module_index": 2,
                  "status": "tested", "end_time": "2024-03-15T10:40:00",
                  "reagent_lots": ["IM-7788"], "suck_vol_type": "standard", "dilution_factor": 10,
                  "first_qual": "positive" }
            ]
        },
        {
            "id": 3, "seq_no": "000103", "barcode": "2403160003",
            "category": "patient", "source_type": "urine", "status": "testing",
            "patient_id": 102,
            "items": [
                { "id": 31, "assay_code": 11, "device_sn": "BS-01", "module_index": 1,
                  "status": "tested", "end_time": "2024-03-16T08:00:00",
                  "reagent_lots": ["R1-240301"], "suck_vol_type": "standard", "dilution_factor": 1,
                  "rerun": true },
                { "id": 32, "assay_code": 12, "device_sn": "BS-01", "module_index": 1,
                  "status": "testing",
                  "suck_vol_type": "standard", "dilution_factor": 1 }
            ]
        },
        {
            "id": 4, "seq_no": "QC-01", "barcode": "QC240315",
            "category": "quality_control", "source_type": "other", "status": "tested",
            "end_test_time": "2024-03-15T07:30:00",
            "items": [
                { "id": 41, "assay_code": 21, "device_sn": "IM-01", "module_index": 1,
                  "status": "tested", "end_time": "2024-03-15T07:30:00",
                  "reagent_lots": ["IM-7788"], "suck_vol_type": "standard", "dilution_factor": 1,
                  "first_qual": "negative" }
            ]
        }
    ]
    "#;

    serde_json::from_str(raw).expect("工作页样本 JSON 无效")
}

/// 每个测试独立的临时配置目录
pub fn temp_config_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lab-filter-scenario-{}-{}",
        name,
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("无法创建临时配置目录");
    dir
}
