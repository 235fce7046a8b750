//! 测试工具模块
//!
//! 提供样本和项目的构建器，以及内存中的患者、设备、项目目录实现，
//! 供单元测试、集成测试和基准测试共用。

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::conditions::parse_time;
use crate::directory::{
    DeviceDirectory, DeviceRecord, DirectoryError, PatientDirectory, PatientQuery, PatientRecord,
    ProjectDirectory, ProjectSpace,
};
use crate::models::{
    QualJudge, Sample, SampleCategory, SourceType, SuckVolType, TestItem, TestStatus,
};

// ==================== 数据构建器 ====================

/// 样本构建器
///
/// 默认是已完成的常规血清样本，没有子项目。
pub struct SampleBuilder {
    sample: Sample,
}

impl SampleBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            sample: Sample {
                id,
                seq_no: id.to_string(),
                category: Some(SampleCategory::Patient),
                source_type: Some(SourceType::SerumPlasma),
                status: Some(TestStatus::Tested),
                ..Default::default()
            },
        }
    }

    pub fn seq_no(mut self, seq_no: &str) -> Self {
        self.sample.seq_no = seq_no.to_string();
        self
    }

    pub fn barcode(mut self, barcode: &str) -> Self {
        self.sample.barcode = barcode.to_string();
        self
    }

    pub fn category(mut self, category: SampleCategory) -> Self {
        self.sample.category = Some(category);
        self
    }

    /// 急诊
    pub fn stat(mut self) -> Self {
        self.sample.stat = true;
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.sample.source_type = Some(source_type);
        self
    }

    pub fn status(mut self, status: TestStatus) -> Self {
        self.sample.status = Some(status);
        self
    }

    pub fn audited(mut self) -> Self {
        self.sample.audit = true;
        self
    }

    pub fn printed(mut self) -> Self {
        self.sample.printed = true;
        self
    }

    pub fn uploaded(mut self) -> Self {
        self.sample.uploaded = true;
        self
    }

    pub fn patient(mut self, patient_id: i64) -> Self {
        self.sample.patient_id = Some(patient_id);
        self
    }

    /// 完成时间，无法解析时不设置
    pub fn finished_at(mut self, time: &str) -> Self {
        self.sample.end_test_time = parse_time(time);
        self
    }

    pub fn rechecked_at(mut self, time: &str) -> Self {
        self.sample.end_retest_time = parse_time(time);
        self
    }

    pub fn item(mut self, item: TestItem) -> Self {
        self.sample.items.push(item);
        self
    }

    pub fn build(self) -> Sample {
        self.sample
    }
}

/// 项目构建器
///
/// 默认是已完成、标准吸样量、稀释倍数 1 的项目。
pub struct ItemBuilder {
    item: TestItem,
}

impl ItemBuilder {
    pub fn new(assay_code: i32) -> Self {
        Self {
            item: TestItem {
                assay_code,
                status: Some(TestStatus::Tested),
                suck_vol_type: Some(SuckVolType::Standard),
                dilution_factor: Some(1),
                ..Default::default()
            },
        }
    }

    pub fn id(mut self, id: i64) -> Self {
        self.item.id = id;
        self
    }

    pub fn device(mut self, serial: &str, module_index: i32) -> Self {
        self.item.device_sn = Some(serial.to_string());
        self.item.module_index = module_index;
        self
    }

    pub fn status(mut self, status: TestStatus) -> Self {
        self.item.status = Some(status);
        self
    }

    pub fn finished_at(mut self, time: &str) -> Self {
        self.item.end_time = parse_time(time);
        self
    }

    pub fn rechecked_at(mut self, time: &str) -> Self {
        self.item.retest_end_time = parse_time(time);
        self
    }

    pub fn rerun(mut self) -> Self {
        self.item.rerun = true;
        self
    }

    pub fn recheck_result(mut self, key: i64) -> Self {
        self.item.recheck_result_key = Some(key);
        self
    }

    pub fn alarm(mut self, codes: &str) -> Self {
        self.item.result_status_codes = codes.to_string();
        self
    }

    pub fn recheck_alarm(mut self, codes: &str) -> Self {
        self.item.retest_result_status_codes = codes.to_string();
        self
    }

    pub fn lots(mut self, lots: &[&str]) -> Self {
        self.item.reagent_lots = lots.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn dilution(mut self, suck_vol_type: SuckVolType, factor: i32) -> Self {
        self.item.suck_vol_type = Some(suck_vol_type);
        self.item.dilution_factor = Some(factor);
        self
    }

    pub fn pre_diluted(mut self, factor: i32) -> Self {
        self.item.pre_dilution_factor = Some(factor);
        self
    }

    pub fn qualitative(mut self, first: Option<QualJudge>, retest: Option<QualJudge>) -> Self {
        self.item.first_qual = first;
        self.item.retest_qual = retest;
        self
    }

    pub fn ai_flagged(mut self, flagged: bool) -> Self {
        self.item.ai_flagged = Some(flagged);
        self
    }

    pub fn build(self) -> TestItem {
        self.item
    }
}

// ==================== 内存目录 ====================

/// 内存患者目录
///
/// 按病历号或姓名做包含匹配，记录收到的每一次查询。
#[derive(Default)]
pub struct StaticPatientDirectory {
    patients: Vec<PatientRecord>,
    unavailable: bool,
    queries: Mutex<Vec<PatientQuery>>,
}

impl StaticPatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient(mut self, id: i64, medical_record_no: &str, name: &str) -> Self {
        self.patients.push(PatientRecord {
            id,
            medical_record_no: medical_record_no.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// 所有查询都返回服务不可用
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<PatientQuery> {
        self.queries.lock().clone()
    }
}

impl PatientDirectory for StaticPatientDirectory {
    fn find_patients(&self, query: &PatientQuery) -> Result<Vec<PatientRecord>, DirectoryError> {
        self.queries.lock().push(query.clone());

        if self.unavailable {
            return Err(DirectoryError::Unavailable("patient directory offline".to_string()));
        }

        let matches = |value: &str, like: &Option<String>| {
            like.as_deref().is_none_or(|like| value.contains(like))
        };

        Ok(self
            .patients
            .iter()
            .filter(|p| {
                matches(&p.medical_record_no, &query.id_like) && matches(&p.name, &query.name_like)
            })
            .cloned()
            .collect())
    }
}

/// 内存设备目录
#[derive(Debug, Default)]
pub struct StaticDeviceDirectory {
    devices: HashMap<String, DeviceRecord>,
    groups: HashMap<String, Vec<String>>,
}

impl StaticDeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(
        mut self,
        serial: &str,
        name: &str,
        group_name: Option<&str>,
        module_count: i32,
    ) -> Self {
        self.devices.insert(
            serial.to_string(),
            DeviceRecord {
                serial: serial.to_string(),
                name: name.to_string(),
                group_name: group_name.map(str::to_string),
                module_count,
            },
        );
        self
    }

    pub fn with_group(mut self, serial: &str, members: &[&str]) -> Self {
        self.groups.insert(
            serial.to_string(),
            members.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

impl DeviceDirectory for StaticDeviceDirectory {
    fn find_device(&self, serial: &str) -> Option<DeviceRecord> {
        self.devices.get(serial).cloned()
    }

    fn find_device_group_members(&self, serial: &str) -> Vec<String> {
        self.groups.get(serial).cloned().unwrap_or_default()
    }
}

/// 内存项目目录，普通项目与计算项目分开登记
#[derive(Debug, Default)]
pub struct StaticProjectDirectory {
    ordinary: HashMap<i32, String>,
    calculated: HashMap<i32, String>,
}

impl StaticProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assay(mut self, code: i32, name: &str) -> Self {
        self.ordinary.insert(code, name.to_string());
        self
    }

    pub fn with_calculated(mut self, code: i32, name: &str) -> Self {
        self.calculated.insert(code, name.to_string());
        self
    }
}

impl ProjectDirectory for StaticProjectDirectory {
    fn project_space(&self, code: i32) -> ProjectSpace {
        if self.calculated.contains_key(&code) {
            ProjectSpace::Calculated
        } else {
            ProjectSpace::Ordinary
        }
    }

    fn resolve_project_name(&self, code: i32, space: ProjectSpace) -> Option<String> {
        match space {
            ProjectSpace::Ordinary => self.ordinary.get(&code).cloned(),
            ProjectSpace::Calculated => self.calculated.get(&code).cloned(),
        }
    }
}
