//! 集合与外部查询条件
//!
//! 设备、项目、试剂批号和患者条件。设备和项目的描述在选择变化时通过外部目录
//! 解析名称；患者条件在关键字变化时查询患者目录，把结果保存为记录标识集合。

use super::{ConditionState, StoredCondition, render};
use crate::directory::{DeviceDirectory, PatientDirectory, PatientQuery, ProjectDirectory};
use crate::models::{Sample, Scope, TestItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// 患者查询无结果或失败时写入的标识，任何记录都不会匹配
pub const NO_MATCH_PATIENT: i64 = -1;

/// 选中的设备，未指定模块时匹配该设备的所有模块
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelection {
    pub serial: String,
    #[serde(default)]
    pub module_index: Option<i32>,
}

impl DeviceSelection {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            module_index: None,
        }
    }

    pub fn with_module(serial: impl Into<String>, module_index: i32) -> Self {
        Self {
            serial: serial.into(),
            module_index: Some(module_index),
        }
    }
}

/// 设备显示名：组名 + 设备名，多模块设备按模块序号追加 A/B；未知设备显示序列号
pub fn device_display_name(
    directory: &dyn DeviceDirectory,
    serial: &str,
    module_index: Option<i32>,
) -> String {
    let Some(device) = directory.find_device(serial) else {
        return serial.to_string();
    };

    let mut name = match device.group_name {
        Some(group) => group + &device.name,
        None => device.name,
    };

    if device.module_count > 1 {
        match module_index {
            Some(1) => name.push('A'),
            Some(_) => name.push('B'),
            None => {}
        }
    }
    name
}

/// 设备下拉框的候选项
///
/// 设备组展开为成员设备，多模块设备每个模块一项。
pub fn device_options(directory: &dyn DeviceDirectory, serial: &str) -> Vec<DeviceSelection> {
    let mut members = directory.find_device_group_members(serial);
    if members.is_empty() {
        members.push(serial.to_string());
    }

    let mut options = Vec::new();
    for member in members {
        let module_count = directory
            .find_device(&member)
            .map_or(1, |device| device.module_count);

        if module_count > 1 {
            options.extend(
                (1..=module_count).map(|index| DeviceSelection::with_module(&member, index)),
            );
        } else {
            options.push(DeviceSelection::new(member));
        }
    }
    options
}

/// 设备（模块）条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCondition<Option<DeviceSelection>>")]
pub struct DeviceCondition {
    selection: Option<DeviceSelection>,
    count: usize,
    description: String,
}

impl DeviceCondition {
    const TITLE: &'static str = "模块";

    pub fn selection(&self) -> Option<&DeviceSelection> {
        self.selection.as_ref()
    }

    /// 设置选中的设备，序列号为空视为清空
    pub fn select(&mut self, selection: Option<DeviceSelection>, directory: &dyn DeviceDirectory) {
        match selection.filter(|s| !s.serial.is_empty()) {
            Some(selection) => {
                let name =
                    device_display_name(directory, &selection.serial, selection.module_index);
                self.description = render(Self::TITLE, &name);
                self.count = 1;
                self.selection = Some(selection);
            }
            None => self.reset(),
        }
    }

    pub fn is_pass(&self, item: &TestItem) -> bool {
        let Some(selection) = &self.selection else {
            return true;
        };

        item.device_sn.as_deref() == Some(selection.serial.as_str())
            && selection
                .module_index
                .is_none_or(|index| index == item.module_index)
    }
}

impl From<StoredCondition<Option<DeviceSelection>>> for DeviceCondition {
    fn from(stored: StoredCondition<Option<DeviceSelection>>) -> Self {
        match stored.selection.filter(|s| !s.serial.is_empty()) {
            Some(selection) => Self {
                description: restored_description(Self::TITLE, stored.description, || {
                    selection.serial.clone()
                }),
                count: 1,
                selection: Some(selection),
            },
            None => Self::default(),
        }
    }
}

impl ConditionState for DeviceCondition {
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

/// 按项目编号解析名称，无法解析的编号跳过
fn project_names(
    codes: &BTreeSet<i32>,
    directory: &dyn ProjectDirectory,
    separator: &str,
) -> String {
    codes
        .iter()
        .filter_map(|code| {
            directory.resolve_project_name(*code, directory.project_space(*code))
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// 加载时的描述：沿用保存的描述，缺失或标题不符时用选择本身生成
fn restored_description(title: &str, stored: String, fallback: impl FnOnce() -> String) -> String {
    if stored.starts_with(title) {
        stored
    } else {
        render(title, &fallback())
    }
}

fn join_codes(codes: &BTreeSet<i32>, separator: &str) -> String {
    codes
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// 样本项目条件：样本的项目集合必须包含全部选中项目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCondition<BTreeSet<i32>>")]
pub struct AssayCondition {
    selection: BTreeSet<i32>,
    count: usize,
    description: String,
}

impl AssayCondition {
    const TITLE: &'static str = "项目";

    pub fn selection(&self) -> &BTreeSet<i32> {
        &self.selection
    }

    pub fn select(&mut self, codes: BTreeSet<i32>, directory: &dyn ProjectDirectory) {
        if codes.is_empty() {
            self.reset();
            return;
        }

        self.description = render(Self::TITLE, &project_names(&codes, directory, "/"));
        self.count = 1;
        self.selection = codes;
    }

    pub fn is_pass(&self, sample: &Sample) -> bool {
        self.selection.is_empty() || self.selection.is_subset(&sample.assay_codes())
    }
}

impl From<StoredCondition<BTreeSet<i32>>> for AssayCondition {
    fn from(stored: StoredCondition<BTreeSet<i32>>) -> Self {
        if stored.selection.is_empty() {
            return Self::default();
        }

        let selection = stored.selection;
        Self {
            description: restored_description(Self::TITLE, stored.description, || {
                join_codes(&selection, "/")
            }),
            count: 1,
            selection,
        }
    }
}

impl ConditionState for AssayCondition {
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

/// 项目条件（按项目显示）：项目编号属于选中集合即通过
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCondition<BTreeSet<i32>>")]
pub struct AssayItemCondition {
    selection: BTreeSet<i32>,
    count: usize,
    description: String,
}

impl AssayItemCondition {
    const TITLE: &'static str = "项目";

    pub fn selection(&self) -> &BTreeSet<i32> {
        &self.selection
    }

    pub fn select(&mut self, codes: BTreeSet<i32>, directory: &dyn ProjectDirectory) {
        if codes.is_empty() {
            self.reset();
            return;
        }

        self.description = render(Self::TITLE, &project_names(&codes, directory, ";"));
        self.count = 1;
        self.selection = codes;
    }

    pub fn is_pass(&self, item: &TestItem) -> bool {
        self.selection.is_empty() || self.selection.contains(&item.assay_code)
    }
}

impl From<StoredCondition<BTreeSet<i32>>> for AssayItemCondition {
    fn from(stored: StoredCondition<BTreeSet<i32>>) -> Self {
        if stored.selection.is_empty() {
            return Self::default();
        }

        let selection = stored.selection;
        Self {
            description: restored_description(Self::TITLE, stored.description, || {
                join_codes(&selection, ";")
            }),
            count: 1,
            selection,
        }
    }
}

impl ConditionState for AssayItemCondition {
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

/// 试剂批号条件
///
/// 输入以分号分隔，模糊匹配：只取排序后的第一个批号，作为子串出现在
/// 任一已用批号中即通过。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredLots")]
pub struct ReagentLotCondition {
    selection: BTreeSet<String>,
    text: String,
    count: usize,
    description: String,
}

impl ReagentLotCondition {
    const TITLE: &'static str = "试剂批号";

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 解析 "lot1;lot2;..." 形式的输入
    pub fn set_lots(&mut self, text: &str) {
        let text = text.trim();
        let lots: BTreeSet<String> = text
            .split(';')
            .map(str::trim)
            .filter(|lot| !lot.is_empty())
            .map(str::to_string)
            .collect();

        if lots.is_empty() {
            self.reset();
            return;
        }

        self.selection = lots;
        self.text = text.to_string();
        self.count = 1;
        self.description = render(Self::TITLE, text);
    }

    pub fn is_pass(&self, scope: &Scope<'_>) -> bool {
        let Some(wanted) = self.selection.first() else {
            return true;
        };

        scope
            .items()
            .flat_map(|item| item.reagent_lots.iter())
            .any(|lot| lot.contains(wanted.as_str()))
    }
}

/// 试剂批号条件的持久化形式，加载时按输入文本重新解析
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredLots {
    selection: BTreeSet<String>,
    text: String,
}

impl From<StoredLots> for ReagentLotCondition {
    fn from(stored: StoredLots) -> Self {
        let text = if stored.text.trim().is_empty() {
            stored.selection.into_iter().collect::<Vec<_>>().join(";")
        } else {
            stored.text
        };

        let mut condition = Self::default();
        condition.set_lots(&text);
        condition
    }
}

impl ConditionState for ReagentLotCondition {
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

/// 患者条件查询的字段
pub trait PatientField {
    const TITLE: &'static str;

    fn query(keyword: &str, timeout: Duration) -> PatientQuery;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatientIdField;

impl PatientField for PatientIdField {
    const TITLE: &'static str = "患者ID";

    fn query(keyword: &str, timeout: Duration) -> PatientQuery {
        PatientQuery {
            id_like: Some(keyword.to_string()),
            name_like: None,
            timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatientNameField;

impl PatientField for PatientNameField {
    const TITLE: &'static str = "患者姓名";

    fn query(keyword: &str, timeout: Duration) -> PatientQuery {
        PatientQuery {
            id_like: None,
            name_like: Some(keyword.to_string()),
            timeout,
        }
    }
}

/// 患者条件
///
/// 选择是患者目录返回的记录标识集合。查询无结果或失败时写入
/// [`NO_MATCH_PATIENT`]，条件对所有样本都不通过。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", from = "StoredPatient")]
pub struct PatientCondition<F: PatientField> {
    selection: BTreeSet<i64>,
    keyword: String,
    count: usize,
    description: String,
    #[serde(skip)]
    _field: PhantomData<F>,
}

impl<F: PatientField> PatientCondition<F> {
    pub fn selection(&self) -> &BTreeSet<i64> {
        &self.selection
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// 按关键字模糊查询患者目录并更新选择，关键字为空时清空条件
    #[instrument(skip(self, directory), fields(field = F::TITLE))]
    pub fn lookup(&mut self, keyword: &str, directory: &dyn PatientDirectory, timeout: Duration) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            self.reset();
            return;
        }

        let ids: BTreeSet<i64> = match directory.find_patients(&F::query(keyword, timeout)) {
            Ok(records) if !records.is_empty() => records.into_iter().map(|r| r.id).collect(),
            Ok(_) => {
                warn!(keyword, "患者查询无结果，条件将不匹配任何样本");
                BTreeSet::from([NO_MATCH_PATIENT])
            }
            Err(e) => {
                warn!(error = %e, "患者查询失败，条件将不匹配任何样本");
                BTreeSet::from([NO_MATCH_PATIENT])
            }
        };

        debug!(matched = ids.len(), "患者条件已更新");
        self.selection = ids;
        self.keyword = keyword.to_string();
        self.count = 1;
        self.description = render(F::TITLE, keyword);
    }

    pub fn is_pass(&self, sample: &Sample) -> bool {
        if self.selection.is_empty() {
            return true;
        }

        sample
            .patient_id
            .is_some_and(|id| id != NO_MATCH_PATIENT && self.selection.contains(&id))
    }
}

impl<F: PatientField> Default for PatientCondition<F> {
    fn default() -> Self {
        Self {
            selection: BTreeSet::new(),
            keyword: String::new(),
            count: 0,
            description: String::new(),
            _field: PhantomData,
        }
    }
}

/// 患者条件的持久化形式，保存的标识集合原样恢复，不重新查询
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredPatient {
    selection: BTreeSet<i64>,
    keyword: String,
}

impl<F: PatientField> From<StoredPatient> for PatientCondition<F> {
    fn from(stored: StoredPatient) -> Self {
        if stored.selection.is_empty() {
            return Self::default();
        }

        Self {
            description: render(F::TITLE, &stored.keyword),
            selection: stored.selection,
            keyword: stored.keyword,
            count: 1,
            _field: PhantomData,
        }
    }
}

impl<F: PatientField> ConditionState for PatientCondition<F> {
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
