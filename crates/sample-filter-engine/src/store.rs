//! 快捷筛选存储
//!
//! 五个快捷筛选编码为一个 JSON 数组，保存在字典存储的一个键下。
//! 读取失败、值为空或无法解析时视为尚未配置，返回五个空的未启用快捷筛选。

use crate::error::{Result, ValidationError};
use crate::filter::CompositeFilter;
use crate::validator::FilterValidator;
use dashmap::DashMap;
use lab_shared::config::FilterConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 快捷筛选数目
pub const PRESET_COUNT: usize = 5;

/// 通用键值字典存储
#[cfg_attr(test, mockall::automock)]
pub trait DictionaryStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// 基于 DashMap 的内存字典，克隆后共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct MemoryDictionary {
    data: Arc<DashMap<String, String>>,
}

impl MemoryDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl DictionaryStore for MemoryDictionary {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.get(key).map(|v| v.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// 五个空的未启用快捷筛选，序号 1..=5
pub fn default_presets() -> [CompositeFilter; PRESET_COUNT] {
    std::array::from_fn(|i| CompositeFilter::preset(i + 1))
}

/// 读取快捷筛选，任何失败都退化为默认值
#[instrument(skip(dictionary))]
pub fn load_presets(
    dictionary: &dyn DictionaryStore,
    key: &str,
) -> [CompositeFilter; PRESET_COUNT] {
    let raw = match dictionary.get(key) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => {
            debug!("快捷筛选尚未配置");
            return default_presets();
        }
        Err(e) => {
            warn!(error = %e, "读取快捷筛选失败，使用默认值");
            return default_presets();
        }
    };

    let decoded: Vec<CompositeFilter> = match serde_json::from_str(&raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "快捷筛选解析失败，使用默认值");
            return default_presets();
        }
    };

    match <[CompositeFilter; PRESET_COUNT]>::try_from(decoded) {
        Ok(mut presets) => {
            for (i, preset) in presets.iter_mut().enumerate() {
                preset.index = i + 1;
                if preset.enabled && preset.has_no_conditions() {
                    warn!(index = preset.index, "快捷筛选没有条件，已停用");
                    preset.enabled = false;
                }
            }
            presets
        }
        Err(decoded) => {
            warn!(len = decoded.len(), "快捷筛选数目不正确，使用默认值");
            default_presets()
        }
    }
}

/// 校验全部快捷筛选后编码写入，校验失败时不写入
#[instrument(skip(dictionary, validator, presets))]
pub fn save_presets(
    dictionary: &dyn DictionaryStore,
    key: &str,
    validator: &FilterValidator,
    presets: &[CompositeFilter; PRESET_COUNT],
) -> Result<()> {
    validator.validate_presets(presets)?;

    let encoded = serde_json::to_string(presets)?;
    dictionary.set(key, &encoded)?;

    info!("快捷筛选已保存");
    Ok(())
}

/// 快捷筛选与实时筛选的管理
pub struct PresetStore<D> {
    dictionary: D,
    key: String,
    validator: FilterValidator,
    presets: [CompositeFilter; PRESET_COUNT],
    live: CompositeFilter,
    /// 当前应用的快捷筛选序号，`None` 表示实时筛选
    active: Option<usize>,
}

impl<D: DictionaryStore> PresetStore<D> {
    /// 加载已保存的快捷筛选
    #[instrument(skip(dictionary, config), fields(key = %config.dictionary_key))]
    pub fn open(dictionary: D, config: &FilterConfig) -> Self {
        let presets = load_presets(&dictionary, &config.dictionary_key);
        let enabled = presets.iter().filter(|p| p.enabled).count();
        info!(enabled, "快捷筛选已加载");

        Self {
            dictionary,
            key: config.dictionary_key.clone(),
            validator: FilterValidator::new(config),
            presets,
            live: CompositeFilter::live(),
            active: None,
        }
    }

    pub fn presets(&self) -> &[CompositeFilter; PRESET_COUNT] {
        &self.presets
    }

    fn slot(index: usize) -> Result<usize> {
        if (1..=PRESET_COUNT).contains(&index) {
            Ok(index - 1)
        } else {
            Err(ValidationError::PresetIndexOutOfRange { index }.into())
        }
    }

    pub fn preset(&self, index: usize) -> Result<&CompositeFilter> {
        Ok(&self.presets[Self::slot(index)?])
    }

    /// 仅修改内存中的快捷筛选，调用 [`Self::save`] 后才持久化
    pub fn preset_mut(&mut self, index: usize) -> Result<&mut CompositeFilter> {
        Ok(&mut self.presets[Self::slot(index)?])
    }

    pub fn live(&self) -> &CompositeFilter {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut CompositeFilter {
        &mut self.live
    }

    /// 校验实时筛选
    pub fn validate_live(&self) -> std::result::Result<(), ValidationError> {
        self.validator.validate_live(&self.live)
    }

    /// 启用或停用快捷筛选并保存，不能启用没有条件的快捷筛选
    #[instrument(skip(self))]
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        let slot = Self::slot(index)?;
        if enabled && self.presets[slot].has_no_conditions() {
            return Err(ValidationError::EmptyFilter.into());
        }

        let mut candidate = self.presets.clone();
        candidate[slot].enabled = enabled;
        self.commit(candidate)
    }

    /// 选择当前应用的筛选条件，`None` 为实时筛选
    pub fn activate(&mut self, index: Option<usize>) -> Result<()> {
        let Some(index) = index else {
            self.active = None;
            return Ok(());
        };

        let preset = self.preset(index)?;
        if !preset.enabled || preset.has_no_conditions() {
            return Err(ValidationError::PresetNotApplicable { index }.into());
        }

        debug!(index, name = %preset.name, "应用快捷筛选");
        self.active = Some(index);
        Ok(())
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// 当前应用的筛选条件
    pub fn active_filter(&self) -> &CompositeFilter {
        self.active
            .and_then(|index| self.preset(index).ok())
            .unwrap_or(&self.live)
    }

    /// 快捷按钮：(是否启用, 名称)
    pub fn quick_buttons(&self) -> Vec<(bool, String)> {
        self.presets
            .iter()
            .map(|p| (p.enabled, p.name.clone()))
            .collect()
    }

    /// 替换一个快捷筛选并保存全部，失败时内存和存储都不变
    #[instrument(skip(self, filter), fields(name = %filter.name))]
    pub fn save_preset(&mut self, index: usize, mut filter: CompositeFilter) -> Result<()> {
        let slot = Self::slot(index)?;
        filter.index = index;

        let mut candidate = self.presets.clone();
        candidate[slot] = filter;
        self.commit(candidate)
    }

    /// 保存全部快捷筛选
    #[instrument(skip(self, presets))]
    pub fn save(&mut self, mut presets: [CompositeFilter; PRESET_COUNT]) -> Result<()> {
        for (i, preset) in presets.iter_mut().enumerate() {
            preset.index = i + 1;
        }
        self.commit(presets)
    }

    /// 清空全部快捷筛选和实时筛选（仅内存）
    pub fn reset(&mut self) {
        self.presets = default_presets();
        self.live = CompositeFilter::live();
        self.active = None;
    }

    fn commit(&mut self, candidate: [CompositeFilter; PRESET_COUNT]) -> Result<()> {
        save_presets(&self.dictionary, &self.key, &self.validator, &candidate)?;
        self.presets = candidate;

        // 当前应用的快捷筛选被停用或清空时回到实时筛选
        if let Some(index) = self.active {
            if self.activate(Some(index)).is_err() {
                self.active = None;
            }
        }
        Ok(())
    }
}
