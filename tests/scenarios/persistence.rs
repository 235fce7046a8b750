//! 快捷筛选持久化场景

use super::{Directories, load_worklist, temp_config_dir};
use filter_engine::options::{OrderType, RecheckOption, StatusOption};
use filter_engine::{
    CompositeFilter, DictionaryStore, FilterError, FilterExecutor, MemoryDictionary, PRESET_COUNT,
    PresetStore, Result, ValidationError,
};
use lab_shared::config::AppConfig;
use std::collections::BTreeSet;

/// 写入总是失败的字典存储
struct ReadOnlyDictionary(MemoryDictionary);

impl DictionaryStore for ReadOnlyDictionary {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, _value: &str) -> Result<()> {
        Err(FilterError::Dictionary {
            key: key.to_string(),
            message: "只读字典".to_string(),
        })
    }
}

fn config_with_key(name: &str, key: &str) -> AppConfig {
    let dir = temp_config_dir(name);
    std::fs::write(
        dir.join("default.toml"),
        format!("[filter]\ndictionary_key = \"{}\"\n", key),
    )
    .expect("写入配置失败");
    AppConfig::load_from(&dir, "sample-filter", "test").expect("配置加载失败")
}

fn named(index: usize, name: &str) -> CompositeFilter {
    let mut filter = CompositeFilter::preset(index).with_name(name);
    filter.enabled = true;
    filter
}

#[test]
fn test_presets_survive_restart() {
    let config = config_with_key("restart", "WORKPAGE_FILTER_TEST");
    let dictionary = MemoryDictionary::new();
    let directories = Directories::new();

    let mut store = PresetStore::open(dictionary.clone(), &config.filter);
    let mut liver = named(2, "肝功");
    liver.set_assays(BTreeSet::from([11, 12]), &directories.projects);
    liver.status.toggle(StatusOption::Tested, true);
    store.save_preset(2, liver).expect("保存失败");

    let mut rerun = named(4, "复查");
    rerun.recheck.toggle(RecheckOption::HasRecheck, true);
    store.save_preset(4, rerun).expect("保存失败");

    assert_eq!(dictionary.len(), 1);
    assert!(dictionary.get("WORKPAGE_FILTER_TEST").expect("读取失败").is_some());

    let mut reopened = PresetStore::open(dictionary, &config.filter);
    let indices: Vec<usize> = reopened.presets().iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    assert_eq!(reopened.preset(2).expect("序号有效").name, "肝功");
    assert_eq!(
        reopened.preset(2).expect("序号有效").sample_assays.selection(),
        &BTreeSet::from([11, 12])
    );

    let executor = FilterExecutor::new(&config.filter);
    let samples = load_worklist();
    let passing = |store: &PresetStore<MemoryDictionary>| -> Vec<i64> {
        samples
            .iter()
            .filter(|s| executor.is_sample_pass(store.active_filter(), s))
            .map(|s| s.id)
            .collect()
    };

    reopened.activate(Some(2)).expect("应用失败");
    assert_eq!(passing(&reopened), vec![1]);

    reopened.activate(Some(4)).expect("应用失败");
    assert_eq!(passing(&reopened), vec![3]);

    // 停用当前快捷筛选后回到实时筛选
    reopened.set_enabled(4, false).expect("保存失败");
    assert_eq!(reopened.active_index(), None);
    assert_eq!(passing(&reopened).len(), 4);

    assert!(matches!(
        reopened.activate(Some(4)),
        Err(FilterError::Validation(ValidationError::PresetNotApplicable { index: 4 }))
    ));
}

#[test]
fn test_unreadable_documents_fall_back_to_defaults() {
    let config = config_with_key("unreadable", "WORKPAGE_FILTER_TEST");
    let key = config.filter.dictionary_key.as_str();

    for raw in ["", "   ", "not json", "{}", "[{}, {}, {}]"] {
        let dictionary = MemoryDictionary::new();
        dictionary.set(key, raw).expect("写入失败");

        let store = PresetStore::open(dictionary, &config.filter);
        assert!(store.presets().iter().all(|p| p.is_blank() && !p.enabled), "{:?}", raw);
        assert_eq!(store.presets().len(), PRESET_COUNT);
    }
}

#[test]
fn test_sparse_document_is_accepted() {
    let config = config_with_key("sparse", "WORKPAGE_FILTER_TEST");
    let dictionary = MemoryDictionary::new();
    dictionary
        .set(
            &config.filter.dictionary_key,
            r#"[
                {
                    "name": "急诊",
                    "enabled": true,
                    "order_type": { "selection": 2, "count": 1, "description": "订单类型：急诊" },
                    "legacy_flag": 1
                },
                {}, {}, {}, {}
            ]"#,
        )
        .expect("写入失败");

    let mut store = PresetStore::open(dictionary, &config.filter);
    let preset = store.preset(1).expect("序号有效");
    assert!(preset.order_type.selection().contains(OrderType::Emergency));
    assert!(preset.status.selection().is_empty());

    store.activate(Some(1)).expect("应用失败");
    let executor = FilterExecutor::new(&config.filter);
    let ids: Vec<i64> = load_worklist()
        .iter()
        .filter(|s| executor.is_sample_pass(store.active_filter(), s))
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn test_rejected_save_keeps_previous_state() {
    let config = config_with_key("rejected", "WORKPAGE_FILTER_TEST");
    let dictionary = MemoryDictionary::new();
    let mut store = PresetStore::open(dictionary.clone(), &config.filter);

    let mut routine = named(1, "常规");
    routine.order_type.toggle(OrderType::Routine, true);
    store.save_preset(1, routine).expect("保存失败");
    let saved = dictionary
        .get(&config.filter.dictionary_key)
        .expect("读取失败");

    let mut inverted = named(3, "倒置");
    inverted.sample_number.set_bounds("000200", "000100");
    let err = store.save_preset(3, inverted).unwrap_err();
    assert!(matches!(
        err,
        FilterError::Validation(ValidationError::InvertedSampleNumberRange { .. })
    ));

    let mut open_ended = named(3, "半开");
    open_ended.examination_time.set_bounds("2024-03-15", "");
    let err = store.save_preset(3, open_ended).unwrap_err();
    assert!(matches!(
        err,
        FilterError::Validation(ValidationError::IncompleteTimeRange)
    ));

    assert!(store.preset(3).expect("序号有效").is_blank());
    assert_eq!(
        dictionary
            .get(&config.filter.dictionary_key)
            .expect("读取失败"),
        saved
    );
}

#[test]
fn test_storage_failure_leaves_memory_untouched() {
    let config = config_with_key("readonly", "WORKPAGE_FILTER_TEST");
    let mut store = PresetStore::open(ReadOnlyDictionary(MemoryDictionary::new()), &config.filter);

    let mut routine = named(1, "常规");
    routine.order_type.toggle(OrderType::Routine, true);
    let err = store.save_preset(1, routine).unwrap_err();

    assert!(matches!(err, FilterError::Dictionary { .. }));
    assert!(store.preset(1).expect("序号有效").is_blank());
    assert!(matches!(
        store.preset(6),
        Err(FilterError::Validation(ValidationError::PresetIndexOutOfRange { index: 6 }))
    ));
}
