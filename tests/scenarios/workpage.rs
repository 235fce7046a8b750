//! 工作页筛选场景

use super::{Directories, load_worklist, temp_config_dir};
use chrono::{Duration, NaiveDate};
use filter_engine::options::{AuditOption, DilutionOption, OrderType, QualitativeOption};
use filter_engine::{
    CompositeFilter, DeviceSelection, FilterExecutor, FilterValidator, Sample, ValidationError,
    ViewMode, device_options,
};
use lab_shared::config::AppConfig;
use std::collections::BTreeSet;
use tracing::info;

fn passing(executor: &FilterExecutor, filter: &CompositeFilter, samples: &[Sample]) -> Vec<i64> {
    let ids: Vec<i64> = samples
        .iter()
        .filter(|s| executor.is_sample_pass(filter, s))
        .map(|s| s.id)
        .collect();
    info!(?ids, "按样本筛选结果");
    ids
}

fn passing_items(
    executor: &FilterExecutor,
    filter: &CompositeFilter,
    samples: &[Sample],
) -> Vec<i64> {
    samples
        .iter()
        .flat_map(|s| s.items.iter().map(move |item| (s, item)))
        .filter(|(s, item)| executor.is_item_pass(filter, s, item))
        .map(|(_, item)| item.id)
        .collect()
}

fn default_config(name: &str) -> AppConfig {
    AppConfig::load_from(&temp_config_dir(name), "sample-filter", "test").expect("配置加载失败")
}

#[test]
fn test_morning_review_by_sample() {
    let config = default_config("morning");
    let executor = FilterExecutor::new(&config.filter);
    let samples = load_worklist();

    let day = NaiveDate::from_ymd_opt(2024, 3, 15).expect("日期无效");
    let day = day.format("%Y-%m-%d").to_string();

    let mut filter = CompositeFilter::live();
    filter.examination_time.set_bounds(day.as_str(), day.as_str());
    assert_eq!(passing(&executor, &filter, &samples), vec![1, 2, 4]);

    filter.order_type.toggle(OrderType::Routine, true);
    filter.order_type.toggle(OrderType::Emergency, true);
    assert_eq!(passing(&executor, &filter, &samples), vec![1, 2]);

    filter.audit.toggle(AuditOption::NotAudited, true);
    assert_eq!(passing(&executor, &filter, &samples), vec![2]);

    let summary = filter.summary(ViewMode::BySample, config.filter.qualitative_enabled);
    assert_eq!(summary.count, 4);
    assert_eq!(
        summary.description,
        "检测日期：2024-03-15-2024-03-15\n订单类型：常规/急诊\n审核：未审核"
    );
}

#[test]
fn test_time_window_across_midnight() {
    let config = default_config("midnight");
    let executor = FilterExecutor::new(&config.filter);
    let samples = load_worklist();

    let start = NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("时间无效");
    let end = start + Duration::hours(24);

    let mut filter = CompositeFilter::live();
    filter.examination_time.set_bounds(
        start.format("%Y-%m-%d %H:%M:%S").to_string(),
        end.format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    // 样本 3 没有完成时间
    assert_eq!(passing(&executor, &filter, &samples), vec![2]);
    // 按项目判断时使用项目自己的完成时间
    assert_eq!(passing_items(&executor, &filter, &samples), vec![21, 31]);
}

#[test]
fn test_item_view_with_assay_and_lot() {
    let config = default_config("item-view");
    let executor = FilterExecutor::new(&config.filter);
    let samples = load_worklist();
    let directories = Directories::new();

    let mut filter = CompositeFilter::live();
    filter.set_assays(BTreeSet::from([11]), &directories.projects);
    filter.reagent_lot.set_lots("240301");

    assert_eq!(passing_items(&executor, &filter, &samples), vec![11, 31]);
    assert_eq!(passing(&executor, &filter, &samples), vec![1, 3]);

    let summary = filter.summary(ViewMode::ByItem, true);
    assert_eq!(summary.count, 2);
    assert_eq!(summary.description, "试剂批号：240301\n项目：ALT");
}

#[test]
fn test_sample_assays_require_every_code() {
    let config = default_config("assays");
    let executor = FilterExecutor::new(&config.filter);
    let samples = load_worklist();
    let directories = Directories::new();

    let mut filter = CompositeFilter::live();
    filter.set_assays(BTreeSet::from([11, 12, 9001]), &directories.projects);

    assert!(passing(&executor, &filter, &samples).is_empty());
    assert_eq!(
        filter.summary(ViewMode::BySample, true).description,
        "项目：ALT/AST/AST/ALT"
    );

    filter.set_assays(BTreeSet::from([11, 12]), &directories.projects);
    assert_eq!(passing(&executor, &filter, &samples), vec![1, 3]);
}

#[test]
fn test_device_line_and_modules() {
    let config = default_config("device");
    let executor = FilterExecutor::new(&config.filter);
    let samples = load_worklist();
    let directories = Directories::new();

    let options = device_options(&directories.devices, "LINE-A");
    assert_eq!(
        options,
        vec![
            DeviceSelection::new("BS-01"),
            DeviceSelection::with_module("IM-01", 1),
            DeviceSelection::with_module("IM-01", 2),
        ]
    );

    let mut filter = CompositeFilter::live();
    filter.device.select(Some(options[2].clone()), &directories.devices);
    assert_eq!(
        filter.summary(ViewMode::BySample, true).description,
        "模块：A线免疫仪B"
    );
    assert_eq!(passing(&executor, &filter, &samples), vec![2]);

    filter
        .device
        .select(Some(DeviceSelection::new("IM-01")), &directories.devices);
    assert_eq!(
        filter.summary(ViewMode::BySample, true).description,
        "模块：A线免疫仪"
    );
    assert_eq!(passing(&executor, &filter, &samples), vec![2, 4]);

    filter.dilution.toggle(DilutionOption::InnerDilution, true);
    assert_eq!(passing(&executor, &filter, &samples), vec![2]);

    filter.device.select(None, &directories.devices);
    assert_eq!(passing(&executor, &filter, &samples), vec![2]);
}

#[test]
fn test_patient_conditions_use_configured_timeout() {
    let dir = temp_config_dir("patient");
    std::fs::write(
        dir.join("sample-filter.toml"),
        "[filter]\npatient_lookup_timeout_ms = 1500\n",
    )
    .expect("写入配置失败");
    let config = AppConfig::load_from(&dir, "sample-filter", "test").expect("配置加载失败");
    let executor = FilterExecutor::new(&config.filter);
    let samples = load_worklist();
    let directories = Directories::new();

    let mut filter = CompositeFilter::live();
    filter.patient_name.lookup(
        "张",
        &directories.patients,
        config.filter.patient_lookup_timeout(),
    );
    assert_eq!(passing(&executor, &filter, &samples), vec![1, 3]);

    filter.patient_id.lookup(
        "MZ",
        &directories.patients,
        config.filter.patient_lookup_timeout(),
    );
    assert_eq!(passing(&executor, &filter, &samples), vec![3]);

    let queries = directories.patients.queries();
    assert!(queries
        .iter()
        .all(|q| q.timeout == std::time::Duration::from_millis(1500)));
}

#[test]
fn test_qualitative_follows_configuration() {
    let dir = temp_config_dir("qualitative");
    std::fs::write(dir.join("test.toml"), "[filter]\nqualitative_enabled = false\n")
        .expect("写入配置失败");
    let disabled = AppConfig::load_from(&dir, "sample-filter", "test").expect("配置加载失败");
    let enabled = default_config("qualitative-on");
    let samples = load_worklist();

    let mut filter = CompositeFilter::live();
    filter.qualitative.toggle(QualitativeOption::Positive, true);

    assert_eq!(
        passing(&FilterExecutor::new(&enabled.filter), &filter, &samples),
        vec![2]
    );
    assert_eq!(
        passing(&FilterExecutor::new(&disabled.filter), &filter, &samples),
        vec![1, 2, 3, 4]
    );

    // 定性条件不参与时视为没有条件
    assert_eq!(
        FilterValidator::new(&disabled.filter).validate_live(&filter),
        Err(ValidationError::EmptyFilter)
    );
    assert!(FilterValidator::new(&enabled.filter).validate_live(&filter).is_ok());
}
