use super::*;
use brand_radar::models::{BrandDescriptor, BrandOutcome, Item, NotificationStatus, State};
use std::fs;

#[tokio::test]
async fn test_first_run_seeds_state_and_reports_everything() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let fetcher = StubFetcher::new().page("u1", product_page(&[("Shoe", "/s1")]));

    let summary = radar_in(dir.path(), fetcher)
        .run(&[BrandDescriptor::new("Acme", "u1")], date(17))
        .await?;

    let scan = summary.brands[0].scan().expect("Acme scanned");
    assert!(scan.seeding);
    assert_eq!(scan.new_items, vec![Item::new("Shoe", "/s1")]);

    let report_path = summary.report_path.expect("report written");
    assert_eq!(report_path, dir.path().join("reports/2026-10-17.md"));
    let report = fs::read_to_string(&report_path)?;
    assert!(report.starts_with("# Brand Radar ~ 2026-10-17\n"));
    assert_eq!(report.matches("Shoe").count(), 1);
    assert!(report.contains("- [Shoe](/s1)\n"));

    let mut expected = State::new();
    expected.insert("Acme".into(), vec![Item::new("Shoe", "/s1")]);
    assert_eq!(state_store(dir.path()).load(), expected);
    Ok(())
}

#[tokio::test]
async fn test_second_run_reports_only_additions() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let brands = [BrandDescriptor::new("Acme", "u1")];

    let first = StubFetcher::new().page("u1", product_page(&[("Shoe", "/s1")]));
    radar_in(dir.path(), first).run(&brands, date(16)).await?;

    let second =
        StubFetcher::new().page("u1", product_page(&[("Shoe", "/s1"), ("Hat", "/s2")]));
    let summary = radar_in(dir.path(), second).run(&brands, date(17)).await?;

    let scan = summary.brands[0].scan().expect("Acme scanned");
    assert!(!scan.seeding);
    assert_eq!(scan.new_items, vec![Item::new("Hat", "/s2")]);

    let report = fs::read_to_string(summary.report_path.expect("report written"))?;
    assert!(report.contains("## Acme\n"));
    assert!(report.contains("- [Hat](/s2)"));
    assert!(!report.contains("[Shoe]"));

    let state = state_store(dir.path()).load();
    assert_eq!(
        state["Acme"],
        vec![Item::new("Shoe", "/s1"), Item::new("Hat", "/s2")]
    );
    Ok(())
}

#[tokio::test]
async fn test_unchanged_run_reports_nothing_new() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let brands = [BrandDescriptor::new("Acme", "u1")];
    let page = product_page(&[("Shoe", "/s1")]);

    radar_in(dir.path(), StubFetcher::new().page("u1", page.clone()))
        .run(&brands, date(16))
        .await?;
    let before = fs::read(dir.path().join("data/state.json"))?;

    let summary = radar_in(dir.path(), StubFetcher::new().page("u1", page))
        .run(&brands, date(17))
        .await?;

    assert_eq!(summary.total_new(), 0);
    let report = fs::read_to_string(summary.report_path.expect("report written"))?;
    assert!(report.contains("_No new items._"));
    assert_eq!(fs::read(dir.path().join("data/state.json"))?, before);
    Ok(())
}

#[tokio::test]
async fn test_failing_brand_does_not_stop_the_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut seeded = State::new();
    seeded.insert("Beta".into(), vec![Item::new("Cap", "/c1")]);
    state_store(dir.path()).save(&seeded)?;

    let fetcher = StubFetcher::new()
        .failing("u2", "operation timed out")
        .page("u1", product_page(&[("Shoe", "/s1")]));
    let brands = [
        BrandDescriptor::new("Beta", "u2"),
        BrandDescriptor::new("Acme", "u1"),
    ];

    let summary = radar_in(dir.path(), fetcher).run(&brands, date(17)).await?;

    assert!(matches!(summary.brands[0].outcome, BrandOutcome::Failed { .. }));
    assert_eq!(summary.scanned_count(), 1);
    assert_eq!(summary.failed().count(), 1);
    assert_eq!(summary.total_new(), 1);

    let report = fs::read_to_string(summary.report_path.expect("report written"))?;
    assert!(report.contains("- [Shoe](/s1)"));
    assert!(report.contains("_Skipped: Fetch failed for u2: operation timed out_"));
    assert!(!report.contains("Cap"));

    // Beta keeps what it had, Acme is seeded
    let state = state_store(dir.path()).load();
    assert_eq!(state["Beta"], vec![Item::new("Cap", "/c1")]);
    assert_eq!(state["Acme"], vec![Item::new("Shoe", "/s1")]);
    Ok(())
}

#[tokio::test]
async fn test_same_day_reruns_keep_earlier_reports() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let brands = [BrandDescriptor::new("Acme", "u1")];

    let first = radar_in(dir.path(), StubFetcher::new().page("u1", product_page(&[("Shoe", "/s1")])))
        .run(&brands, date(17))
        .await?;
    let second = radar_in(dir.path(), StubFetcher::new().page("u1", product_page(&[("Shoe", "/s1")])))
        .run(&brands, date(17))
        .await?;

    let first_path = first.report_path.expect("first report");
    let second_path = second.report_path.expect("second report");
    assert_ne!(first_path, second_path);
    assert!(fs::read_to_string(first_path)?.contains("(first scan)"));
    assert!(fs::read_to_string(second_path)?.contains("_No new items._"));
    Ok(())
}

#[tokio::test]
async fn test_legacy_state_is_upgraded_on_save() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("data"))?;
    fs::write(dir.path().join("data/state.json"), r#"{"Acme": ["Shoe"]}"#)?;

    let fetcher = StubFetcher::new().page("u1", product_page(&[("Shoe", "/s1")]));
    let summary = radar_in(dir.path(), fetcher)
        .run(&[BrandDescriptor::new("Acme", "u1")], date(17))
        .await?;

    // A name-only entry never matches a linked item
    let scan = summary.brands[0].scan().expect("Acme scanned");
    assert!(!scan.seeding);
    assert_eq!(scan.new_items, vec![Item::new("Shoe", "/s1")]);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("data/state.json"))?)?;
    assert_eq!(saved["Acme"][0]["name"], "Shoe");
    assert_eq!(saved["Acme"][0]["link"], "/s1");
    Ok(())
}

#[tokio::test]
async fn test_disabled_notifications_are_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let summary = radar_in(dir.path(), StubFetcher::new())
        .run(&[], date(17))
        .await?;

    assert_eq!(summary.notification, NotificationStatus::Disabled);
    let report = fs::read_to_string(summary.report_path.expect("report written"))?;
    assert!(report.contains("0 new items across 0 scanned brands."));
    Ok(())
}
