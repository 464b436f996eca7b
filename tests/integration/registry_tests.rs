use super::*;
use brand_radar::registry::{BrandRegistry, RegistryChange};
use std::fs;

#[tokio::test]
async fn test_registry_edits_feed_the_next_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = BrandRegistry::new(dir.path().join("brands.json"));

    assert_eq!(registry.add("Zeta", Some("u9"))?, RegistryChange::Added);
    assert_eq!(registry.add("Acme", Some("u1"))?, RegistryChange::Added);
    assert_eq!(registry.add("acme", Some("u1"))?, RegistryChange::Unchanged);
    assert_eq!(registry.remove("ZETA")?, RegistryChange::Removed);

    let brands = registry.load()?;
    assert_eq!(brands.len(), 1);
    assert_eq!(brands[0].name, "Acme");

    let fetcher = StubFetcher::new().page("u1", product_page(&[("Shoe", "/s1")]));
    let summary = radar_in(dir.path(), fetcher).run(&brands, date(17)).await?;
    assert_eq!(summary.total_new(), 1);
    Ok(())
}

#[test]
fn test_registry_file_is_sorted_and_readable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("brands.json");
    let registry = BrandRegistry::new(&path);

    registry.add("represent", Some("https://represent.test"))?;
    registry.add("Corteiz", Some("https://corteiz.test"))?;
    registry.add("Represent", Some("https://uk.represent.test"))?;

    let raw = fs::read_to_string(&path)?;
    assert!(raw.ends_with("]\n"));
    let corteiz = raw.find("Corteiz").unwrap();
    let represent = raw.find("represent\"").unwrap();
    assert!(corteiz < represent);
    assert!(raw.contains("https://uk.represent.test"));
    assert!(!raw.contains("selectors"));
    Ok(())
}

#[test]
fn test_run_refuses_a_missing_registry() {
    let dir = tempfile::tempdir().unwrap();
    let registry = BrandRegistry::new(dir.path().join("brands.json"));

    assert!(registry.load().is_err());
    assert!(registry.load_for_edit().unwrap().is_empty());
}

#[test]
fn test_hand_written_registry_with_hints() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("brands.json");
    fs::write(
        &path,
        r#"[
  {"name": "Acme", "url": "https://acme.test", "selectors": [".tile a"], "paths": ["/collections/new"]},
  {"name": "", "url": "https://blank.test"}
]"#,
    )?;

    let brands = BrandRegistry::new(&path).load()?;
    assert_eq!(brands.len(), 1);
    assert_eq!(
        brands[0].page_urls(),
        vec!["https://acme.test", "https://acme.test/collections/new"]
    );
    Ok(())
}
