use anyhow::Error;
use box_tree::{BoxKey, BoxTree, EdgeSizes, FlowMetrics, Overflow, TreeUpdate};
use fluid_layout::{LayoutConfig, LayoutEngine, LayoutError, PassOutcome, Viewport};

fn config() -> LayoutConfig {
    LayoutConfig::new(0, 0, 300)
}

#[test]
fn half_height_region_below_a_header() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let header = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let region = tree.insert_element(
        BoxKey::ROOT,
        "div",
        &[("class", "scrollable"), ("ubScrollHeight", "50")],
    )?;
    let content = tree.insert_element(region, "div", &[])?;

    let mut metrics = FlowMetrics::new(1000.0, 801.0);
    metrics.set_intrinsic(header, 1000, 100);
    metrics.set_intrinsic(content, 900, 5000);

    let engine = LayoutEngine::initialize(tree, metrics, config())?;
    assert_eq!(engine.viewport(), Viewport { width: 1000, height: 800 });
    let style = engine.tree().style(region);
    assert_eq!(style.height, Some(349));
    assert_eq!(style.width, None, "width is unmanaged without ubScrollWidth");
    assert_eq!(style.overflow, Overflow::AutoY);
    Ok(())
}

#[test]
fn own_chrome_is_subtracted() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let header = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let region = tree.insert_element(
        BoxKey::ROOT,
        "div",
        &[("scrollable", ""), ("ubScrollHeight", "50")],
    )?;
    let content = tree.insert_element(region, "div", &[])?;

    let mut metrics = FlowMetrics::new(1000.0, 801.0);
    metrics.set_intrinsic(header, 1000, 100);
    metrics.set_intrinsic(content, 900, 5000);
    metrics.set_edges(region, EdgeSizes::uniform(5));

    let engine = LayoutEngine::initialize(tree, metrics, config())?;
    assert_eq!(engine.tree().style(region).height, Some(339));
    Ok(())
}

#[test]
fn later_regions_see_earlier_sizes() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let upper = tree.insert_element(
        BoxKey::ROOT,
        "div",
        &[("class", "scrollable"), ("ubScrollHeight", "50")],
    )?;
    let upper_content = tree.insert_element(upper, "div", &[])?;
    let lower = tree.insert_element(
        BoxKey::ROOT,
        "div",
        &[("class", "scrollable"), ("ubScrollHeight", "50")],
    )?;
    let lower_content = tree.insert_element(lower, "div", &[])?;

    let mut metrics = FlowMetrics::new(1000.0, 801.0);
    metrics.set_intrinsic(upper_content, 100, 3000);
    metrics.set_intrinsic(lower_content, 100, 3000);

    let mut engine = LayoutEngine::initialize(tree, metrics, config())?;
    assert_eq!(engine.tree().style(upper).height, Some(399));
    assert_eq!(engine.tree().style(lower).height, Some(199));

    // A second pass starts from shrunk regions and lands on the same sizes.
    assert!(engine.run_full_layout_pass().is_completed());
    assert_eq!(engine.tree().style(upper).height, Some(399));
    assert_eq!(engine.tree().style(lower).height, Some(199));
    Ok(())
}

#[test]
fn width_share_is_measured_from_the_left_offset() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let sidebar_host = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let region = tree.insert_element(
        sidebar_host,
        "div",
        &[("class", "scrollable"), ("ubScrollWidth", "50"), ("ubScrollHeight", "0")],
    )?;
    let content = tree.insert_element(region, "div", &[])?;

    let mut metrics = FlowMetrics::new(1000.0, 801.0);
    metrics.set_edges(sidebar_host, EdgeSizes::new(0, 0, 0, 200));
    metrics.set_intrinsic(content, 2000, 40);

    let engine = LayoutEngine::initialize(tree, metrics, config())?;
    let style = engine.tree().style(region);
    assert_eq!(style.width, Some(400));
    assert_eq!(style.height, None);
    Ok(())
}

#[test]
fn both_axes_regions_become_flex_rows() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let region = tree.insert_element(BoxKey::ROOT, "div", &[("scrollable", "both")])?;
    let metrics = FlowMetrics::new(1000.0, 801.0);

    let mut engine = LayoutEngine::initialize(tree, metrics, config())?;
    let style = engine.tree().style(region);
    assert_eq!(style.overflow, Overflow::AutoX);
    assert!(style.flex_row);
    assert_eq!(style.height, Some(799));

    let journaled = engine
        .take_changes()
        .into_iter()
        .filter(|update| matches!(update, TreeUpdate::SetAttr { node, .. } if *node == region))
        .count();
    assert!(journaled > 0, "style changes are journaled for the host");
    Ok(())
}

#[test]
fn degenerate_viewports_skip_the_pass() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let region = tree.insert_element(BoxKey::ROOT, "div", &[("class", "scrollable")])?;
    let metrics = FlowMetrics::new(1.0, 500.0);

    let mut engine = LayoutEngine::initialize(tree, metrics, config())?;
    assert_eq!(engine.tree().style(region).height, None);
    let outcome = engine.run_full_layout_pass();
    assert!(matches!(
        outcome,
        PassOutcome::Skipped(LayoutError::DegenerateViewport { width: 1, .. })
    ));

    engine.metrics_mut().set_window(600.0, 401.0);
    let recovered = engine.run_full_layout_pass();
    assert_eq!(recovered.report().map(|report| report.sized), Some(1));
    assert_eq!(engine.tree().style(region).height, Some(399));
    Ok(())
}

#[test]
fn scripts_are_never_sized() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let script = tree.insert_element(BoxKey::ROOT, "script", &[])?;
    let hidden_region = tree.insert_element(script, "div", &[("class", "scrollable")])?;
    let metrics = FlowMetrics::new(1000.0, 801.0);

    let engine = LayoutEngine::initialize(tree, metrics, config())?;
    assert_eq!(engine.tree().style(hidden_region).height, None);
    Ok(())
}

#[test]
fn undisplayed_regions_stay_shrunk() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let region = tree.insert_element(BoxKey::ROOT, "div", &[("class", "scrollable")])?;
    let metrics = FlowMetrics::new(1000.0, 801.0);

    let mut engine = LayoutEngine::initialize(tree, metrics, config())?;
    assert_eq!(engine.tree().style(region).height, Some(799));

    engine.tree_mut().set_hidden(region, true)?;
    let outcome = engine.run_full_layout_pass();
    let report = outcome.report().copied().unwrap_or_default();
    assert_eq!((report.shrunk, report.sized), (1, 0));
    assert_eq!(engine.tree().style(region).height, Some(0));

    engine.tree_mut().set_hidden(region, false)?;
    assert!(engine.run_full_layout_pass().is_completed());
    assert_eq!(engine.tree().style(region).height, Some(799));
    Ok(())
}
