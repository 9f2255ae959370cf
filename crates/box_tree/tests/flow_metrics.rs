use anyhow::Error;
use box_tree::{BoxKey, BoxTree, EdgeSizes, FlowMetrics, Metrics, Size};

#[test]
fn blocks_stack_vertically_and_hidden_boxes_take_no_space() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let first = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let second = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let third = tree.insert_element(BoxKey::ROOT, "div", &[])?;

    let mut metrics = FlowMetrics::new(1000.0, 800.0);
    metrics.set_intrinsic(first, 300, 40);
    metrics.set_intrinsic(second, 200, 60);
    metrics.set_edges(second, EdgeSizes::uniform(5));

    assert_eq!(metrics.outer_size(&tree, second), Size::new(210.0, 70.0));
    assert_eq!(metrics.offset(&tree, third).top, 110.0);

    tree.set_hidden(second, true)?;
    assert_eq!(metrics.outer_size(&tree, second), Size::default());
    assert_eq!(metrics.offset(&tree, third).top, 40.0);
    Ok(())
}

#[test]
fn declared_sizes_override_content() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let pane = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let content = tree.insert_element(pane, "div", &[])?;

    let mut metrics = FlowMetrics::new(1000.0, 800.0);
    metrics.set_intrinsic(content, 500, 900);
    metrics.set_edges(pane, EdgeSizes::new(1, 2, 3, 4));
    assert_eq!(metrics.outer_size(&tree, pane), Size::new(506.0, 904.0));

    tree.update_style(pane, |style| {
        style.height = Some(0);
        style.width = Some(0);
    })?;
    assert_eq!(metrics.outer_size(&tree, pane), Size::new(6.0, 4.0));
    assert_eq!(metrics.offset(&tree, content).left, 4.0);
    Ok(())
}

#[test]
fn flex_rows_place_children_side_by_side() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let strip = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let left = tree.insert_element(strip, "div", &[])?;
    let right = tree.insert_element(strip, "div", &[])?;
    tree.update_style(strip, |style| style.flex_row = true)?;

    let mut metrics = FlowMetrics::new(1000.0, 800.0);
    metrics.set_intrinsic(left, 120, 50);
    metrics.set_intrinsic(right, 80, 70);
    assert_eq!(metrics.outer_size(&tree, strip), Size::new(200.0, 70.0));
    assert_eq!(metrics.offset(&tree, right).left, 120.0);
    assert_eq!(metrics.offset(&tree, right).top, 0.0);
    Ok(())
}

#[test]
fn grid_columns_take_the_widest_cell() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let grid = tree.insert_element(BoxKey::ROOT, "table", &[])?;
    let head = tree.insert_element(grid, "thead", &[])?;
    let body = tree.insert_element(grid, "tbody", &[])?;
    let head_row = tree.insert_element(head, "tr", &[])?;
    let wide_header = tree.insert_element(head_row, "th", &[("colspan", "2")])?;
    let body_row = tree.insert_element(body, "tr", &[])?;
    let first = tree.insert_element(body_row, "td", &[])?;
    let second = tree.insert_element(body_row, "td", &[])?;

    let mut metrics = FlowMetrics::new(1000.0, 800.0);
    metrics.set_intrinsic(wide_header, 150, 20);
    metrics.set_intrinsic(first, 40, 30);
    metrics.set_intrinsic(second, 60, 30);

    // The spanning header needs 150; the 50px deficit is split over both columns.
    assert_eq!(metrics.outer_size(&tree, first).width, 65.0);
    assert_eq!(metrics.outer_size(&tree, second).width, 85.0);
    assert_eq!(metrics.outer_size(&tree, grid), Size::new(150.0, 50.0));
    assert_eq!(metrics.offset(&tree, second).left, 65.0);
    assert_eq!(metrics.offset(&tree, body_row).top, 20.0);
    Ok(())
}

#[test]
fn probe_reports_configured_scrollbar() {
    let mut metrics = FlowMetrics::new(640.0, 480.0).with_scrollbar(17.0);
    let probe = metrics.probe_scrollbar();
    assert_eq!(probe.plain_width - probe.scrolling_width, 17.0);
    assert_eq!(metrics.window_size(), Size::new(640.0, 480.0));
}
