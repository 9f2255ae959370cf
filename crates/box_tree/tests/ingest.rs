use anyhow::Error;
use box_tree::{
    BoxKey, BoxKind, BoxTree, CollapseState, Percent, ScrollAxis, SectionRole, TreeSubscriber,
    TreeUpdate,
};

#[test]
fn streamed_updates_build_typed_boxes() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = BoxKey::ROOT;
    let table = BoxKey(10);
    let body = BoxKey(11);
    let row = BoxKey(12);
    tree.apply_updates([
        TreeUpdate::InsertElement { parent: root, node: table, tag: "TABLE".into(), pos: 0 },
        TreeUpdate::SetAttr { node: table, name: "class".into(), value: "wide scrollable".into() },
        TreeUpdate::SetAttr { node: table, name: "ubScrollHeight".into(), value: "60".into() },
        TreeUpdate::InsertElement { parent: table, node: body, tag: "tbody".into(), pos: 0 },
        TreeUpdate::InsertElement { parent: body, node: row, tag: "tr".into(), pos: 0 },
        TreeUpdate::SetAttr { node: row, name: "collapseLevel".into(), value: "1".into() },
        TreeUpdate::SetAttr { node: row, name: "collapseState".into(), value: "hide".into() },
        TreeUpdate::EndOfDocument,
    ])?;

    assert_eq!(tree.kind(table), Some(BoxKind::Grid));
    assert_eq!(tree.section(table, SectionRole::Body), Some(body));
    let region = tree.node(table)?.descriptor.scroll.region(BoxKind::Grid);
    assert_eq!(region.map(|found| found.height), Percent::new(60));
    assert_eq!(region.map(|found| found.axis), Some(ScrollAxis::Vertical));
    let marker = tree.node(row)?.descriptor.collapse();
    assert_eq!(marker.map(|found| (found.level, found.state)), Some((1, CollapseState::Hidden)));
    assert!(tree.take_changes().is_empty(), "host updates are not echoed back");
    Ok(())
}

#[test]
fn malformed_markers_are_rejected_at_ingestion() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let div = BoxKey(1);
    let inserted = tree.apply_update(TreeUpdate::InsertElement {
        parent: BoxKey::ROOT,
        node: div,
        tag: "div".into(),
        pos: 0,
    });
    assert!(inserted.is_ok());
    let result = tree.apply_update(TreeUpdate::SetAttr {
        node: div,
        name: "ubScrollHeight".into(),
        value: "150".into(),
    });
    assert!(result.is_err());
    let orphan = tree.apply_update(TreeUpdate::InsertElement {
        parent: BoxKey(99),
        node: BoxKey(2),
        tag: "div".into(),
        pos: 0,
    });
    assert!(orphan.is_err());
}

#[test]
fn engine_mutations_are_journaled_for_the_host() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let outer = tree.insert_element(tree.root(), "div", &[])?;
    let inner = tree.insert_element(tree.root(), "div", &[("id", "pane")])?;

    let wrapper = tree.create_element(outer, None, "div")?;
    assert!(wrapper.is_minted());
    tree.append_child(wrapper, inner)?;
    tree.update_style(wrapper, |style| style.height = Some(120))?;
    let unchanged = tree.update_style(wrapper, |style| style.height = Some(120))?;
    assert!(!unchanged);
    assert_eq!(tree.take_id(inner)?.as_deref(), Some("pane"));

    let changes = tree.take_changes();
    assert_eq!(
        changes,
        vec![
            TreeUpdate::InsertElement { parent: outer, node: wrapper, tag: "div".into(), pos: 0 },
            TreeUpdate::MoveNode { node: inner, parent: wrapper, pos: 0 },
            TreeUpdate::SetAttr { node: wrapper, name: "style".into(), value: "height: 120px; ".into() },
            TreeUpdate::RemoveAttr { node: inner, name: "id".into() },
        ]
    );
    assert_eq!(tree.parent(inner), Some(wrapper));
    assert!(tree.pending_changes().is_empty());
    Ok(())
}

#[test]
fn replaying_the_journal_reproduces_the_structure() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine_side = BoxTree::new();
    let mut host_side = BoxTree::new();
    let panel = engine_side.insert_element(BoxKey::ROOT, "div", &[])?;
    host_side.apply_update(TreeUpdate::InsertElement {
        parent: BoxKey::ROOT,
        node: panel,
        tag: "div".into(),
        pos: 0,
    })?;

    let cell = engine_side.create_element(panel, None, "td")?;
    engine_side.set_text(cell, "-")?;
    engine_side.set_hidden(panel, true)?;
    host_side.apply_updates(engine_side.take_changes())?;

    assert_eq!(host_side.children(panel), &[cell]);
    assert_eq!(host_side.node(cell)?.text.as_deref(), Some("-"));
    assert_eq!(host_side.node(panel)?.attrs.get("style").map(String::as_str), Some("display: none;"));
    Ok(())
}

#[test]
fn moves_into_own_subtree_are_refused() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let outer = tree.insert_element(BoxKey::ROOT, "div", &[])?;
    let inner = tree.insert_element(outer, "div", &[])?;
    assert!(tree.append_child(inner, outer).is_err());
    assert_eq!(tree.parent(inner), Some(outer));

    tree.remove(outer)?;
    assert!(!tree.contains(inner));
    assert!(tree.remove(BoxKey::ROOT).is_err());
    Ok(())
}

#[test]
fn grid_rows_follow_section_order() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let grid = tree.insert_element(BoxKey::ROOT, "table", &[])?;
    let foot = tree.insert_element(grid, "tfoot", &[])?;
    let body = tree.insert_element(grid, "tbody", &[])?;
    let head = tree.insert_element(grid, "thead", &[])?;
    let foot_row = tree.insert_element(foot, "tr", &[])?;
    let body_row = tree.insert_element(body, "tr", &[])?;
    let head_row = tree.insert_element(head, "tr", &[])?;
    assert_eq!(tree.grid_rows(grid), vec![head_row, body_row, foot_row]);

    let script = tree.insert_element(body_row, "script", &[])?;
    let inside = tree.insert_element(script, "span", &[])?;
    assert!(!tree.is_displayed(inside));
    assert!(tree.is_displayed(body_row));
    Ok(())
}
