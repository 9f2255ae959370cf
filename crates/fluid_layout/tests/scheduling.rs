use anyhow::Error;
use box_tree::{BoxKey, BoxTree, FlowMetrics, TreeUpdate};
use core::time::Duration;
use fluid_layout::{DriveReport, HostSignal, LayoutConfig, LayoutEngine, drive};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::sleep;

fn engine_with_region() -> Result<(LayoutEngine<FlowMetrics>, BoxKey), Error> {
    let mut tree = BoxTree::new();
    let region = tree.insert_element(BoxKey::ROOT, "div", &[("class", "scrollable")])?;
    let metrics = FlowMetrics::new(1000.0, 801.0);
    let engine = LayoutEngine::initialize(tree, metrics, LayoutConfig::new(0, 0, 300))?;
    Ok((engine, region))
}

#[test]
fn resize_bursts_run_one_trailing_pass() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut engine, region) = engine_with_region()?;
    let start = Instant::now();

    engine.trigger_resize(start);
    engine.metrics_mut().set_window(1000.0, 601.0);
    engine.trigger_resize(start + Duration::from_millis(120));
    assert!(engine.poll(start + Duration::from_millis(300)).is_none());
    assert_eq!(engine.tree().style(region).height, Some(799));

    let outcome = engine.poll(start + Duration::from_millis(420));
    assert!(outcome.is_some_and(|ran| ran.is_completed()));
    assert_eq!(engine.tree().style(region).height, Some(599));
    assert!(engine.poll(start + Duration::from_millis(900)).is_none());
    assert_eq!(engine.superseded_resizes(), 1);
    assert_eq!(engine.resize_deadline(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn driver_coalesces_resizes() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut engine, region) = engine_with_region()?;
    engine.metrics_mut().set_window(1000.0, 401.0);
    let (sender, receiver) = mpsc::channel(16);

    let host = tokio::spawn(async move {
        for _ in 0..3 {
            sender.send(HostSignal::Resize).await?;
            sleep(Duration::from_millis(100)).await;
        }
        sleep(Duration::from_millis(500)).await;
        sender.send(HostSignal::Shutdown).await?;
        Ok::<_, mpsc::error::SendError<HostSignal>>(())
    });

    let report = drive(&mut engine, receiver).await;
    host.await??;

    assert_eq!(
        report,
        DriveReport {
            passes: 1,
            coalesced: 2,
            ..DriveReport::default()
        }
    );
    assert_eq!(engine.tree().style(region).height, Some(399));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn driver_applies_updates_and_clicks() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let grid = tree.insert_element(BoxKey::ROOT, "table", &[])?;
    let body = tree.insert_element(grid, "tbody", &[])?;
    let parent = tree.insert_element(body, "tr", &[("collapseLevel", "0")])?;
    tree.insert_element(parent, "td", &[])?;
    let child = tree.insert_element(body, "tr", &[("collapseLevel", "1")])?;
    tree.insert_element(child, "td", &[])?;
    let metrics = FlowMetrics::new(1000.0, 801.0);
    let mut engine = LayoutEngine::initialize(tree, metrics, LayoutConfig::default())?;
    let control = engine
        .tree()
        .children(parent)
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("missing control cell"))?;

    let pane = BoxKey(900);
    let (sender, receiver) = mpsc::channel(16);
    sender
        .send(HostSignal::Updates(vec![
            TreeUpdate::InsertElement {
                parent: BoxKey::ROOT,
                node: pane,
                tag: "div".into(),
                pos: 0,
            },
            TreeUpdate::SetAttr {
                node: pane,
                name: "class".into(),
                value: "scrollable".into(),
            },
        ]))
        .await?;
    sender.send(HostSignal::Click(control)).await?;
    sender
        .send(HostSignal::Updates(vec![TreeUpdate::RemoveNode {
            node: BoxKey(12345),
        }]))
        .await?;
    drop(sender);

    let report = drive(&mut engine, receiver).await;
    assert_eq!(report.update_batches, 1);
    assert_eq!(report.toggles, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.passes, 1, "toggles relayout inside the engine");
    assert_eq!(engine.tree().style(pane).height, Some(799));
    assert!(engine.tree().style(child).hidden);
    Ok(())
}
