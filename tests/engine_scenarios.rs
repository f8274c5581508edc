use eframe::egui::vec2;
use explore_graph::{
    EngineConfig, GraphEdge, GraphEngine, GraphNode, GraphSnapshot, HierarchyTree, IntakeOutcome,
    RenderFlags, TreeLayoutConfig, layout_tree,
};
use serde_json::json;

fn scenario_snapshot() -> GraphSnapshot {
    GraphSnapshot::from_value(json!({
        "hierarchy": {
            "id": "R", "name": "root",
            "children": [ { "id": "A", "name": "a" }, { "id": "B", "name": "b" } ]
        },
        "outsideNodes": [ { "id": "X", "name": "x" } ],
        "outsideEdges": [ { "source": "X", "target": "A", "weight": 2.0 } ]
    }))
    .unwrap()
}

fn ready_engine(snapshot: GraphSnapshot) -> GraphEngine {
    let mut engine = GraphEngine::new(EngineConfig::default());
    engine.ingest(snapshot, RenderFlags::default()).unwrap();
    engine
}

#[test]
fn linked_outside_node_settles_beside_its_neighbour() {
    let engine = ready_engine(scenario_snapshot());
    let frame = engine.frame();

    let position = |id: &str| {
        frame
            .nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.position)
            .unwrap()
    };
    let (x, a, b) = (position("X"), position("A"), position("B"));
    assert!((x - a).length() < (x - b).length(), "x={x:?} a={a:?} b={b:?}");

    let edge = frame
        .edges
        .iter()
        .find(|edge| edge.source == "X" && edge.target == "A")
        .expect("X-A edge is rendered");
    assert_eq!(edge.from, x);
    assert_eq!(edge.to, a);
}

#[test]
fn dragged_node_follows_the_pointer_exactly_until_release() {
    let mut engine = ready_engine(scenario_snapshot());
    assert!(engine.begin_drag("X", vec2(50.0, 50.0)));

    for _ in 0..30 {
        engine.tick(1.0 / 60.0);
        let frame = engine.frame();
        let x = frame.nodes.iter().find(|node| node.id == "X").unwrap();
        assert_eq!(x.position, vec2(50.0, 50.0));

        let edge = frame.edges.iter().find(|edge| edge.source == "X").unwrap();
        assert_eq!(edge.from, vec2(50.0, 50.0));
    }

    assert!(engine.drag_to(vec2(-10.0, 80.0)));
    let x = engine.frame().nodes.into_iter().find(|node| node.id == "X").unwrap();
    assert_eq!(x.position, vec2(-10.0, 80.0));

    engine.end_drag();
    assert!(engine.drag_state().is_none());
    for _ in 0..5 {
        engine.tick(1.0 / 60.0);
    }

    let frame = engine.frame();
    let x = frame.nodes.iter().find(|node| node.id == "X").unwrap();
    assert_eq!(Some(x.position), engine.simulation().position("X"));
    assert_ne!(x.position, vec2(-10.0, 80.0));
}

#[test]
fn unresolved_edges_are_dropped_without_failing() {
    let mut snapshot = scenario_snapshot();
    snapshot.outside_edges.push(GraphEdge::outside("X", "nowhere"));
    snapshot.hierarchy_edges.push(GraphEdge::outside("A", "missing"));

    let mut engine = GraphEngine::new(EngineConfig::default());
    let outcome = engine.ingest(snapshot, RenderFlags::default()).unwrap();
    assert!(matches!(
        outcome,
        IntakeOutcome::Applied {
            dropped_edges: 2,
            ..
        }
    ));

    let frame = engine.frame();
    assert_eq!(frame.stats.dropped_edges, 2);
    assert!(
        frame
            .edges
            .iter()
            .all(|edge| edge.target != "nowhere" && edge.target != "missing")
    );
    assert!(
        frame
            .nodes
            .iter()
            .all(|node| node.position.x.is_finite() && node.position.y.is_finite())
    );
}

#[test]
fn alpha_decays_until_new_nodes_arrive() {
    let mut engine = GraphEngine::new(EngineConfig {
        settle_iterations: 0,
        ..EngineConfig::default()
    });
    engine.ingest(scenario_snapshot(), RenderFlags::default()).unwrap();

    let mut previous = engine.simulation().alpha();
    for _ in 0..100 {
        engine.tick(1.0 / 60.0);
        let alpha = engine.simulation().alpha();
        assert!(alpha <= previous);
        previous = alpha;
    }
    assert!(previous < 1.0);

    let mut next = scenario_snapshot();
    next.outside_nodes.push(GraphNode::outside("Y", "y"));
    engine.ingest(next, RenderFlags::default()).unwrap();
    assert_eq!(engine.simulation().alpha(), 1.0);
}

#[test]
fn zoom_steps_never_leave_the_scale_range() {
    let mut engine = ready_engine(scenario_snapshot());
    let config = engine.config().zoom.clone();

    for round in 0..60 {
        if round % 7 < 4 {
            engine.zoom_in();
        } else {
            engine.zoom_out();
        }
        let scale = engine.zoom().transform().scale;
        assert!((config.min_scale..=config.max_scale).contains(&scale));
    }
}

#[test]
fn zoom_fit_puts_every_node_inside_the_viewport_margin() {
    let mut engine = ready_engine(scenario_snapshot());
    engine.zoom_fit(false);

    let margin = engine.config().zoom.fit_margin;
    let inner = engine.zoom().viewport().shrink(margin - 0.01);
    for node in engine.frame().nodes {
        let screen = engine.zoom().world_to_screen(node.position);
        assert!(inner.contains(screen), "{} at {screen:?}", node.id);
    }
}

#[test]
fn tree_layout_is_deterministic() {
    let snapshot = scenario_snapshot();
    let config = TreeLayoutConfig::default();
    let first = layout_tree(&snapshot.hierarchy, &config).unwrap();
    let second = layout_tree(&snapshot.hierarchy.clone(), &config).unwrap();
    assert_eq!(first, second);

    let empty = HierarchyTree::default();
    assert!(layout_tree(&empty, &config).is_err());
}
