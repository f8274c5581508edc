use std::path::Path;

use anyhow::Context as _;
use explore_graph::GraphSnapshot;
use serde_json::json;

pub(super) fn load_snapshot(input: Option<&Path>) -> anyhow::Result<GraphSnapshot> {
    let Some(path) = input else {
        return demo_snapshot().context("failed to build demo snapshot");
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot = GraphSnapshot::from_json(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        hierarchy = snapshot.hierarchy.len(),
        outside_nodes = snapshot.outside_nodes.len(),
        outside_edges = snapshot.outside_edges.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Small service map used when no snapshot file is given.
fn demo_snapshot() -> serde_json::Result<GraphSnapshot> {
    GraphSnapshot::from_value(json!({
        "hierarchy": {
            "id": "platform", "name": "Platform",
            "children": [
                {
                    "id": "ingest", "name": "Ingest",
                    "children": [
                        { "id": "ingest-api", "name": "Ingest API" },
                        { "id": "ingest-queue", "name": "Queue" }
                    ]
                },
                {
                    "id": "storage", "name": "Storage",
                    "children": [
                        { "id": "storage-hot", "name": "Hot tier" },
                        { "id": "storage-cold", "name": "Cold tier" },
                        { "id": "storage-index", "name": "Index" }
                    ]
                },
                { "id": "query", "name": "Query" }
            ]
        },
        "hierarchyEdges": [
            { "source": "ingest-queue", "target": "storage-hot" },
            { "source": "storage-index", "target": "query" }
        ],
        "outsideNodes": [
            { "id": "billing", "name": "Billing" },
            { "id": "auth", "name": "Auth" },
            { "id": "dashboards", "name": "Dashboards" },
            { "id": "alerts", "name": "Alerts" },
            { "id": "archive", "name": "Archive" }
        ],
        "outsideEdges": [
            { "source": "billing", "target": "query", "weight": 1.0 },
            { "source": "auth", "target": "ingest-api", "weight": 2.0 },
            { "source": "auth", "target": "query" },
            { "source": "dashboards", "target": "query", "weight": 2.0 },
            { "source": "alerts", "target": "dashboards" },
            { "source": "archive", "target": "storage-cold", "weight": 1.5 }
        ]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_snapshot_is_a_valid_graph() {
        let snapshot = load_snapshot(None).unwrap();
        assert_eq!(snapshot.hierarchy.len(), 9);
        assert_eq!(snapshot.outside_nodes.len(), 5);

        let ids = snapshot.node_ids();
        for edge in snapshot.outside_edges.iter().chain(&snapshot.hierarchy_edges) {
            assert!(ids.contains(edge.source.as_str()), "{}", edge.source);
            assert!(ids.contains(edge.target.as_str()), "{}", edge.target);
        }
    }
}
