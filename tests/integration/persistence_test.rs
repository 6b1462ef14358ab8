//! Persistence Integration Tests
//!
//! Layouts and config saved to a temporary directory, and result items
//! through their JSON wire form.

use insight_desk::models::layout::LayoutConfiguration;
use insight_desk::models::settings::SettingsUpdate;
use insight_desk::storage::config::ConfigService;
use insight_desk::storage::layout::LayoutStore;
use insight_desk_core::{FileData, ResultData, ResultItem, ResultItemType, ResultMetadata, ResultSource};
use serde_json::json;
use tempfile::TempDir;

fn create_layout_store() -> (TempDir, LayoutStore) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = LayoutStore::with_dir(dir.path().join("layouts")).expect("Failed to create layout store");
    (dir, store)
}

// ============================================================================
// Layouts
// ============================================================================

#[test]
fn test_layout_widths_survive_save_and_load() {
    let (_dir, store) = create_layout_store();
    let mut layout = LayoutConfiguration::default_for("analyst");
    layout.items.truncate(4);
    for (item, width) in layout.items.iter_mut().zip([37, 88, 1, 100]) {
        item.w = width;
    }

    let saved = store.save(layout.clone(), 1_700_000_000_000).unwrap();
    let loaded = store.load("analyst").unwrap().unwrap();

    assert_eq!(loaded, saved);
    let widths: Vec<i32> = loaded.items.iter().map(|item| item.w).collect();
    assert_eq!(widths, vec![37, 88, 1, 100]);
    for (before, after) in layout.items.iter().zip(&loaded.items) {
        assert_eq!(
            (&before.i, &before.component_type, before.x, before.y, before.w, before.h),
            (&after.i, &after.component_type, after.x, after.y, after.w, after.h)
        );
    }
}

#[test]
fn test_layout_timestamps() {
    let (_dir, store) = create_layout_store();

    let first = store.save(LayoutConfiguration::default_for("u1"), 100).unwrap();
    assert_eq!((first.created_at, first.updated_at), (100, 100));

    let second = store.save(first, 250).unwrap();
    assert_eq!((second.created_at, second.updated_at), (100, 250));
}

#[test]
fn test_layout_default_and_delete() {
    let (_dir, store) = create_layout_store();

    let fallback = store.load_or_default("nobody").unwrap();
    assert_eq!(fallback, LayoutConfiguration::default_for("nobody"));

    store.save(LayoutConfiguration::default_for("u1"), 1).unwrap();
    assert!(store.delete("u1").unwrap());
    assert!(!store.delete("u1").unwrap());
    assert!(store.load("u1").unwrap().is_none());
}

#[test]
fn test_layout_rejects_path_like_user_ids() {
    let (_dir, store) = create_layout_store();
    assert!(store.load("../etc").is_err());
    assert!(store.save(LayoutConfiguration::default_for(".."), 1).is_err());
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_update_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut service = ConfigService::open(path.clone()).unwrap();
    service
        .update_config(SettingsUpdate {
            loading_timeout_ms: Some(120_000),
            ..Default::default()
        })
        .unwrap();

    let reopened = ConfigService::open(path).unwrap();
    assert_eq!(reopened.get_config().loading_timeout_ms, 120_000);
    assert_eq!(
        reopened.get_config().loading_config().timeout,
        std::time::Duration::from_secs(120)
    );
}

// ============================================================================
// Result items
// ============================================================================

#[test]
fn test_result_item_wire_form_preserved() {
    let wire = json!({
        "id": "file-1",
        "type": "file",
        "data": {"fileName": "report.xlsx", "filePath": "/tmp/report.xlsx", "fileType": "xlsx"},
        "metadata": {"sessionId": "s1", "messageId": "m1", "timestamp": 1700000000000i64, "fileName": "report.xlsx"},
        "source": "completed"
    });

    let item: ResultItem = serde_json::from_value(wire.clone()).unwrap();
    assert_eq!(item.item_type(), ResultItemType::File);
    assert_eq!(
        item,
        ResultItem {
            id: "file-1".to_string(),
            data: ResultData::File(FileData {
                file_name: "report.xlsx".to_string(),
                file_path: "/tmp/report.xlsx".to_string(),
                file_type: "xlsx".to_string(),
            }),
            metadata: ResultMetadata {
                session_id: "s1".to_string(),
                message_id: "m1".to_string(),
                timestamp: 1_700_000_000_000,
                file_name: Some("report.xlsx".to_string()),
            },
            source: ResultSource::Completed,
        }
    );
    assert_eq!(serde_json::to_value(&item).unwrap(), wire);
}
