use gcsb_types::{DisplayEntry, ListResult};

/// Convert one delimited listing into the display entries of the folder
/// at `prefix`.
///
/// - Items become files, or folders when their key ends in `/`.
/// - The marker object whose key equals `prefix` is dropped: it is the
///   current folder itself, not content within it.
/// - Common prefixes become folders.
/// - Ids are normalized to bare keys.
///
/// Items come first in listing order, followed by the common prefixes. A
/// folder that exists both as a marker item and as a common prefix is
/// emitted once.
pub fn reconcile(bucket: &str, prefix: &str, listing: &ListResult) -> Vec<DisplayEntry> {
    let mut entries: Vec<DisplayEntry> = listing
        .items
        .iter()
        .filter(|item| item.name != prefix)
        .map(|item| DisplayEntry::from_item(bucket, item))
        .collect();

    for common in &listing.prefixes {
        if entries.iter().any(|e| e.is_dir && e.id == *common) {
            continue;
        }
        entries.push(DisplayEntry::from_prefix(common));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcsb_types::ObjectItem;

    fn item(bucket: &str, name: &str, size: u64, generation: u64) -> ObjectItem {
        ObjectItem {
            name: name.into(),
            size,
            updated: None,
            id: format!("{bucket}/{name}/{generation}"),
        }
    }

    #[test]
    fn listing_scenario() {
        let listing = ListResult {
            items: vec![ObjectItem {
                name: "a/b.txt".into(),
                size: 12,
                updated: Some("2022-04-23T10:00:00Z".parse().unwrap()),
                id: "my-bucket/a/b.txt/100".into(),
            }],
            prefixes: vec!["a/c/".into()],
            next_page_token: None,
        };
        let entries = reconcile("my-bucket", "a/", &listing);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].id, "a/b.txt");
        assert_eq!(entries[0].name, "b.txt");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[0].size, 12);
        assert!(entries[0].modified.is_some());

        assert_eq!(entries[1].id, "a/c/");
        assert_eq!(entries[1].name, "c");
        assert!(entries[1].is_dir);
        assert_eq!(entries[1].size, 0);
    }

    #[test]
    fn drops_folder_self_marker() {
        let listing = ListResult {
            items: vec![item("b", "x/", 0, 1), item("b", "x/y.txt", 3, 2)],
            ..Default::default()
        };
        let entries = reconcile("b", "x/", &listing);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "x/y.txt");
    }

    #[test]
    fn marker_and_prefix_for_same_folder_emit_once() {
        let listing = ListResult {
            items: vec![item("b", "x/sub/", 0, 1)],
            prefixes: vec!["x/sub/".into()],
            ..Default::default()
        };
        let entries = reconcile("b", "x/", &listing);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_dir);
        assert_eq!(entries[0].name, "sub");
    }

    #[test]
    fn empty_listing() {
        assert!(reconcile("b", "", &ListResult::default()).is_empty());
    }

    #[test]
    fn every_entry_reconstructs_its_key() {
        let listing = ListResult {
            items: vec![
                item("b", "p/q/", 0, 1),
                item("b", "p/q/r.txt", 1, 2),
                item("b", "p/q/s", 1, 3),
            ],
            prefixes: vec!["p/q/t/".into(), "p/q/u v/".into()],
            ..Default::default()
        };
        let prefix = "p/q/";
        for entry in reconcile("b", prefix, &listing) {
            assert_eq!(entry.key_under(prefix), entry.id);
        }
    }
}
