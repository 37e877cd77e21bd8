//! Collections command implementation

use crate::catalog;
use crate::config::Config;
use crate::error::Result;

/// One collection under the data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCollection {
    pub name: String,
    pub files: usize,
    pub indexed: bool,
}

/// Collections known on disk
#[derive(Debug, Clone, Default)]
pub struct CollectionsInfo {
    pub data: Vec<DataCollection>,
    /// Indexed collections with no data directory left
    pub orphaned: Vec<String>,
}

/// List data collections and whether each one has been indexed
pub fn cmd_collections(config: &Config) -> Result<CollectionsInfo> {
    let indexed = catalog::list_collections(&config.paths.storage_dir)?;
    let mut info = CollectionsInfo::default();

    for name in catalog::list_collections(&config.paths.data_dir)? {
        let files = catalog::list_files(&config.paths.data_dir.join(&name), &config.ingest.extension)?;
        info.data.push(DataCollection {
            indexed: indexed.contains(&name),
            files: files.len(),
            name,
        });
    }

    info.orphaned = indexed
        .into_iter()
        .filter(|name| !info.data.iter().any(|c| &c.name == name))
        .collect();

    Ok(info)
}

/// Print collections to console
pub fn print_collections(info: &CollectionsInfo, config: &Config) {
    println!("\n📚 Collections\n");

    if info.data.is_empty() && info.orphaned.is_empty() {
        println!(
            "No collections found. Add folders of .{} files under {}.",
            config.ingest.extension.trim_start_matches('.'),
            config.paths.data_dir.display()
        );
        return;
    }

    for collection in &info.data {
        let status = if collection.indexed {
            "✓ indexed"
        } else {
            "⚠ not indexed"
        };
        println!(
            "• {} ({} files) {}",
            collection.name, collection.files, status
        );
    }

    for name in &info.orphaned {
        println!("• {} (indexed, source folder missing)", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{data_collection, services};
    use crate::testing::ScriptedModel;
    use tempfile::TempDir;

    #[test]
    fn test_collections_reports_index_state() {
        let tmp = TempDir::new().unwrap();
        let (services, _) = services(tmp.path(), ScriptedModel::new());
        data_collection(tmp.path(), "hr", &[("a.txt", "a"), ("b.txt", "b"), ("c.md", "c")]);
        data_collection(tmp.path(), "eng", &[("a.txt", "a")]);
        std::fs::create_dir_all(tmp.path().join("storage").join("hr")).unwrap();
        std::fs::create_dir_all(tmp.path().join("storage").join("legacy")).unwrap();

        let info = cmd_collections(&services.config).unwrap();
        assert_eq!(
            info.data,
            vec![
                DataCollection {
                    name: "eng".to_string(),
                    files: 1,
                    indexed: false
                },
                DataCollection {
                    name: "hr".to_string(),
                    files: 2,
                    indexed: true
                },
            ]
        );
        assert_eq!(info.orphaned, vec!["legacy"]);
    }
}
