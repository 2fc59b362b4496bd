//! Randomised walkthrough: insert a sample of keys, then delete them all in
//! shuffled order, checking the tree after every step.

use log::{debug, info};
use prettytable::{Table, row};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::ShellResult;
use crate::btree::{BPlusTree, TreeStats};

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub order: usize,
    pub count: usize,
    /// Keys are drawn from 1..max_key
    pub max_key: i64,
    pub seed: Option<u64>,
    /// Capture a JSON snapshot once every key is in
    pub dump: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            order: 6,
            count: 20,
            max_key: 100,
            seed: None,
            dump: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoReport {
    pub inserted: Vec<i64>,
    pub deleted: Vec<i64>,
    pub peak_depth: usize,
    pub stats: TreeStats,
    pub snapshot: Option<String>,
}

impl DemoReport {
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["keys", self.inserted.len()]);
        table.add_row(row!["peak depth", self.peak_depth]);
        table.add_row(row!["splits", self.stats.splits]);
        table.add_row(row!["internal splits", self.stats.internal_splits]);
        table.add_row(row!["fusions", self.stats.fusions]);
        table.add_row(row!["internal fusions", self.stats.internal_fusions]);
        table.add_row(row!["borrows", self.stats.borrows]);
        table.add_row(row!["internal borrows", self.stats.internal_borrows]);
        table
    }
}

pub fn run_demo(config: &DemoConfig) -> ShellResult<DemoReport> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let population: Vec<i64> = (1..config.max_key.max(1)).collect();
    let inserted: Vec<i64> = population
        .choose_multiple(&mut rng, config.count)
        .copied()
        .collect();

    let mut tree = BPlusTree::new(config.order);
    let mut peak_depth = 0;

    for &key in &inserted {
        tree.insert(key, format!("test{}", key))?;
        tree.validate()?;
        peak_depth = peak_depth.max(tree.depth());
        info!("insert {} (depth {})", key, tree.depth());
    }

    let snapshot = if config.dump {
        Some(serde_json::to_string_pretty(&tree.snapshot()?)?)
    } else {
        None
    };

    let mut deleted = inserted.clone();
    deleted.shuffle(&mut rng);

    for key in &deleted {
        tree.delete(key)?;
        tree.validate()?;
        info!("delete {} (depth {})", key, tree.depth());
    }
    debug!("demo finished with {} nodes", tree.node_count());

    Ok(DemoReport {
        inserted,
        deleted,
        peak_depth,
        stats: tree.stats(),
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_is_reproducible() {
        let config = DemoConfig {
            seed: Some(7),
            ..DemoConfig::default()
        };

        let a = run_demo(&config).unwrap();
        let b = run_demo(&config).unwrap();

        assert_eq!(a.inserted, b.inserted);
        assert_eq!(a.deleted, b.deleted);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn test_demo_deletes_every_key() {
        let config = DemoConfig {
            order: 3,
            count: 60,
            max_key: 500,
            seed: Some(99),
            dump: true,
        };

        let report = run_demo(&config).unwrap();

        assert_eq!(report.inserted.len(), 60);
        let mut inserted = report.inserted.clone();
        let mut deleted = report.deleted.clone();
        inserted.sort();
        deleted.sort();
        assert_eq!(inserted, deleted);
        assert!(report.peak_depth >= 2);
        assert!(report.stats.fusions > 0);
        assert!(report.table().to_string().contains("peak depth"));
        assert!(report.snapshot.unwrap().contains("\"depth\""));
    }

    #[test]
    fn test_demo_clamps_sample_size() {
        let config = DemoConfig {
            count: 50,
            max_key: 10,
            seed: Some(1),
            ..DemoConfig::default()
        };

        let report = run_demo(&config).unwrap();
        assert_eq!(report.inserted.len(), 9);
    }
}
