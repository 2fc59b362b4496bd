//! Interactive command shell over a `BPlusTree<i64, String>`

mod command;
mod error;

pub mod demo;
pub mod repl;

pub use command::{parse_command, parser, Command};
pub use error::{ShellError, ShellResult};

use prettytable::{row, Table};

use crate::btree::{BPlusTree, BPlusTreeError};

const HELP: &str = "\
insert <key> <value>   add a new key
update <key> <value>   overwrite an existing key
upsert <key> <value>   insert or overwrite
delete <key>           remove a key
query <key>            look up a key
range <low> <high>     list keys in [low, high]
list                   list every entry in order
stats                  show tree counters
dump                   print the tree shape as JSON
check                  verify tree invariants
quit | exit            leave the shell";

/// Result of running one command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub struct Shell {
    tree: BPlusTree<i64, String>,
}

impl Shell {
    pub fn new(order: usize) -> Self {
        Self {
            tree: BPlusTree::new(order),
        }
    }

    pub fn tree(&self) -> &BPlusTree<i64, String> {
        &self.tree
    }

    /// Parse and run a single line
    pub fn run_line(&mut self, line: &str) -> ShellResult<Reply> {
        let command = parse_command(line).map_err(ShellError::Parse)?;
        self.execute(command)
    }

    pub fn execute(&mut self, command: Command) -> ShellResult<Reply> {
        let text = match command {
            Command::Insert(key, value) => {
                let (inserted, leaf) = self.tree.insert(key, value)?;
                if !inserted {
                    return Err(BPlusTreeError::DuplicateKey.into());
                }
                format!("inserted {} into leaf {}", key, leaf)
            }
            Command::Update(key, value) => {
                let (updated, leaf) = self.tree.update(key, value)?;
                if !updated {
                    return Err(BPlusTreeError::KeyNotFound.into());
                }
                format!("updated {} in leaf {}", key, leaf)
            }
            Command::Upsert(key, value) => match self.tree.upsert(key, value)? {
                Some(old) => format!("replaced {} (was {})", key, old),
                None => format!("inserted {}", key),
            },
            Command::Delete(key) => {
                let value = self.tree.delete(&key)?;
                format!("deleted {} ({})", key, value)
            }
            Command::Query(key) => match self.tree.query(&key) {
                Some(value) => value.clone(),
                None => "(absent)".to_string(),
            },
            Command::Range(lower, upper) => {
                format_entries(self.tree.range_search(&lower, &upper))
            }
            Command::List => format_entries(self.tree.iter()),
            Command::Stats => stats_table(&self.tree).to_string(),
            Command::Dump => serde_json::to_string_pretty(&self.tree.snapshot()?)?,
            Command::Check => {
                self.tree.validate()?;
                "ok".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };

        Ok(Reply::Text(text))
    }
}

fn format_entries<'a>(entries: impl Iterator<Item = (&'a i64, &'a String)>) -> String {
    let lines: Vec<String> = entries.map(|(k, v)| format!("{} = {}", k, v)).collect();
    if lines.is_empty() {
        "(empty)".to_string()
    } else {
        lines.join("\n")
    }
}

/// Counters and shape figures of a tree as a printable table
pub fn stats_table<K: Ord + Clone, V>(tree: &BPlusTree<K, V>) -> Table {
    let stats = tree.stats();

    let mut table = Table::new();
    table.add_row(row!["entries", tree.len()]);
    table.add_row(row!["order", tree.order()]);
    table.add_row(row!["depth", tree.depth()]);
    table.add_row(row!["nodes", tree.node_count()]);
    table.add_row(row!["splits", stats.splits]);
    table.add_row(row!["internal splits", stats.internal_splits]);
    table.add_row(row!["fusions", stats.fusions]);
    table.add_row(row!["internal fusions", stats.internal_fusions]);
    table.add_row(row!["borrows", stats.borrows]);
    table.add_row(row!["internal borrows", stats.internal_borrows]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(reply: ShellResult<Reply>) -> String {
        match reply.unwrap() {
            Reply::Text(s) => s,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_insert_and_query() {
        let mut shell = Shell::new(4);

        assert!(text(shell.run_line("insert 1 one")).starts_with("inserted 1"));
        assert_eq!(text(shell.run_line("query 1")), "one");
        assert_eq!(text(shell.run_line("query 2")), "(absent)");
    }

    #[test]
    fn test_duplicate_and_missing_keys_are_errors() {
        let mut shell = Shell::new(4);
        shell.run_line("insert 1 one").unwrap();

        assert!(matches!(
            shell.run_line("insert 1 uno"),
            Err(ShellError::Tree(BPlusTreeError::DuplicateKey))
        ));
        assert!(matches!(
            shell.run_line("update 2 two"),
            Err(ShellError::Tree(BPlusTreeError::KeyNotFound))
        ));
        assert!(matches!(
            shell.run_line("delete 2"),
            Err(ShellError::Tree(BPlusTreeError::KeyNotFound))
        ));
        assert_eq!(text(shell.run_line("query 1")), "one");
    }

    #[test]
    fn test_update_upsert_delete() {
        let mut shell = Shell::new(2);
        for i in 0..10 {
            shell.run_line(&format!("insert {} v{}", i, i)).unwrap();
        }

        text(shell.run_line("update 3 three"));
        assert_eq!(text(shell.run_line("upsert 3 THREE")), "replaced 3 (was three)");
        assert_eq!(text(shell.run_line("upsert 30 x")), "inserted 30");
        assert_eq!(text(shell.run_line("delete 30")), "deleted 30 (x)");
        assert_eq!(text(shell.run_line("range 2 4")), "2 = v2\n3 = THREE\n4 = v4");
        assert_eq!(text(shell.run_line("check")), "ok");
    }

    #[test]
    fn test_listing_and_reports() {
        let mut shell = Shell::new(4);
        assert_eq!(text(shell.run_line("list")), "(empty)");

        for i in [3, 1, 2] {
            shell.run_line(&format!("insert {} x", i)).unwrap();
        }

        assert_eq!(text(shell.run_line("list")), "1 = x\n2 = x\n3 = x");
        assert!(text(shell.run_line("stats")).contains("splits"));
        assert!(text(shell.run_line("dump")).contains("\"kind\": \"leaf\""));
        assert!(text(shell.run_line("help")).contains("upsert"));
        assert_eq!(shell.run_line("quit").unwrap(), Reply::Quit);
        assert_eq!(shell.tree().len(), 3);
    }

    #[test]
    fn test_parse_error() {
        let mut shell = Shell::new(4);
        assert!(matches!(shell.run_line("bogus"), Err(ShellError::Parse(_))));
    }
}
