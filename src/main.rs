use bptree::DEFAULT_ORDER;
use bptree::shell::demo::{DemoConfig, run_demo};
use bptree::shell::{ShellResult, repl};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bptree", version, about = "In-memory B+ tree index")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive shell over an integer-keyed tree (default)
    Shell {
        /// Maximum keys per node (values below 2 are clamped)
        #[arg(short, long, default_value_t = DEFAULT_ORDER)]
        order: usize,
    },
    /// Insert random keys, then delete them in shuffled order
    Demo {
        #[arg(short, long, default_value_t = 6)]
        order: usize,

        /// Number of distinct keys to insert
        #[arg(short, long, default_value_t = 20)]
        count: usize,

        /// Keys are drawn from 1..MAX_KEY
        #[arg(long, default_value_t = 100)]
        max_key: i64,

        #[arg(long)]
        seed: Option<u64>,

        /// Print the tree as JSON once every key is inserted
        #[arg(long)]
        dump: bool,
    },
}

fn run(command: Commands) -> ShellResult<()> {
    match command {
        Commands::Shell { order } => repl::run(order),
        Commands::Demo {
            order,
            count,
            max_key,
            seed,
            dump,
        } => {
            let report = run_demo(&DemoConfig {
                order,
                count,
                max_key,
                seed,
                dump,
            })?;

            println!("inserted: {:?}", report.inserted);
            if let Some(json) = &report.snapshot {
                println!("{}", json);
            }
            println!("deleted:  {:?}", report.deleted);
            report.table().printstd();
            Ok(())
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Shell {
        order: DEFAULT_ORDER,
    });

    if let Err(e) = run(command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
