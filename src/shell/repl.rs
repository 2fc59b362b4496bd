use log::info;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::{Reply, Shell, ShellResult};

/// Read-eval-print loop on the terminal until `quit`, Ctrl-C or Ctrl-D
pub fn run(order: usize) -> ShellResult<()> {
    let mut shell = Shell::new(order);
    let mut editor = DefaultEditor::new()?;

    info!("shell started with order {}", shell.tree().order());
    println!("B+ tree shell (order {}). Type `help` for commands.", shell.tree().order());

    loop {
        match editor.readline("bptree> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;

                match shell.run_line(line) {
                    Ok(Reply::Text(out)) => println!("{}", out),
                    Ok(Reply::Quit) => break,
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
