//! Interactive question loop

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use super::commands::{build_service, print_answer};

const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "q"];

/// Answer questions read from stdin until EOF or an exit command
pub async fn run() -> anyhow::Result<()> {
    let service = build_service().await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Corrective RAG interactive mode. Type 'quit' to exit.");

    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }

        match service.query(question, None, false).await {
            Ok(result) => print_answer(&result)?,
            Err(e) => {
                error!("Query failed: {}", e);
                println!("Error: {}", e);
            }
        }
    }

    println!("Goodbye");
    Ok(())
}

fn is_exit(input: &str) -> bool {
    EXIT_COMMANDS.contains(&input.to_lowercase().as_str())
}
