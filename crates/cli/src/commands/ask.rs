//! `kbchat ask`: Single question or interactive session.

use std::io::Write;
use kbchat_agent::KnowledgeAgent;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::setup;

pub async fn run(question: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    setup::require_api_key(&config)?;
    let agent = setup::agent(&config)?;

    if let Some(question) = question {
        eprint!("  Thinking...");
        let answer = agent.query(&question).await;
        eprint!("\r              \r");
        println!("{}", answer?);
        return Ok(());
    }

    println!();
    println!("  kbchat — Interactive Mode");
    println!();
    println!("  Provider:   {}", agent.generator().provider_name());
    println!("  Model:      {}", agent.generator().settings().model);
    println!("  Documents:  {}", agent.document_count().await);
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    interactive(&agent).await?;

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

async fn interactive(agent: &KnowledgeAgent) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        eprint!("  ...");
        let result = agent.query(line).await;
        eprint!("\r     \r");

        match result {
            Ok(answer) => {
                println!();
                for text in answer.lines() {
                    println!("  Assistant > {text}");
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    Ok(())
}
