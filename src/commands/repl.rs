//! Interactive chat: startup sync, collection menu and the chat loop

use crate::catalog;
use crate::commands::{
    cmd_ask, cmd_sync, plan_startup, print_sync_stats, Services, StartupPlan, SyncOptions,
};
use crate::error::{Error, Result};
use crate::ui;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

/// A line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Exit,
    Back,
    Help,
    Clear,
    Empty,
    Question(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "/exit" => ChatInput::Exit,
            "/back" => ChatInput::Back,
            "/help" => ChatInput::Help,
            "/clear" => ChatInput::Clear,
            "" => ChatInput::Empty,
            _ => ChatInput::Question(trimmed.to_string()),
        }
    }
}

/// Answer to the collection menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Exit,
    Collection(String),
    Invalid,
}

impl MenuChoice {
    /// `input` is `exit` or a 1-based index into `collections`
    pub fn parse(input: &str, collections: &[String]) -> Self {
        let input = input.trim();
        if input.eq_ignore_ascii_case("exit") {
            return MenuChoice::Exit;
        }
        input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| collections.get(idx))
            .map(|name| MenuChoice::Collection(name.clone()))
            .unwrap_or(MenuChoice::Invalid)
    }
}

/// Whether a y/N answer is a yes
pub fn confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Message shown when a question fails; the chat stays open either way
pub fn describe_error(err: &Error) -> String {
    if err.is_capability_failure() {
        format!("{} (the service may be unavailable, try again)", err)
    } else {
        err.to_string()
    }
}

/// Line-oriented reader over stdin
pub struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Show `prompt` and read one line; `None` once stdin is closed
    pub async fn read(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }
}

/// Run the interactive chat
pub async fn cmd_chat(services: &Services) -> Result<()> {
    let mut prompter = Prompter::stdin();
    ui::header("RAG AI Sandbox");

    startup_sync(services, &mut prompter).await?;

    let mut session = services.session();
    let model_name = services.model.model_name().to_string();
    let stream = services.config.chat.stream;

    loop {
        let collections = catalog::list_collections(&services.config.paths.storage_dir)?;
        if collections.is_empty() {
            ui::error("No collections found to query.");
            return Ok(());
        }

        ui::collection_menu(&collections);
        let Some(selection) = prompter.read("\n➤ Selection (or 'exit'): ").await? else {
            return Ok(());
        };

        let collection = match MenuChoice::parse(&selection, &collections) {
            MenuChoice::Exit => return Ok(()),
            MenuChoice::Invalid => {
                ui::error("Invalid choice.");
                continue;
            }
            MenuChoice::Collection(name) => name,
        };

        println!("\n💬 Context: [{}] | Type /help for options.", collection);

        loop {
            let prompt = format!("\n👤 [{}] You: ", collection);
            let Some(line) = prompter.read(&prompt).await? else {
                return Ok(());
            };

            match ChatInput::parse(&line) {
                ChatInput::Exit => return Ok(()),
                ChatInput::Back => {
                    session.clear_context();
                    break;
                }
                ChatInput::Help => ui::show_help(),
                ChatInput::Clear => {
                    session.clear_context();
                    ui::success("Memory cleared.");
                }
                ChatInput::Empty => {}
                ChatInput::Question(question) => {
                    let result =
                        cmd_ask(&mut session, &model_name, &collection, &question, stream).await;
                    if let Err(e) = result {
                        ui::error(&describe_error(&e));
                    }
                }
            }
        }
    }
}

/// Index the data root on first start, or rebuild it on request
async fn startup_sync(services: &Services, prompter: &mut Prompter) -> Result<()> {
    let storage = &services.config.paths.storage_dir;
    let options = match plan_startup(services)? {
        StartupPlan::InitialIngest => {
            ui::info("No database found. Starting initial ingestion...");
            SyncOptions::default()
        }
        StartupPlan::OfferReindex => {
            ui::info(&format!("Existing database found at: {}", storage.display()));
            let answer = prompter
                .read("➤ Do you want to update the database (re-index files)? (y/N): ")
                .await?
                .unwrap_or_default();
            if !confirmed(&answer) {
                debug!("Keeping existing index");
                return Ok(());
            }
            ui::info("Cleaning storage...");
            SyncOptions {
                collection: None,
                reset: true,
            }
        }
    };

    let stats = cmd_sync(services, options).await?;
    print_sync_stats(&stats);
    Ok(())
}
