//! CLI interface for tour-search

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tour_search::{
    login, search_tours, ApiConfig, ControllerState, HttpGateway, SearchController, Session,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tour-search")]
#[command(about = "Search a remote tours/packages API with autocomplete")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and search for tours
    Search {
        /// Account email
        #[arg(short, long)]
        email: String,
        /// Account password
        #[arg(short, long)]
        password: String,
        /// Search query; omit to type interactively
        #[arg(short, long)]
        query: Option<String>,
        /// Travel date (YYYY-MM-DD), echoed with the results
        #[arg(short, long)]
        date: Option<String>,
        /// Override the API base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            email,
            password,
            query,
            date,
            base_url,
            output,
        } => {
            let config = match base_url {
                Some(url) => ApiConfig::with_base_url(url),
                None => ApiConfig::default(),
            };

            let travel_date = date
                .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
                .transpose()
                .context("travel date must be YYYY-MM-DD")?;

            let session = match login(&config, &email, &password).await {
                Ok(session) => session,
                Err(e) => {
                    // Fixed message only; the underlying cause stays in the logs.
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            };

            match query {
                Some(query) => {
                    one_shot_search(&config, &query, &session, travel_date, output).await?
                }
                None => interactive_search(&config, &session, travel_date).await?,
            }
        }
    }

    Ok(())
}

async fn one_shot_search(
    config: &ApiConfig,
    query: &str,
    session: &Session,
    travel_date: Option<NaiveDate>,
    output: Option<String>,
) -> anyhow::Result<()> {
    println!("Searching for tours...");
    match search_tours(config, query, session.token()).await {
        Ok(results) => {
            let json = serde_json::to_string_pretty(&results)?;

            if let Some(output_file) = output {
                fs::write(&output_file, &json)?;
                println!("Results saved to {}", output_file);
            } else {
                println!("{}", json);
            }

            println!("\nSummary:");
            if let Some(date) = travel_date {
                println!("Travel date: {}", date);
            }
            println!(
                "Found {} destinations, {} products",
                results.destinations.len(),
                results.products.len()
            );
            for line in results.display_lines() {
                println!("  {}", line);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Drive the controller from stdin. Each line is treated as the input
/// field's new text; an empty line submits, `!pick N` selects the Nth
/// suggestion, `!quit` exits.
async fn interactive_search(
    config: &ApiConfig,
    session: &Session,
    travel_date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let gateway = Arc::new(HttpGateway::new(config)?);
    let mut controller = SearchController::new(gateway, session, config);

    println!("Type a place or activity; empty line submits, !pick N selects, !quit exits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    enum Step {
        Line(String),
        Event(tour_search::SearchEvent),
        Done,
    }

    loop {
        // Resolve the select into a value first; the handlers below need the
        // controller mutably and the pending next_event future also holds it.
        let step = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => Step::Line(line.trim_end().to_string()),
                None => Step::Done,
            },
            event = controller.next_event() => match event {
                Some(event) => Step::Event(event),
                None => Step::Done,
            },
        };

        match step {
            Step::Done => break,
            Step::Event(event) => {
                controller.handle_event(event);
                render(controller.state(), travel_date);
            }
            Step::Line(line) => {
                if line == "!quit" {
                    break;
                } else if let Some(n) = line.strip_prefix("!pick ") {
                    let index: usize = n.trim().parse().context("!pick needs a number")?;
                    match controller.state().suggestions.get(index).cloned() {
                        Some(suggestion) => {
                            controller.on_suggestion_pick(suggestion);
                            println!("Picked: {}", controller.state().query);
                        }
                        None => println!("No suggestion at index {}", index),
                    }
                } else if line.is_empty() {
                    controller.on_submit();
                    render(controller.state(), travel_date);
                } else {
                    controller.on_query_change(&line);
                }
            }
        }
    }

    Ok(())
}

fn render(state: &ControllerState, travel_date: Option<NaiveDate>) {
    if state.is_loading {
        println!("Loading...");
        return;
    }
    if let Some(error) = &state.error_message {
        println!("{}", error);
        return;
    }
    if !state.suggestions.is_empty() {
        println!("Suggestions:");
        for (i, suggestion) in state.suggestions.iter().enumerate() {
            println!("  [{}] {}", i, suggestion.display_line());
        }
    }
    if !state.results.is_empty() {
        println!("Search Results:");
        if let Some(date) = travel_date {
            println!("  When: {}", date);
        }
        for line in state.results.display_lines() {
            println!("  {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "tour-search",
            "search",
            "--email",
            "user@example.com",
            "--password",
            "hunter2",
            "--query",
            "Lagos",
        ]);

        assert!(cli.is_ok());

        if let Ok(Cli {
            command:
                Commands::Search {
                    email,
                    query,
                    date,
                    ..
                },
        }) = cli
        {
            assert_eq!(email, "user@example.com");
            assert_eq!(query.as_deref(), Some("Lagos"));
            assert!(date.is_none());
        }
    }

    #[test]
    fn test_cli_requires_credentials() {
        let cli = Cli::try_parse_from(["tour-search", "search", "--query", "Lagos"]);
        assert!(cli.is_err());
    }
}
