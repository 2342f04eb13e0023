//! Run one query through the full search pipeline and print the response body.
//! Usage:
//!   cargo run --bin search_probe -- spider man [--type person] [--page 2]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cinegate::models::{PersonResultPage, ResultPage};
use cinegate::query::normalize_query;
use cinegate::search::{self, SearchOutcome, SearchTarget};
use cinegate::tmdb::TmdbClient;
use dotenvy::dotenv;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();

    let mut query_parts: Vec<String> = Vec::new();
    let mut target = SearchTarget::Multi;
    let mut page = 1u32;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--type" => {
                let value = args.next().context("--type needs a value")?;
                target = SearchTarget::parse(&value)
                    .ok_or_else(|| anyhow::anyhow!("unknown search type '{}'", value))?;
            }
            "--page" => {
                page = args
                    .next()
                    .context("--page needs a value")?
                    .parse()
                    .context("page must be a number")?;
            }
            other => query_parts.push(other.to_string()),
        }
    }

    let query = normalize_query(&query_parts.join(" "));
    if query.is_empty() {
        eprintln!(
            "Usage: cargo run --bin search_probe -- <query> [--type multi|movie|series|person] [--page N]"
        );
        std::process::exit(1);
    }

    let tmdb = TmdbClient::from_env()?;
    let outcome = search::dispatch(&tmdb, &query, page, target).await?;
    let body = match outcome {
        SearchOutcome::Titles(results) => serde_json::to_value(ResultPage { results })?,
        SearchOutcome::Person {
            results,
            matched_names,
        } => serde_json::to_value(PersonResultPage {
            results,
            person_name: matched_names,
        })?,
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
