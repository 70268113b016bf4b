//! `scout discover`: run one search and print the results.

use std::sync::Arc;

use anyhow::Context;
use scout_core::{AppConfig, BusinessResult, Continuation, SearchRequest};
use scout_discovery::{DiscoveryOutcome, ResultCache};

pub(crate) struct DiscoverArgs {
    pub query: String,
    pub location: String,
    pub radius_miles: f64,
    pub limit: u32,
    pub page_token: Option<String>,
    pub json: bool,
}

/// Builds the search request, decoding `--page-token` if given.
pub(crate) fn build_request(args: &DiscoverArgs) -> anyhow::Result<SearchRequest> {
    let mut request = SearchRequest::new(&args.query, &args.location, args.radius_miles, args.limit);
    if let Some(token) = &args.page_token {
        let continuation = Continuation::decode(token)
            .with_context(|| format!("invalid page token '{token}'"))?;
        request = request.with_continuation(continuation);
    }
    Ok(request)
}

/// Runs one discovery search and prints it as a table or JSON.
///
/// # Errors
///
/// Returns an error if the page token is malformed, no provider keys are
/// configured, or the search fails.
pub(crate) async fn run_discover(
    config: &AppConfig,
    cache: Arc<ResultCache>,
    args: &DiscoverArgs,
) -> anyhow::Result<()> {
    let request = build_request(args)?;
    let outcome =
        scout_discovery::discover(config, cache, &request, &config.credentials()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_table(&outcome);
    }
    Ok(())
}

fn fmt_distance(result: &BusinessResult) -> String {
    result
        .distance_miles
        .map_or_else(|| "\u{2014}".to_string(), |d| format!("{d:.1} mi"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_owned()
    }
}

fn print_table(outcome: &DiscoveryOutcome) {
    if outcome.results.is_empty() {
        println!("no businesses found");
    } else {
        println!(
            "{:<40}{:<10}{:<8}{:<15}ADDRESS",
            "NAME", "DISTANCE", "RATING", "SOURCE"
        );
        for r in &outcome.results {
            let rating = r.rating.map_or_else(String::new, |v| format!("{v:.1}"));
            println!(
                "{:<40}{:<10}{:<8}{:<15}{}",
                truncate(&r.name, 36),
                fmt_distance(r),
                rating,
                r.source,
                r.address.as_deref().unwrap_or_default()
            );
        }
    }

    let strategy = outcome
        .strategy
        .map_or_else(|| "none".to_owned(), |s| format!("{s:?}"));
    println!(
        "\n{} result(s) via {} ({strategy}){}",
        outcome.results.len(),
        outcome
            .provider
            .map_or_else(|| "no provider".to_owned(), |p| p.to_string()),
        if outcome.from_cache { ", cached" } else { "" }
    );
    if let Some(next) = &outcome.next_page {
        println!("more results available: --page-token {}", next.encode());
    }
}
