//! Graph commands - rebuild, pattern analysis and recommendations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tally_core::{GraphService, PatternAnalysis, Priority, RecommendationReport};

use crate::cli::RebuildTarget;

/// Rebuild one user's graph or every user's graph
///
/// With `--all`, fails if any user's rebuild failed.
pub async fn cmd_rebuild(
    service: Arc<GraphService>,
    target: RebuildTarget,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let deadline = timeout_secs.map(Duration::from_secs);

    match target {
        RebuildTarget::User(user_id) => {
            println!("🔄 Rebuilding relation graph for user {}...", user_id);
            let written = match deadline {
                Some(d) => service.rebuild_graph_with_deadline(user_id, d).await,
                None => service.rebuild_graph(user_id).await,
            }
            .with_context(|| format!("Rebuild failed for user {}", user_id))?;
            println!("✅ Wrote {} relations", written);
        }
        RebuildTarget::All => {
            println!("🔄 Rebuilding relation graphs for all users...");
            let results = service
                .rebuild_all(deadline)
                .await
                .context("Failed to list users")?;

            let mut failed = 0;
            for (user_id, result) in &results {
                match result {
                    Ok(written) => println!("   User {:>6}: {} relations", user_id, written),
                    Err(e) => {
                        failed += 1;
                        println!("   User {:>6}: ❌ {}", user_id, e);
                        if let Some(written) = e.written() {
                            println!("               {} relations kept from this run", written);
                        }
                    }
                }
            }

            println!();
            if failed > 0 {
                anyhow::bail!("{} of {} rebuilds failed", failed, results.len());
            }
            println!("✅ Rebuilt {} graph(s)", results.len());
        }
    }

    Ok(())
}

pub async fn cmd_patterns(service: &GraphService, user_id: i64, json: bool) -> Result<()> {
    let analysis = service.analyze_patterns(user_id).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    print_patterns(user_id, &analysis);
    Ok(())
}

pub async fn cmd_recommend(service: &GraphService, user_id: i64, json: bool) -> Result<()> {
    let report = service.get_recommendations(user_id).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_recommendations(user_id, &report);
    Ok(())
}

fn print_patterns(user_id: i64, analysis: &PatternAnalysis) {
    println!();
    println!("🕸️  Relation Patterns (user {})", user_id);
    println!("   ─────────────────────────────────────────────────────────────");

    if analysis.patterns.is_empty() {
        println!("   No patterns found. Run `tally rebuild --user {}` first.", user_id);
        return;
    }

    println!("   {:24} │ {:>6} │ {:>8}", "Relation", "Count", "Strength");
    println!("   ─────────────────────────┼────────┼─────────");
    for p in &analysis.patterns {
        println!(
            "   {:24} │ {:>6} │ {:>8.3}",
            p.relation_type.as_str(),
            p.occurrence_count,
            p.average_strength
        );
    }

    println!();
    println!(
        "   {} high-confidence sequential pattern(s)",
        analysis.sequential_patterns.len()
    );

    if !analysis.insights.is_empty() {
        println!();
        println!("   💡 Insights:");
        for insight in &analysis.insights {
            println!("      • {} - {}", insight.title, insight.description);
        }
    }
}

fn priority_icon(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟡",
        Priority::Low => "🟢",
    }
}

fn print_recommendations(user_id: i64, report: &RecommendationReport) {
    println!();
    println!("🎯 Recommendations (user {})", user_id);
    println!("   ─────────────────────────────────────────────────────────────");

    if report.recommendations.is_empty() {
        println!("   Nothing to recommend right now.");
        return;
    }

    for line in recommendation_lines(report) {
        println!("{}", line);
    }
}

/// Display lines for a report, in the order the engine produced them
pub fn recommendation_lines(report: &RecommendationReport) -> Vec<String> {
    report
        .recommendations
        .iter()
        .flat_map(|rec| {
            [
                format!("   {} {} ({})", priority_icon(rec.priority), rec.title, rec.priority),
                format!("      {}", rec.description),
                format!("      → {}", rec.action),
            ]
        })
        .collect()
}
