//! Subcommand implementations. Each prints to stdout and leaves the exit
//! code decision to `main`.

use std::time::Instant;

use anyhow::{Context as _, bail};
use lexnav_cache::MemoryCache;
use lexnav_core::{
  node::ContentRef,
  statute::{Statute, StatuteId},
  store::StatuteStore,
};
use lexnav_engine::{Lexnav, ReindexReport, ValidationReport};
use lexnav_store_sqlite::SqliteStore;
use serde_json::json;
use tracing::{info, warn};

pub type Engine = Lexnav<SqliteStore, MemoryCache>;

/// One statute, or every statute when `id` is `None`.
async fn targets(engine: &Engine, id: Option<i64>) -> anyhow::Result<Vec<Statute>> {
  match id {
    Some(id) => {
      let statute = engine
        .store()
        .get_statute(StatuteId(id))
        .await?
        .with_context(|| format!("statute {id} not found"))?;
      Ok(vec![statute])
    }
    None => Ok(engine.store().list_statutes().await?),
  }
}

// ─── validate ────────────────────────────────────────────────────────────────

/// Returns `true` when every checked statute is valid.
pub async fn validate(engine: &Engine, id: Option<i64>) -> anyhow::Result<bool> {
  let statutes = targets(engine, id).await?;
  if statutes.is_empty() {
    println!("No statutes found.");
    return Ok(true);
  }

  let mut invalid = 0usize;
  for statute in &statutes {
    let report = engine.indices().validate_indices(statute).await?;
    print_validation(&report);
    if !report.valid {
      invalid += 1;
    }
  }

  println!();
  println!("Checked {} statute(s), {invalid} with issues.", statutes.len());
  Ok(invalid == 0)
}

fn print_validation(report: &ValidationReport) {
  let stats = &report.statistics;
  let verdict = if report.valid { "OK" } else { "INVALID" };
  println!();
  println!("[{verdict}] {} (id {})", report.statute_slug, report.statute_id);
  println!("  total items:         {}", stats.total_items);
  println!("  with order_index:    {}", stats.items_with_index);
  println!("  without order_index: {}", stats.items_without_index);
  if let Some(avg) = stats.average_gap {
    println!("  average gap:         {avg}");
  }
  if let Some(min) = stats.minimum_gap {
    println!("  minimum gap:         {min}");
  }
  for issue in &report.issues {
    println!("  issue: {issue}");
  }
  if let Some(duplicates) = &report.duplicates {
    for (index, count) in duplicates {
      println!("  duplicate: order_index {index} held by {count} items");
    }
  }
  println!("  recommendation: {}", report.recommendation);
  if let Some(repair) = &report.repair {
    println!(
      "  repaired: {} divisions, {} provisions renumbered",
      repair.divisions_updated, repair.provisions_updated
    );
  }
}

// ─── reindex ─────────────────────────────────────────────────────────────────

/// Returns the number of statutes whose reindex failed.
pub async fn reindex(
  engine: &Engine,
  id: Option<i64>,
  dry_run: bool,
  show_details: bool,
) -> anyhow::Result<usize> {
  let statutes = targets(engine, id).await?;
  if statutes.is_empty() {
    println!("No statutes found.");
    return Ok(0);
  }
  if dry_run {
    println!("Dry run: no changes will be written.");
  }

  let started = Instant::now();
  let mut failed = 0usize;
  let mut durations = Vec::with_capacity(statutes.len());

  for statute in &statutes {
    let report = engine.indices().reindex_statute(statute, dry_run).await;
    durations.push(report.duration_ms);
    print_reindex(&report, show_details);
    if !report.succeeded() {
      failed += 1;
    }
  }

  let total_ms = started.elapsed().as_secs_f64() * 1000.0;
  let average = durations.iter().sum::<f64>() / durations.len() as f64;
  println!();
  println!(
    "Processed {} statute(s), {failed} failed, in {total_ms:.2} ms (average {average:.2} ms).",
    statutes.len()
  );
  info!(statutes = statutes.len(), failed, dry_run, total_ms, "reindex batch finished");
  Ok(failed)
}

fn print_reindex(report: &ReindexReport, show_details: bool) {
  println!();
  if let Some(error) = &report.error {
    warn!(statute = %report.statute_id, error = %error, "reindex failed");
    println!("[FAILED] {} (id {}): {error}", report.statute_slug, report.statute_id);
    return;
  }

  if report.dry_run {
    let pending = report.changes.iter().filter(|c| !c.is_unchanged()).count();
    println!(
      "[DRY RUN] {} (id {}): {} items, {pending} would change ({:.2} ms)",
      report.statute_slug, report.statute_id, report.total_items, report.duration_ms,
    );
  } else {
    println!(
      "[OK] {} (id {}): {} items, {} divisions and {} provisions updated in {:.2} ms",
      report.statute_slug,
      report.statute_id,
      report.total_items,
      report.divisions_updated,
      report.provisions_updated,
      report.duration_ms,
    );
  }
  if report.orphans > 0 {
    println!("  {} item(s) with broken parent links appended at the end", report.orphans);
  }
  if show_details {
    for change in report.changes.iter().filter(|c| !c.is_unchanged()) {
      let old = change.old_index.map_or_else(|| "none".to_owned(), |i| i.to_string());
      println!("  {:<9} {:<40} {old:>8} -> {}", change.kind.as_str(), change.slug, change.new_index);
    }
  }
}

// ─── resolve ─────────────────────────────────────────────────────────────────

pub async fn resolve(engine: &Engine, statute_slug: &str, slug: &str) -> anyhow::Result<()> {
  let Some(statute) = engine.store().find_statute(statute_slug).await? else {
    bail!("statute '{statute_slug}' not found");
  };

  let resolution = engine.resolver().resolve_by_slug(&statute, slug).await?;
  let node: ContentRef = resolution.content.content_ref();
  let breadcrumb = engine.breadcrumbs().build(node, Some(&statute)).await?;

  let out = json!({
    "statute": { "id": statute.id, "slug": statute.slug, "title": statute.title },
    "resolution": resolution,
    "breadcrumb": breadcrumb,
  });
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}
