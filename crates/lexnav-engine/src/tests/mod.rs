//! Engine tests against an in-memory `SqliteStore` and a `MemoryCache`.

mod flaky;
mod navigator;
mod order;
mod resolver;

use lexnav_cache::MemoryCache;
use lexnav_core::{
  config::NavigationConfig,
  node::{Division, DivisionId, DivisionType, NewDivision, NewProvision, Provision, ProvisionType},
  statute::{NewStatute, Statute},
  store::StatuteStore,
};
use lexnav_store_sqlite::SqliteStore;

use crate::Lexnav;

type Engine = Lexnav<SqliteStore, MemoryCache>;

async fn engine_with(config: NavigationConfig, cache: MemoryCache) -> Engine {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Lexnav::new(store, cache, config).expect("valid config")
}

async fn engine() -> Engine { engine_with(NavigationConfig::default(), MemoryCache::new()).await }

async fn statute(e: &Engine, slug: &str) -> Statute {
  e.store().insert_statute(NewStatute::new(slug, format!("{slug} title"))).await.unwrap()
}

/// Insert a division directly, bypassing index assignment.
async fn division(
  e: &Engine,
  statute: &Statute,
  slug: &str,
  parent: Option<DivisionId>,
  sort: i64,
  index: Option<i64>,
) -> Division {
  let mut input = NewDivision::new(statute.id, slug, DivisionType::Part, slug.to_uppercase())
    .sorted(sort);
  input.parent_division_id = parent;
  input.order_index = index;
  e.store().insert_division(input).await.unwrap()
}

/// Insert a provision directly, bypassing index assignment.
async fn provision(e: &Engine, input: NewProvision, index: Option<i64>) -> Provision {
  let input = NewProvision { order_index: index, ..input };
  e.store().insert_provision(input).await.unwrap()
}

fn section(statute: &Statute, slug: &str) -> NewProvision {
  NewProvision::new(statute.id, slug, ProvisionType::Section)
}

/// Top-level divisions `d1..=dn` at `100, 200, …`.
async fn flat_statute(e: &Engine, n: i64) -> Statute {
  let s = statute(e, "flat").await;
  for i in 1..=n {
    division(e, &s, &format!("d{i}"), None, i, Some(i * 100)).await;
  }
  s
}
