//! [`SqliteStore`], the SQLite implementation of [`StatuteStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use lexnav_core::{
  node::{
    ContentKind, ContentNode, ContentRef, Division, DivisionId, NewDivision, NewProvision,
    NodeStatus, Provision, ProvisionId,
  },
  order::{DivisionLink, ProvisionLink, ReindexOutcome, plan_reading_order},
  statute::{NewStatute, Statute, StatuteId},
  store::{ChildDivision, IndexCensus, NodeKey, NodeLookup, OrderWindow, SequencedRow, StatuteStore},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{
    DIVISION_COLUMNS, PROVISION_COLUMNS, RawChildDivision, RawDivision, RawProvision,
    STATUTE_COLUMNS, encode_date, encode_dt, read_division, read_provision, read_sequenced,
    read_statute,
  },
  schema::SCHEMA,
};

/// Upper bound on ancestor hops followed by the lineage queries. Cycles are
/// cut separately by the visited path each query carries.
const MAX_LINEAGE_DEPTH: i64 = 256;

const ACTIVE: &str = "active";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A statute store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self.conn.call(move |conn| Ok(conn.execute_batch(sql)?)).await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SQL helpers ─────────────────────────────────────────────────────────────

fn fetch_division(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<RawDivision>> {
  conn
    .query_row(
      &format!("SELECT {DIVISION_COLUMNS} FROM statute_divisions WHERE id = ?1"),
      [id],
      read_division,
    )
    .optional()
}

fn fetch_provision(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawProvision>> {
  conn
    .query_row(
      &format!("SELECT {PROVISION_COLUMNS} FROM statute_provisions WHERE id = ?1"),
      [id],
      read_provision,
    )
    .optional()
}

/// `?1, ?2, …, ?n`
fn placeholders(n: usize) -> String {
  (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// The `order_index` predicate for a window, with its bound parameters
/// numbered from `?2` (`?1` is always the statute id).
fn window_clause(window: OrderWindow) -> (&'static str, Vec<i64>) {
  match window {
    OrderWindow::Before(n) => ("order_index < ?2", vec![n]),
    OrderWindow::After(n) => ("order_index > ?2", vec![n]),
    OrderWindow::From(n) => ("order_index >= ?2", vec![n]),
    OrderWindow::Between { start, end } => ("order_index BETWEEN ?2 AND ?3", vec![start, end]),
  }
}

fn table_of(kind: ContentKind) -> &'static str {
  match kind {
    ContentKind::Division => "statute_divisions",
    ContentKind::Provision => "statute_provisions",
  }
}

/// Projection of `statute_divisions` onto the unified row layout.
const SEQUENCED_DIVISIONS: &str = "
  SELECT 'division' AS content_type, id, slug, order_index,
         division_type AS type_name, division_number AS number,
         division_title AS title, division_subtitle AS subtitle, content,
         NULL AS provision_text, NULL AS marginal_note, NULL AS interpretation_note,
         level, parent_division_id AS parent_id, NULL AS division_id,
         status, effective_date, created_at, updated_at
  FROM statute_divisions";

/// Projection of `statute_provisions` onto the unified row layout.
const SEQUENCED_PROVISIONS: &str = "
  SELECT 'provision' AS content_type, id, slug, order_index,
         provision_type AS type_name, provision_number AS number,
         provision_title AS title, NULL AS subtitle, NULL AS content,
         provision_text, marginal_note, interpretation_note,
         level, parent_provision_id AS parent_id, division_id,
         status, effective_date, created_at, updated_at
  FROM statute_provisions";

// ─── StatuteStore impl ───────────────────────────────────────────────────────

impl StatuteStore for SqliteStore {
  type Error = Error;

  // ── Statutes ──────────────────────────────────────────────────────────────

  async fn insert_statute(&self, input: NewStatute) -> Result<Statute> {
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO statutes (slug, title, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![input.slug, input.title, input.status, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!("SELECT {STATUTE_COLUMNS} FROM statutes WHERE id = ?1"),
          [id],
          read_statute,
        )?)
      })
      .await?;

    raw.into_statute()
  }

  async fn get_statute(&self, id: StatuteId) -> Result<Option<Statute>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STATUTE_COLUMNS} FROM statutes WHERE id = ?1"),
              [id.0],
              read_statute,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|r| r.into_statute()).transpose()
  }

  async fn find_statute(&self, slug: &str) -> Result<Option<Statute>> {
    let slug = slug.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STATUTE_COLUMNS} FROM statutes WHERE slug = ?1"),
              [slug],
              read_statute,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|r| r.into_statute()).transpose()
  }

  async fn list_statutes(&self) -> Result<Vec<Statute>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {STATUTE_COLUMNS} FROM statutes ORDER BY slug"))?;
        let rows = stmt.query_map([], read_statute)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|r| r.into_statute()).collect()
  }

  // ── Node writes ───────────────────────────────────────────────────────────

  async fn insert_division(&self, input: NewDivision) -> Result<Division> {
    let now = encode_dt(Utc::now());
    let effective_date = input.effective_date.map(encode_date);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO statute_divisions (
             statute_id, slug, parent_division_id, division_type, division_number,
             division_title, division_subtitle, content, sort_order, level, status,
             order_index, effective_date, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
          rusqlite::params![
            input.statute_id.0,
            input.slug,
            input.parent_division_id.map(|d| d.0),
            input.division_type.as_str(),
            input.division_number,
            input.division_title,
            input.division_subtitle,
            input.content,
            input.sort_order,
            input.level,
            input.status.as_str(),
            input.order_index,
            effective_date,
            now,
          ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!("SELECT {DIVISION_COLUMNS} FROM statute_divisions WHERE id = ?1"),
          [id],
          read_division,
        )?)
      })
      .await?;

    raw.into_division()
  }

  async fn insert_provision(&self, input: NewProvision) -> Result<Provision> {
    let now = encode_dt(Utc::now());
    let effective_date = input.effective_date.map(encode_date);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO statute_provisions (
             statute_id, slug, division_id, parent_provision_id, provision_type,
             provision_number, provision_title, provision_text, marginal_note,
             interpretation_note, sort_order, level, status, order_index,
             effective_date, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
          rusqlite::params![
            input.statute_id.0,
            input.slug,
            input.division_id.map(|d| d.0),
            input.parent_provision_id.map(|p| p.0),
            input.provision_type.as_str(),
            input.provision_number,
            input.provision_title,
            input.provision_text,
            input.marginal_note,
            input.interpretation_note,
            input.sort_order,
            input.level,
            input.status.as_str(),
            input.order_index,
            effective_date,
            now,
          ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!("SELECT {PROVISION_COLUMNS} FROM statute_provisions WHERE id = ?1"),
          [id],
          read_provision,
        )?)
      })
      .await?;

    raw.into_provision()
  }

  async fn set_order_index(&self, node: ContentRef, order_index: Option<i64>) -> Result<()> {
    let sql = format!("UPDATE {} SET order_index = ?2 WHERE id = ?1", table_of(node.kind()));
    let id = node.raw_id();

    let updated = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![id, order_index])?))
      .await?;

    ensure_updated(updated, node)
  }

  async fn set_status(&self, node: ContentRef, status: NodeStatus) -> Result<()> {
    let sql = format!(
      "UPDATE {} SET status = ?2, updated_at = ?3 WHERE id = ?1",
      table_of(node.kind())
    );
    let id = node.raw_id();
    let now = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![id, status.as_str(), now])?))
      .await?;

    ensure_updated(updated, node)
  }

  async fn place_division(
    &self,
    id: DivisionId,
    parent: Option<DivisionId>,
    sort_order: i64,
  ) -> Result<()> {
    let now = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
          "UPDATE statute_divisions
           SET parent_division_id = ?2,
               sort_order = ?3,
               level = COALESCE((SELECT p.level + 1 FROM statute_divisions p WHERE p.id = ?2), 1),
               updated_at = ?4
           WHERE id = ?1",
          rusqlite::params![id.0, parent.map(|p| p.0), sort_order, now],
        )?;
        if updated > 0 {
          tx.execute(
            "WITH RECURSIVE subtree(id, level, path) AS (
               SELECT id, level, ',' || id || ',' FROM statute_divisions WHERE id = ?1
               UNION ALL
               SELECT d.id, subtree.level + 1, subtree.path || d.id || ','
               FROM statute_divisions d JOIN subtree ON d.parent_division_id = subtree.id
               WHERE instr(subtree.path, ',' || d.id || ',') = 0
             )
             UPDATE statute_divisions
             SET level = (SELECT level FROM subtree WHERE subtree.id = statute_divisions.id LIMIT 1)
             WHERE id IN (SELECT id FROM subtree WHERE id <> ?1)",
            [id.0],
          )?;
        }
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    ensure_updated(updated, ContentRef::Division(id))
  }

  /// Re-parent a provision. Its sub-provisions follow it into the new
  /// division and have their levels recomputed.
  async fn place_provision(
    &self,
    id: ProvisionId,
    division: Option<DivisionId>,
    parent: Option<ProvisionId>,
    sort_order: i64,
  ) -> Result<()> {
    let now = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
          "UPDATE statute_provisions
           SET division_id = ?2,
               parent_provision_id = ?3,
               sort_order = ?4,
               level = COALESCE((SELECT p.level + 1 FROM statute_provisions p WHERE p.id = ?3), 1),
               updated_at = ?5
           WHERE id = ?1",
          rusqlite::params![id.0, division.map(|d| d.0), parent.map(|p| p.0), sort_order, now],
        )?;
        if updated > 0 {
          tx.execute(
            "WITH RECURSIVE subtree(id, level, path) AS (
               SELECT id, level, ',' || id || ',' FROM statute_provisions WHERE id = ?1
               UNION ALL
               SELECT p.id, subtree.level + 1, subtree.path || p.id || ','
               FROM statute_provisions p JOIN subtree ON p.parent_provision_id = subtree.id
               WHERE instr(subtree.path, ',' || p.id || ',') = 0
             )
             UPDATE statute_provisions
             SET division_id = ?2,
                 level = (SELECT level FROM subtree WHERE subtree.id = statute_provisions.id LIMIT 1),
                 updated_at = ?3
             WHERE id IN (SELECT id FROM subtree WHERE id <> ?1)",
            rusqlite::params![id.0, division.map(|d| d.0), now],
          )?;
        }
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    ensure_updated(updated, ContentRef::Provision(id))
  }

  // ── Node reads ────────────────────────────────────────────────────────────

  async fn get_division(&self, id: DivisionId) -> Result<Option<Division>> {
    let raw = self.conn.call(move |conn| Ok(fetch_division(conn, id.0)?)).await?;
    raw.map(RawDivision::into_division).transpose()
  }

  async fn get_provision(&self, id: ProvisionId) -> Result<Option<Provision>> {
    let raw = self.conn.call(move |conn| Ok(fetch_provision(conn, id.0)?)).await?;
    raw.map(RawProvision::into_provision).transpose()
  }

  async fn find_active(
    &self,
    statute: StatuteId,
    kind: ContentKind,
    lookup: NodeLookup,
  ) -> Result<Option<ContentNode>> {
    let (predicate, key) = match lookup {
      NodeLookup::Slug(slug) => ("slug = ?2", Value::Text(slug)),
      NodeLookup::OrderIndex(idx) => ("order_index = ?2", Value::Integer(idx)),
    };
    let columns = match kind {
      ContentKind::Division => DIVISION_COLUMNS,
      ContentKind::Provision => PROVISION_COLUMNS,
    };
    let sql = format!(
      "SELECT {columns} FROM {} WHERE statute_id = ?1 AND status = '{ACTIVE}' AND {predicate}
       ORDER BY id LIMIT 1",
      table_of(kind)
    );

    match kind {
      ContentKind::Division => {
        let raw = self
          .conn
          .call(move |conn| {
            Ok(
              conn
                .query_row(&sql, rusqlite::params![statute.0, key], read_division)
                .optional()?,
            )
          })
          .await?;
        Ok(raw.map(RawDivision::into_division).transpose()?.map(ContentNode::from))
      }
      ContentKind::Provision => {
        let raw = self
          .conn
          .call(move |conn| {
            Ok(
              conn
                .query_row(&sql, rusqlite::params![statute.0, key], read_provision)
                .optional()?,
            )
          })
          .await?;
        Ok(raw.map(RawProvision::into_provision).transpose()?.map(ContentNode::from))
      }
    }
  }

  async fn division_lineage(&self, id: DivisionId) -> Result<Vec<Division>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "WITH RECURSIVE lineage(id, depth, path) AS (
             SELECT id, 0, ',' || id || ',' FROM statute_divisions WHERE id = ?1
             UNION ALL
             SELECT d.parent_division_id, lineage.depth + 1,
                    lineage.path || d.parent_division_id || ','
             FROM statute_divisions d JOIN lineage ON d.id = lineage.id
             WHERE d.parent_division_id IS NOT NULL
               AND instr(lineage.path, ',' || d.parent_division_id || ',') = 0
               AND lineage.depth < ?2
           )
           SELECT {DIVISION_COLUMNS} FROM statute_divisions JOIN lineage USING (id)
           ORDER BY lineage.depth DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id.0, MAX_LINEAGE_DEPTH], read_division)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDivision::into_division).collect()
  }

  async fn provision_lineage(&self, id: ProvisionId) -> Result<Vec<Provision>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "WITH RECURSIVE lineage(id, depth, path) AS (
             SELECT id, 0, ',' || id || ',' FROM statute_provisions WHERE id = ?1
             UNION ALL
             SELECT p.parent_provision_id, lineage.depth + 1,
                    lineage.path || p.parent_provision_id || ','
             FROM statute_provisions p JOIN lineage ON p.id = lineage.id
             WHERE p.parent_provision_id IS NOT NULL
               AND instr(lineage.path, ',' || p.parent_provision_id || ',') = 0
               AND lineage.depth < ?2
           )
           SELECT {PROVISION_COLUMNS} FROM statute_provisions JOIN lineage USING (id)
           ORDER BY lineage.depth DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id.0, MAX_LINEAGE_DEPTH], read_provision)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProvision::into_provision).collect()
  }

  async fn children_of(&self, node: ContentRef) -> Result<Vec<ContentRef>> {
    let children = self
      .conn
      .call(move |conn| {
        let ids = |sql: &str, parent: i64| -> rusqlite::Result<Vec<i64>> {
          let mut stmt = conn.prepare(sql)?;
          let rows = stmt.query_map([parent], |row| row.get(0))?;
          rows.collect()
        };

        let mut children = Vec::new();
        match node {
          ContentRef::Division(id) => {
            let divisions = ids(
              "SELECT id FROM statute_divisions WHERE parent_division_id = ?1
               ORDER BY sort_order, id",
              id.0,
            )?;
            let provisions = ids(
              "SELECT id FROM statute_provisions
               WHERE division_id = ?1 AND parent_provision_id IS NULL
               ORDER BY sort_order, id",
              id.0,
            )?;
            children.extend(divisions.into_iter().map(|i| ContentRef::Division(DivisionId(i))));
            children.extend(provisions.into_iter().map(|i| ContentRef::Provision(ProvisionId(i))));
          }
          ContentRef::Provision(id) => {
            let provisions = ids(
              "SELECT id FROM statute_provisions WHERE parent_provision_id = ?1
               ORDER BY sort_order, id",
              id.0,
            )?;
            children.extend(provisions.into_iter().map(|i| ContentRef::Provision(ProvisionId(i))));
          }
        }
        Ok(children)
      })
      .await?;

    Ok(children)
  }

  async fn node_keys(&self, statute: StatuteId) -> Result<Vec<NodeKey>> {
    let rows: Vec<(String, i64, Option<i64>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT 'division', id, order_index FROM statute_divisions WHERE statute_id = ?1
           UNION ALL
           SELECT 'provision', id, order_index FROM statute_provisions WHERE statute_id = ?1",
        )?;
        let rows = stmt
          .query_map([statute.0], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(kind, id, order_index)| -> Result<NodeKey> {
        let node = match kind.parse::<ContentKind>()? {
          ContentKind::Division => ContentRef::Division(DivisionId(id)),
          ContentKind::Provision => ContentRef::Provision(ProvisionId(id)),
        };
        Ok(NodeKey { node, order_index })
      })
      .collect()
  }

  // ── Ordered reads ─────────────────────────────────────────────────────────

  async fn sequenced(
    &self,
    statute: StatuteId,
    window: OrderWindow,
    limit: usize,
  ) -> Result<Vec<SequencedRow>> {
    let (predicate, bounds) = window_clause(window);
    let dir = if window.is_descending() { "DESC" } else { "ASC" };
    let sql = format!(
      "SELECT * FROM (
         {SEQUENCED_DIVISIONS}
         WHERE statute_id = ?1 AND status = '{ACTIVE}' AND {predicate}
         UNION ALL
         {SEQUENCED_PROVISIONS}
         WHERE statute_id = ?1 AND status = '{ACTIVE}' AND {predicate}
       )
       ORDER BY order_index {dir}, content_type {dir}, id {dir}
       LIMIT {limit}"
    );
    let params: Vec<i64> = std::iter::once(statute.0).chain(bounds).collect();

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), read_sequenced)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    debug!(%statute, ?window, rows = raws.len(), "sequenced read");
    raws.into_iter().map(|r| r.into_row()).collect()
  }

  async fn has_active_in(&self, statute: StatuteId, window: OrderWindow) -> Result<bool> {
    let (predicate, bounds) = window_clause(window);
    let sql = format!(
      "SELECT EXISTS (
         SELECT 1 FROM statute_divisions
         WHERE statute_id = ?1 AND status = '{ACTIVE}' AND {predicate}
       ) OR EXISTS (
         SELECT 1 FROM statute_provisions
         WHERE statute_id = ?1 AND status = '{ACTIVE}' AND {predicate}
       )"
    );
    let params: Vec<i64> = std::iter::once(statute.0).chain(bounds).collect();

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get::<_, bool>(0))?)
      })
      .await?;

    Ok(found)
  }

  async fn count_active_indexed(&self, statute: StatuteId) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "SELECT
               (SELECT COUNT(*) FROM statute_divisions
                WHERE statute_id = ?1 AND status = '{ACTIVE}' AND order_index IS NOT NULL)
             + (SELECT COUNT(*) FROM statute_provisions
                WHERE statute_id = ?1 AND status = '{ACTIVE}' AND order_index IS NOT NULL)"
          ),
          [statute.0],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  async fn division_child_counts(&self, ids: Vec<DivisionId>) -> Result<HashMap<DivisionId, u64>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let marks = placeholders(ids.len());
    let sql = format!(
      "SELECT parent, COUNT(*) FROM (
         SELECT parent_division_id AS parent FROM statute_divisions
         WHERE status = '{ACTIVE}' AND parent_division_id IN ({marks})
         UNION ALL
         SELECT division_id AS parent FROM statute_provisions
         WHERE status = '{ACTIVE}' AND parent_provision_id IS NULL AND division_id IN ({marks})
       )
       GROUP BY parent"
    );
    let params: Vec<i64> = ids.iter().map(|d| d.0).collect();

    let rows: Vec<(i64, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows.into_iter().map(|(id, n)| (DivisionId(id), n.max(0) as u64)).collect())
  }

  async fn provision_child_counts(
    &self,
    ids: Vec<ProvisionId>,
  ) -> Result<HashMap<ProvisionId, u64>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let sql = format!(
      "SELECT parent_provision_id, COUNT(*) FROM statute_provisions
       WHERE status = '{ACTIVE}' AND parent_provision_id IN ({})
       GROUP BY parent_provision_id",
      placeholders(ids.len())
    );
    let params: Vec<i64> = ids.iter().map(|p| p.0).collect();

    let rows: Vec<(i64, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows.into_iter().map(|(id, n)| (ProvisionId(id), n.max(0) as u64)).collect())
  }

  async fn child_division_previews(
    &self,
    ids: Vec<DivisionId>,
    per_parent: usize,
  ) -> Result<HashMap<DivisionId, Vec<ChildDivision>>> {
    if ids.is_empty() || per_parent == 0 {
      return Ok(HashMap::new());
    }
    let sql = format!(
      "SELECT parent_division_id, id, slug, division_type, division_number, division_title,
              order_index
       FROM (
         SELECT parent_division_id, id, slug, division_type, division_number, division_title,
                order_index,
                ROW_NUMBER() OVER (PARTITION BY parent_division_id ORDER BY sort_order, id) AS pos
         FROM statute_divisions
         WHERE status = '{ACTIVE}' AND parent_division_id IN ({})
       )
       WHERE pos <= {per_parent}
       ORDER BY parent_division_id, pos",
      placeholders(ids.len())
    );
    let params: Vec<i64> = ids.iter().map(|d| d.0).collect();

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawChildDivision {
              parent:          row.get(0)?,
              id:              row.get(1)?,
              slug:            row.get(2)?,
              division_type:   row.get(3)?,
              division_number: row.get(4)?,
              division_title:  row.get(5)?,
              order_index:     row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut previews: HashMap<DivisionId, Vec<ChildDivision>> = HashMap::new();
    for raw in raws {
      let (parent, child) = raw.into_child()?;
      previews.entry(parent).or_default().push(child);
    }
    Ok(previews)
  }

  // ── Index maintenance ─────────────────────────────────────────────────────

  async fn last_order_index(&self, statute: StatuteId) -> Result<Option<i64>> {
    let max = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MAX(order_index) FROM (
             SELECT order_index FROM statute_divisions WHERE statute_id = ?1
             UNION ALL
             SELECT order_index FROM statute_provisions WHERE statute_id = ?1
           )",
          [statute.0],
          |row| row.get::<_, Option<i64>>(0),
        )?)
      })
      .await?;

    Ok(max)
  }

  async fn next_order_index(&self, statute: StatuteId, after: i64) -> Result<Option<i64>> {
    let min = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MIN(order_index) FROM (
             SELECT order_index FROM statute_divisions
             WHERE statute_id = ?1 AND order_index > ?2
             UNION ALL
             SELECT order_index FROM statute_provisions
             WHERE statute_id = ?1 AND order_index > ?2
           )",
          [statute.0, after],
          |row| row.get::<_, Option<i64>>(0),
        )?)
      })
      .await?;

    Ok(min)
  }

  async fn index_census(&self, statute: StatuteId) -> Result<IndexCensus> {
    let all: Vec<Option<i64>> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT order_index FROM statute_divisions WHERE statute_id = ?1
           UNION ALL
           SELECT order_index FROM statute_provisions WHERE statute_id = ?1",
        )?;
        let rows =
          stmt.query_map([statute.0], |row| row.get(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(IndexCensus {
      total_nodes: all.len() as u64,
      indices:     all.into_iter().flatten().collect(),
    })
  }

  async fn reindex(&self, statute: StatuteId, gap: i64, dry_run: bool) -> Result<ReindexOutcome> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let divisions = {
          let mut stmt = tx.prepare(
            "SELECT id, parent_division_id, sort_order, slug, order_index
             FROM statute_divisions WHERE statute_id = ?1",
          )?;
          stmt
            .query_map([statute.0], |row| {
              Ok(DivisionLink {
                id:          DivisionId(row.get(0)?),
                parent:      row.get::<_, Option<i64>>(1)?.map(DivisionId),
                sort_order:  row.get(2)?,
                slug:        row.get(3)?,
                order_index: row.get(4)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let provisions = {
          let mut stmt = tx.prepare(
            "SELECT id, division_id, parent_provision_id, sort_order, slug, order_index
             FROM statute_provisions WHERE statute_id = ?1",
          )?;
          stmt
            .query_map([statute.0], |row| {
              Ok(ProvisionLink {
                id:          ProvisionId(row.get(0)?),
                division:    row.get::<_, Option<i64>>(1)?.map(DivisionId),
                parent:      row.get::<_, Option<i64>>(2)?.map(ProvisionId),
                sort_order:  row.get(3)?,
                slug:        row.get(4)?,
                order_index: row.get(5)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let plan = plan_reading_order(&divisions, &provisions);
        let mut outcome = ReindexOutcome {
          changes: plan.assign(gap),
          orphans: plan.orphans,
          ..Default::default()
        };

        if dry_run {
          tx.rollback()?;
          return Ok(outcome);
        }

        {
          let mut update_division =
            tx.prepare("UPDATE statute_divisions SET order_index = ?2 WHERE id = ?1")?;
          let mut update_provision =
            tx.prepare("UPDATE statute_provisions SET order_index = ?2 WHERE id = ?1")?;
          for change in outcome.changes.iter().filter(|c| !c.is_unchanged()) {
            match change.kind {
              ContentKind::Division => {
                outcome.divisions_updated +=
                  update_division.execute([change.id, change.new_index])?;
              }
              ContentKind::Provision => {
                outcome.provisions_updated +=
                  update_provision.execute([change.id, change.new_index])?;
              }
            }
          }
        }
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    debug!(
      %statute,
      dry_run,
      nodes = outcome.changes.len(),
      divisions_updated = outcome.divisions_updated,
      provisions_updated = outcome.provisions_updated,
      orphans = outcome.orphans,
      "reindexed statute"
    );
    Ok(outcome)
  }
}

fn ensure_updated(rows: usize, node: ContentRef) -> Result<()> {
  if rows > 0 {
    return Ok(());
  }
  Err(match node {
    ContentRef::Division(id) => Error::DivisionNotFound(id),
    ContentRef::Provision(id) => Error::ProvisionNotFound(id),
  })
}
