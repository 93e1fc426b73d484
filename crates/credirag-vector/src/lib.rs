//! credirag-vector
//!
//! The persistent vector index over complaint chunks, stored as a LanceDB
//! table. Each index records the embedder it was built with and refuses to
//! open with a different one.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

use anyhow::Result;
use lancedb::{Connection, Table};
use std::path::Path;

use credirag_core::metadata::MetadataPolicy;
use credirag_core::Error;

use crate::schema::{build_arrow_schema, vector_dim};
use crate::table::{ensure_table, get_meta, meta_key, open_db, set_meta};

pub struct VectorIndex {
    pub(crate) conn: Connection,
    pub(crate) table: Table,
    pub(crate) table_name: String,
    pub(crate) dim: usize,
    pub(crate) policy: MetadataPolicy,
    pub(crate) next_seq: i64,
}

impl VectorIndex {
    /// Open (creating if needed) the chunk table `table_name` under `dir`.
    ///
    /// Fails with a configuration error when the table was built by another
    /// embedder or with another vector dimension.
    pub async fn open(dir: &Path, table_name: &str, embedder_id: &str, dim: usize, policy: MetadataPolicy) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = open_db(dir.to_string_lossy().as_ref()).await?;
        let id_key = meta_key(table_name, "embedder_id");
        let dim_key = meta_key(table_name, "dim");

        let stored_id = get_meta(&conn, &id_key).await?;
        if let Some(stored) = stored_id.as_deref().filter(|s| *s != embedder_id) {
            return Err(mismatch(table_name, format!("built with embedder '{stored}', opened with '{embedder_id}'")));
        }
        if let Some(stored) = get_meta(&conn, &dim_key).await?.filter(|s| *s != dim.to_string()) {
            return Err(mismatch(table_name, format!("built with {stored}-dim vectors, embedder produces {dim}")));
        }

        let dim_i32 = i32::try_from(dim)?;
        ensure_table(&conn, table_name, build_arrow_schema(dim_i32)).await?;
        let table = conn.open_table(table_name).execute().await?;
        let schema = table.schema().await?;
        if vector_dim(&schema) != Some(dim_i32) {
            return Err(mismatch(table_name, format!("table vector column does not hold {dim}-dim vectors")));
        }
        if stored_id.is_none() {
            set_meta(&conn, &id_key, embedder_id).await?;
            set_meta(&conn, &dim_key, &dim.to_string()).await?;
        }

        let mut index = Self { conn, table, table_name: table_name.to_string(), dim, policy, next_seq: 0 };
        index.next_seq = match get_meta(&index.conn, &index.seq_key()).await? {
            Some(v) => v.parse()?,
            None => index.len().await? as i64,
        };
        tracing::info!(dir = %dir.display(), table = table_name, embedder = embedder_id, dim, next_seq = index.next_seq, "opened vector index");
        Ok(index)
    }

    /// Delete the whole index directory, tables and meta included.
    pub fn reset(dir: &Path) -> Result<()> {
        if dir.exists() {
            tracing::warn!(dir = %dir.display(), "removing existing vector index");
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }

    pub async fn is_empty(&self) -> Result<bool> { Ok(self.len().await? == 0) }

    pub fn dim(&self) -> usize { self.dim }

    pub fn table_name(&self) -> &str { &self.table_name }

    pub(crate) fn seq_key(&self) -> String { meta_key(&self.table_name, "next_seq") }
}

fn mismatch(table: &str, detail: String) -> anyhow::Error {
    Error::Configuration(format!("vector index '{table}' {detail}; rebuild the index to switch models")).into()
}

/// Map a storage error to the core taxonomy, keeping typed errors raised here.
pub fn into_core_error(e: anyhow::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(core) => core,
        Err(other) => Error::Index(format!("{other:#}")),
    }
}
