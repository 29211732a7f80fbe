//! Entry repository: catalog rows, their labels and their assets.
//!
//! The repository owns both halves of an entry. Creation writes the asset
//! first and removes it again if the row cannot be inserted. Deletion parks
//! the asset under a pending name, commits the row removal, and only then
//! discards the parked file; a failed park or commit puts everything back.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use picbase_core::{
    normalize_label, normalize_labels, BulkAction, BulkResult, CatalogStats, Entry, EntryPage,
    EntryRepository, EntrySearch, EntryUpdate, Error, ImageFormat, LabelCount, LabelKind, NewEntry,
    Result,
};

use crate::assets::{
    compute_content_hash, generate_asset_path, pending_delete_path, StorageBackend,
};
use crate::filter::{bind_params, fold_search_text, fold_title, EntryFilterQueryBuilder, QueryParam};
use crate::{from_millis, opt_from_millis};

const ENTRY_COLUMNS: &str = "e.id, e.owner_id, e.title, e.description, e.link, e.notes, \
     e.favorite, e.archived, e.asset_path, e.original_filename, e.content_type, \
     e.content_hash, e.size_bytes, e.width, e.height, e.caption, e.created_at, e.updated_at";

/// SQLite implementation of [`EntryRepository`].
#[derive(Clone)]
pub struct SqliteEntryRepository {
    pool: SqlitePool,
    storage: Arc<dyn StorageBackend>,
}

impl SqliteEntryRepository {
    pub fn new(pool: SqlitePool, storage: Arc<dyn StorageBackend>) -> Self {
        Self { pool, storage }
    }

    /// Map a row (without labels) to an entry.
    fn row_to_entry(row: &SqliteRow) -> Entry {
        Entry {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            description: row.get("description"),
            categories: Vec::new(),
            tags: Vec::new(),
            link: row.get("link"),
            notes: row.get("notes"),
            favorite: row.get("favorite"),
            archived: row.get("archived"),
            asset_path: row.get("asset_path"),
            original_filename: row.get("original_filename"),
            content_type: row.get("content_type"),
            content_hash: row.get("content_hash"),
            size_bytes: row.get("size_bytes"),
            width: row.get("width"),
            height: row.get("height"),
            caption: row.get("caption"),
            created_at: from_millis(row.get("created_at")),
            updated_at: from_millis(row.get("updated_at")),
        }
    }

    /// Fill in categories and tags for a batch of entries with one query.
    async fn attach_labels(&self, entries: &mut [Entry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; entries.len()].join(", ");
        let sql = format!(
            "SELECT entry_id, kind, name FROM entry_label WHERE entry_id IN ({}) ORDER BY position",
            placeholders
        );
        let mut q = sqlx::query(&sql);
        for entry in entries.iter() {
            q = q.bind(entry.id);
        }
        let rows = q.fetch_all(&self.pool).await?;

        let mut by_entry: HashMap<Uuid, (Vec<String>, Vec<String>)> = HashMap::new();
        for row in rows {
            let entry_id: Uuid = row.get("entry_id");
            let kind: String = row.get("kind");
            let name: String = row.get("name");
            let slot = by_entry.entry(entry_id).or_default();
            match kind.as_str() {
                "category" => slot.0.push(name),
                _ => slot.1.push(name),
            }
        }

        for entry in entries.iter_mut() {
            if let Some((categories, tags)) = by_entry.remove(&entry.id) {
                entry.categories = categories;
                entry.tags = tags;
            }
        }
        Ok(())
    }

    /// Replace one label set of an entry inside a transaction.
    async fn replace_labels_tx(
        tx: &mut Transaction<'_, Sqlite>,
        entry_id: Uuid,
        kind: LabelKind,
        labels: &[String],
    ) -> Result<()> {
        sqlx::query("DELETE FROM entry_label WHERE entry_id = ? AND kind = ?")
            .bind(entry_id)
            .bind(kind.as_str())
            .execute(&mut **tx)
            .await?;

        for (position, name) in labels.iter().enumerate() {
            sqlx::query(
                "INSERT INTO entry_label (entry_id, kind, name, position) VALUES (?, ?, ?, ?)",
            )
            .bind(entry_id)
            .bind(kind.as_str())
            .bind(name)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Insert the entry row and its labels in one transaction.
    async fn insert_row(&self, id: Uuid, asset_path: &str, hash: &str, req: &NewEntry) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO entries (id, owner_id, title, description, link, notes, favorite, archived,
                asset_path, original_filename, content_type, content_hash, size_bytes,
                width, height, caption, search_text, title_key, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(req.owner_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.link)
        .bind(&req.notes)
        .bind(req.favorite)
        .bind(req.archived)
        .bind(asset_path)
        .bind(&req.original_filename)
        .bind(&req.content_type)
        .bind(hash)
        .bind(req.size_bytes)
        .bind(req.width)
        .bind(req.height)
        .bind(&req.caption)
        .bind(fold_search_text(req.title.as_deref(), &req.description, &req.notes))
        .bind(fold_title(req.title.as_deref()))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        Self::replace_labels_tx(&mut tx, id, LabelKind::Category, &normalize_labels(&req.categories))
            .await?;
        Self::replace_labels_tx(&mut tx, id, LabelKind::Tag, &normalize_labels(&req.tags)).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Asset path of an owned entry, inside a transaction.
    async fn owned_asset_path_tx(
        tx: &mut Transaction<'_, Sqlite>,
        owner: Uuid,
        id: Uuid,
    ) -> Result<String> {
        let path: Option<String> =
            sqlx::query_scalar("SELECT asset_path FROM entries WHERE id = ? AND owner_id = ?")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut **tx)
                .await?;
        path.ok_or(Error::EntryNotFound(id))
    }

    /// Recompute the folded search columns of one entry from its stored text.
    async fn refresh_search_columns_tx(tx: &mut Transaction<'_, Sqlite>, id: Uuid) -> Result<()> {
        let row = sqlx::query("SELECT title, description, notes FROM entries WHERE id = ?")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        let title: Option<String> = row.get("title");
        let description: String = row.get("description");
        let notes: String = row.get("notes");

        sqlx::query("UPDATE entries SET search_text = ?, title_key = ? WHERE id = ?")
            .bind(fold_search_text(title.as_deref(), &description, &notes))
            .bind(fold_title(title.as_deref()))
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Put a parked asset back after a failed delete.
    async fn restore_parked_asset(&self, id: Uuid, parked: &str, asset_path: &str) {
        if let Err(e) = self.storage.rename(parked, asset_path).await {
            error!(
                subsystem = "db",
                component = "entries",
                op = "delete",
                entry_id = %id,
                asset_path = %asset_path,
                error = %e,
                "Parked asset could not be restored"
            );
        }
    }

    /// Set a boolean flag on several owned entries. Returns the ids that matched.
    async fn set_flag(&self, owner: Uuid, ids: &[Uuid], column: &str, value: bool) -> Result<Vec<Uuid>> {
        let now = Utc::now().timestamp_millis();
        let sql = format!(
            "UPDATE entries SET {} = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
            column
        );
        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::new();
        for id in ids {
            let result = sqlx::query(&sql)
                .bind(value)
                .bind(now)
                .bind(*id)
                .bind(owner)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                updated.push(*id);
            }
        }
        tx.commit().await?;
        Ok(updated)
    }

    /// Mark all owned entries carrying a label as updated. Returns how many.
    async fn touch_labelled_tx(
        tx: &mut Transaction<'_, Sqlite>,
        owner: Uuid,
        kind: LabelKind,
        name: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE entries SET updated_at = ?
             WHERE owner_id = ? AND id IN
                (SELECT entry_id FROM entry_label WHERE kind = ? AND name = ?)",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(owner)
        .bind(kind.as_str())
        .bind(name)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EntryRepository for SqliteEntryRepository {
    async fn insert(&self, req: NewEntry, data: &[u8], format: ImageFormat) -> Result<Entry> {
        let start = Instant::now();
        let id = picbase_core::new_v7();
        let asset_path = generate_asset_path(&req.owner_id, &id, format.extension());
        let hash = compute_content_hash(data);

        self.storage.write(&asset_path, data).await?;

        if let Err(e) = self.insert_row(id, &asset_path, &hash, &req).await {
            warn!(
                subsystem = "db",
                component = "entries",
                op = "insert",
                entry_id = %id,
                asset_path = %asset_path,
                error = %e,
                "Entry insert failed, removing written asset"
            );
            if let Err(cleanup) = self.storage.delete(&asset_path).await {
                error!(
                    asset_path = %asset_path,
                    error = %cleanup,
                    "Orphaned asset could not be removed"
                );
            }
            return Err(e);
        }

        info!(
            subsystem = "db",
            component = "entries",
            op = "insert",
            entry_id = %id,
            user_id = %req.owner_id,
            size_bytes = req.size_bytes,
            duration_ms = start.elapsed().as_millis() as u64,
            "Entry created"
        );

        self.fetch(req.owner_id, id).await
    }

    async fn fetch(&self, owner: Uuid, id: Uuid) -> Result<Entry> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM entries e WHERE e.id = ? AND e.owner_id = ?",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::EntryNotFound(id))?;

        let mut entries = vec![Self::row_to_entry(&row)];
        self.attach_labels(&mut entries).await?;
        entries.pop().ok_or(Error::EntryNotFound(id))
    }

    async fn fetch_image(&self, owner: Uuid, id: Uuid) -> Result<(Entry, Vec<u8>)> {
        let entry = self.fetch(owner, id).await?;
        let data = self.storage.read(&entry.asset_path).await?;
        Ok((entry, data))
    }

    async fn search(&self, owner: Uuid, req: &EntrySearch) -> Result<EntryPage> {
        let start = Instant::now();
        let builder = EntryFilterQueryBuilder::new(owner, req);
        let (where_clause, params) = builder.build_where();
        let page_size = req.effective_page_size();
        let page = req.effective_page();

        let count_sql = format!("SELECT COUNT(*) FROM entries e WHERE {}", where_clause);
        let total: i64 = bind_params!(sqlx::query_scalar::<Sqlite, i64>(&count_sql), &params)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {} FROM entries e WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            ENTRY_COLUMNS,
            where_clause,
            builder.order_clause()
        );
        let mut list_params = params;
        list_params.push(QueryParam::Int(page_size));
        list_params.push(QueryParam::Int(req.offset()));
        let rows = bind_params!(sqlx::query::<Sqlite>(&list_sql), &list_params)
            .fetch_all(&self.pool)
            .await?;

        let mut entries: Vec<Entry> = rows.iter().map(Self::row_to_entry).collect();
        self.attach_labels(&mut entries).await?;

        debug!(
            subsystem = "db",
            component = "entries",
            op = "search",
            user_id = %owner,
            result_count = entries.len(),
            total = total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Entry search complete"
        );

        Ok(EntryPage::new(entries, total, page, page_size))
    }

    async fn update(&self, owner: Uuid, id: Uuid, req: EntryUpdate) -> Result<Entry> {
        let text_changed = req.title.is_some() || req.description.is_some() || req.notes.is_some();
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<QueryParam> = Vec::new();

        if let Some(title) = req.title {
            let title = title.trim();
            sets.push("title = ?");
            params.push(QueryParam::OptString(
                (!title.is_empty()).then(|| title.to_string()),
            ));
        }
        if let Some(description) = req.description {
            sets.push("description = ?");
            params.push(QueryParam::String(description));
        }
        if let Some(link) = req.link {
            let link = link.trim();
            sets.push("link = ?");
            params.push(QueryParam::OptString(
                (!link.is_empty()).then(|| link.to_string()),
            ));
        }
        if let Some(notes) = req.notes {
            sets.push("notes = ?");
            params.push(QueryParam::String(notes));
        }
        if let Some(favorite) = req.favorite {
            sets.push("favorite = ?");
            params.push(QueryParam::Bool(favorite));
        }
        if let Some(archived) = req.archived {
            sets.push("archived = ?");
            params.push(QueryParam::Bool(archived));
        }
        sets.push("updated_at = ?");
        params.push(QueryParam::Int(Utc::now().timestamp_millis()));
        params.push(QueryParam::Uuid(id));
        params.push(QueryParam::Uuid(owner));

        let sql = format!(
            "UPDATE entries SET {} WHERE id = ? AND owner_id = ?",
            sets.join(", ")
        );

        let mut tx = self.pool.begin().await?;
        let result = bind_params!(sqlx::query::<Sqlite>(&sql), &params)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::EntryNotFound(id));
        }
        if text_changed {
            Self::refresh_search_columns_tx(&mut tx, id).await?;
        }

        if let Some(categories) = req.categories {
            Self::replace_labels_tx(&mut tx, id, LabelKind::Category, &normalize_labels(categories))
                .await?;
        }
        if let Some(tags) = req.tags {
            Self::replace_labels_tx(&mut tx, id, LabelKind::Tag, &normalize_labels(tags)).await?;
        }
        tx.commit().await?;

        debug!(
            subsystem = "db",
            component = "entries",
            op = "update",
            entry_id = %id,
            "Entry updated"
        );

        self.fetch(owner, id).await
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let asset_path = Self::owned_asset_path_tx(&mut tx, owner, id).await?;

        sqlx::query("DELETE FROM entries WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        let parked = pending_delete_path(&asset_path);
        let has_asset = match self.storage.rename(&asset_path, &parked).await {
            Ok(()) => true,
            Err(Error::NotFound(_)) => false,
            Err(e) => {
                warn!(
                    subsystem = "db",
                    component = "entries",
                    op = "delete",
                    entry_id = %id,
                    asset_path = %asset_path,
                    error = %e,
                    "Asset removal failed, rolling back entry delete"
                );
                tx.rollback().await?;
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            if has_asset {
                self.restore_parked_asset(id, &parked, &asset_path).await;
            }
            return Err(e.into());
        }

        if has_asset {
            if let Err(e) = self.storage.delete(&parked).await {
                error!(
                    subsystem = "db",
                    component = "entries",
                    op = "delete",
                    entry_id = %id,
                    asset_path = %parked,
                    error = %e,
                    "Orphaned asset could not be removed"
                );
            }
        }

        info!(
            subsystem = "db",
            component = "entries",
            op = "delete",
            entry_id = %id,
            user_id = %owner,
            "Entry deleted"
        );
        Ok(())
    }

    async fn bulk(&self, owner: Uuid, ids: &[Uuid], action: BulkAction) -> Result<BulkResult> {
        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut failed = Vec::new();
        let updated = match action {
            BulkAction::Archive => self.set_flag(owner, &unique, "archived", true).await?,
            BulkAction::Unarchive => self.set_flag(owner, &unique, "archived", false).await?,
            BulkAction::Favorite => self.set_flag(owner, &unique, "favorite", true).await?,
            BulkAction::Unfavorite => self.set_flag(owner, &unique, "favorite", false).await?,
            BulkAction::Delete => {
                let mut deleted = Vec::new();
                for id in &unique {
                    match self.delete(owner, *id).await {
                        Ok(()) => deleted.push(*id),
                        Err(Error::EntryNotFound(_)) => {}
                        Err(e) => {
                            warn!(
                                subsystem = "db",
                                component = "entries",
                                op = "bulk",
                                entry_id = %id,
                                error = %e,
                                "Bulk delete of entry failed"
                            );
                            failed.push(*id);
                        }
                    }
                }
                deleted
            }
        };

        let settled: HashSet<Uuid> = updated.iter().chain(failed.iter()).copied().collect();
        let not_found = unique
            .into_iter()
            .filter(|id| !settled.contains(id))
            .collect();

        info!(
            subsystem = "db",
            component = "entries",
            op = "bulk",
            user_id = %owner,
            action = ?action,
            result_count = updated.len(),
            "Bulk action applied"
        );

        Ok(BulkResult {
            updated,
            not_found,
            failed,
        })
    }

    async fn list_labels(&self, owner: Uuid, kind: LabelKind) -> Result<Vec<LabelCount>> {
        let rows = sqlx::query(
            "SELECT l.name AS name, COUNT(*) AS count
             FROM entry_label l JOIN entries e ON e.id = l.entry_id
             WHERE e.owner_id = ? AND l.kind = ?
             GROUP BY l.name
             ORDER BY l.name",
        )
        .bind(owner)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LabelCount {
                name: row.get("name"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn rename_label(
        &self,
        owner: Uuid,
        kind: LabelKind,
        from: &str,
        to: &str,
    ) -> Result<u64> {
        let from = normalize_label(from)
            .ok_or_else(|| Error::InvalidInput(format!("Empty {} name", kind)))?;
        let to = normalize_label(to)
            .ok_or_else(|| Error::InvalidInput(format!("New {} name is empty", kind)))?;

        let mut tx = self.pool.begin().await?;
        let affected = Self::touch_labelled_tx(&mut tx, owner, kind, &from).await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{} '{}'", kind, from)));
        }

        if from != to {
            // Entries that already carry the target label just lose the old one.
            sqlx::query(
                "DELETE FROM entry_label
                 WHERE kind = ? AND name = ?
                   AND entry_id IN (SELECT id FROM entries WHERE owner_id = ?)
                   AND entry_id IN (SELECT entry_id FROM entry_label WHERE kind = ? AND name = ?)",
            )
            .bind(kind.as_str())
            .bind(&from)
            .bind(owner)
            .bind(kind.as_str())
            .bind(&to)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE entry_label SET name = ?
                 WHERE kind = ? AND name = ?
                   AND entry_id IN (SELECT id FROM entries WHERE owner_id = ?)",
            )
            .bind(&to)
            .bind(kind.as_str())
            .bind(&from)
            .bind(owner)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            subsystem = "db",
            component = "entries",
            op = "rename_label",
            user_id = %owner,
            kind = %kind,
            result_count = affected,
            "Label renamed"
        );
        Ok(affected)
    }

    async fn remove_label(&self, owner: Uuid, kind: LabelKind, name: &str) -> Result<u64> {
        let name = normalize_label(name)
            .ok_or_else(|| Error::InvalidInput(format!("Empty {} name", kind)))?;

        let mut tx = self.pool.begin().await?;
        let affected = Self::touch_labelled_tx(&mut tx, owner, kind, &name).await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{} '{}'", kind, name)));
        }

        sqlx::query(
            "DELETE FROM entry_label
             WHERE kind = ? AND name = ?
               AND entry_id IN (SELECT id FROM entries WHERE owner_id = ?)",
        )
        .bind(kind.as_str())
        .bind(&name)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            subsystem = "db",
            component = "entries",
            op = "remove_label",
            user_id = %owner,
            kind = %kind,
            result_count = affected,
            "Label removed"
        );
        Ok(affected)
    }

    async fn stats(&self, owner: Uuid) -> Result<CatalogStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(favorite), 0) AS favorites,
                    COALESCE(SUM(archived), 0) AS archived,
                    COALESCE(SUM(size_bytes), 0) AS total_bytes,
                    MAX(created_at) AS last_upload
             FROM entries WHERE owner_id = ?",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(CatalogStats {
            total_entries: row.get("total"),
            favorites: row.get("favorites"),
            archived: row.get("archived"),
            total_bytes: row.get("total_bytes"),
            last_upload: opt_from_millis(row.get("last_upload")),
        })
    }
}
