//! SQL generation for entry search.
//!
//! Converts an [`EntrySearch`] into a parameterized WHERE clause and ORDER BY
//! clause over the `entries e` table alias. All user input is bound, never
//! interpolated.

use picbase_core::{label_filter, EntrySearch, LabelKind, SortKey, SortOrder};
use uuid::Uuid;

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// Single UUID parameter (bound as a BLOB).
    Uuid(Uuid),
    /// Integer parameter.
    Int(i64),
    /// Boolean parameter.
    Bool(bool),
    /// String parameter.
    String(String),
    /// Nullable string parameter.
    OptString(Option<String>),
}

/// Bind a list of [`QueryParam`]s onto a sqlx query in order.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut q = $query;
        for param in $params {
            q = match param {
                $crate::filter::QueryParam::Uuid(id) => q.bind(*id),
                $crate::filter::QueryParam::Int(val) => q.bind(*val),
                $crate::filter::QueryParam::Bool(b) => q.bind(*b),
                $crate::filter::QueryParam::String(s) => q.bind(s.clone()),
                $crate::filter::QueryParam::OptString(s) => q.bind(s.clone()),
            };
        }
        q
    }};
}
pub(crate) use bind_params;

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
///
/// Use together with `ESCAPE '\'` in the SQL.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-folded text matched by the free-text query.
///
/// Fields are joined with a newline so a query cannot match across two of them.
pub fn fold_search_text(title: Option<&str>, description: &str, notes: &str) -> String {
    [title.unwrap_or(""), description, notes]
        .iter()
        .map(|field| field.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Case-folded sort key for a title; `None` when untitled.
pub fn fold_title(title: Option<&str>) -> Option<String> {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Builds the WHERE and ORDER BY clauses for one owner's entry search.
///
/// # Example
///
/// ```rust,ignore
/// let builder = EntryFilterQueryBuilder::new(owner_id, &search);
/// let (where_clause, params) = builder.build_where();
/// let sql = format!("SELECT ... FROM entries e WHERE {} ORDER BY {}", where_clause, builder.order_clause());
/// ```
pub struct EntryFilterQueryBuilder<'a> {
    owner_id: Uuid,
    search: &'a EntrySearch,
}

impl<'a> EntryFilterQueryBuilder<'a> {
    pub fn new(owner_id: Uuid, search: &'a EntrySearch) -> Self {
        Self { owner_id, search }
    }

    /// Build the WHERE clause fragment and its parameters, in placeholder order.
    pub fn build_where(&self) -> (String, Vec<QueryParam>) {
        let mut clauses = vec!["e.owner_id = ?".to_string()];
        let mut params = vec![QueryParam::Uuid(self.owner_id)];

        if !self.search.include_archived {
            clauses.push("e.archived = 0".to_string());
        }

        if self.search.favorites_only {
            clauses.push("e.favorite = 1".to_string());
        }

        if let Some(query) = self
            .search
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
        {
            let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
            clauses.push("e.search_text LIKE ? ESCAPE '\\'".to_string());
            params.push(QueryParam::String(pattern));
        }

        for (kind, raw) in [
            (LabelKind::Category, self.search.category.as_deref()),
            (LabelKind::Tag, self.search.tag.as_deref()),
        ] {
            if let Some(name) = label_filter(raw) {
                clauses.push(format!(
                    "EXISTS (SELECT 1 FROM entry_label l WHERE l.entry_id = e.id AND l.kind = '{}' AND l.name = ?)",
                    kind.as_str()
                ));
                params.push(QueryParam::String(name));
            }
        }

        (clauses.join(" AND "), params)
    }

    /// ORDER BY clause. Equal keys fall back to insertion order, newest first.
    pub fn order_clause(&self) -> String {
        build_order_clause(self.search.sort, self.search.effective_order())
    }
}

/// ORDER BY clause for a sort key and direction.
///
/// Untitled entries always sort after titled ones when sorting by title, which
/// compares the folded `title_key` so case never splits equal titles apart.
pub fn build_order_clause(sort: SortKey, order: SortOrder) -> String {
    let dir = order.as_sql();
    match sort {
        SortKey::Date => format!("e.created_at {}, e.rowid DESC", dir),
        SortKey::Title => format!(
            "(e.title_key IS NULL) ASC, e.title_key {}, e.rowid DESC",
            dir
        ),
        SortKey::Size => format!("e.size_bytes {}, e.rowid DESC", dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Uuid {
        Uuid::from_u128(7)
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_default_search_excludes_archived() {
        let search = EntrySearch::default();
        let (sql, params) = EntryFilterQueryBuilder::new(owner(), &search).build_where();
        assert_eq!(sql, "e.owner_id = ? AND e.archived = 0");
        assert_eq!(params, vec![QueryParam::Uuid(owner())]);
    }

    #[test]
    fn test_include_archived_drops_clause() {
        let search = EntrySearch {
            include_archived: true,
            ..Default::default()
        };
        let (sql, _) = EntryFilterQueryBuilder::new(owner(), &search).build_where();
        assert!(!sql.contains("archived"));
    }

    #[test]
    fn test_text_query_binds_folded_escaped_pattern() {
        let search = EntrySearch {
            query: Some(" 50%_OFF ".to_string()),
            ..Default::default()
        };
        let (sql, params) = EntryFilterQueryBuilder::new(owner(), &search).build_where();
        assert!(sql.contains("e.search_text LIKE ? ESCAPE"));
        assert_eq!(params.len(), 2);
        assert_eq!(params[1], QueryParam::String("%50\\%\\_off%".to_string()));
    }

    #[test]
    fn test_text_query_folds_non_ascii() {
        let search = EntrySearch {
            query: Some("ÉTÉ".to_string()),
            ..Default::default()
        };
        let (_, params) = EntryFilterQueryBuilder::new(owner(), &search).build_where();
        assert_eq!(params[1], QueryParam::String("%été%".to_string()));
    }

    #[test]
    fn test_fold_search_text() {
        assert_eq!(
            fold_search_text(Some("Café Été"), "Über", "ŒUVRE"),
            "café été\nüber\nœuvre"
        );
        assert_eq!(fold_search_text(None, "", "x"), "\n\nx");
    }

    #[test]
    fn test_fold_title() {
        assert_eq!(fold_title(Some("  Éclair ")).as_deref(), Some("éclair"));
        assert_eq!(fold_title(Some("   ")), None);
        assert_eq!(fold_title(None), None);
    }

    #[test]
    fn test_blank_query_ignored() {
        let search = EntrySearch {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        let (sql, params) = EntryFilterQueryBuilder::new(owner(), &search).build_where();
        assert!(!sql.contains("LIKE"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_label_filters_normalized() {
        let search = EntrySearch {
            category: Some("Nature".to_string()),
            tag: Some("  Sunset ".to_string()),
            favorites_only: true,
            ..Default::default()
        };
        let (sql, params) = EntryFilterQueryBuilder::new(owner(), &search).build_where();
        assert!(sql.contains("e.favorite = 1"));
        assert!(sql.contains("l.kind = 'category'"));
        assert!(sql.contains("l.kind = 'tag'"));
        assert_eq!(
            &params[1..],
            &[
                QueryParam::String("nature".to_string()),
                QueryParam::String("sunset".to_string())
            ]
        );
    }

    #[test]
    fn test_all_sentinel_disables_label_filter() {
        let search = EntrySearch {
            category: Some("All".to_string()),
            tag: Some("ALL".to_string()),
            ..Default::default()
        };
        let (sql, _) = EntryFilterQueryBuilder::new(owner(), &search).build_where();
        assert!(!sql.contains("entry_label"));
    }

    #[test]
    fn test_order_clauses() {
        assert_eq!(
            build_order_clause(SortKey::Date, SortOrder::Desc),
            "e.created_at DESC, e.rowid DESC"
        );
        assert_eq!(
            build_order_clause(SortKey::Size, SortOrder::Asc),
            "e.size_bytes ASC, e.rowid DESC"
        );
        assert_eq!(
            build_order_clause(SortKey::Title, SortOrder::Asc),
            "(e.title_key IS NULL) ASC, e.title_key ASC, e.rowid DESC"
        );
    }

    #[test]
    fn test_order_uses_sort_default() {
        let search = EntrySearch {
            sort: SortKey::Title,
            ..Default::default()
        };
        let order = EntryFilterQueryBuilder::new(owner(), &search).order_clause();
        assert!(order.contains("e.title_key ASC"));
    }
}
