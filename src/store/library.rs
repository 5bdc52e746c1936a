use super::*;

use sqlx::sqlite::SqliteRow;

use crate::types::{BookDraft, BookRecord, CatalogEntry, YearCount};

fn row_to_book(row: &SqliteRow) -> BookRecord {
    BookRecord {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        genre: row.get("genre"),
        pages: row.get("pages"),
        rating: row.get("rating"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
    }
}

/// Trim a user-supplied catalog name; blank means "not set".
fn normalized(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl SqliteStore {
    pub async fn get_or_create_author(&self, name: &str) -> anyhow::Result<i64> {
        sqlx::query("INSERT OR IGNORE INTO authors (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT id FROM authors WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    pub async fn get_or_create_genre(&self, name: &str) -> anyhow::Result<i64> {
        sqlx::query("INSERT OR IGNORE INTO genres (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT id FROM genres WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    async fn resolve_catalog_ids(
        &self,
        draft: &BookDraft,
    ) -> anyhow::Result<(Option<i64>, Option<i64>)> {
        let author_id = match normalized(draft.author.as_deref()) {
            Some(name) => Some(self.get_or_create_author(name).await?),
            None => None,
        };
        let genre_id = match normalized(draft.genre.as_deref()) {
            Some(name) => Some(self.get_or_create_genre(name).await?),
            None => None,
        };
        Ok((author_id, genre_id))
    }

    pub async fn insert_book(&self, draft: &BookDraft) -> anyhow::Result<BookRecord> {
        let (author_id, genre_id) = self.resolve_catalog_ids(draft).await?;
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO books
                (title, author_id, genre_id, pages, rating, start_date, end_date,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(draft.title.trim())
        .bind(author_id)
        .bind(genre_id)
        .bind(draft.pages)
        .bind(draft.rating)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_book(id)
            .await?
            .ok_or_else(|| anyhow!("book {} missing after insert", id))
    }

    pub async fn get_book(&self, id: i64) -> anyhow::Result<Option<BookRecord>> {
        let row = sqlx::query(
            "SELECT b.id, b.title, a.name AS author, g.name AS genre,
                    b.pages, b.rating, b.start_date, b.end_date
             FROM books b
             LEFT JOIN authors a ON a.id = b.author_id
             LEFT JOIN genres g ON g.id = b.genre_id
             WHERE b.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_book(&r)))
    }

    pub async fn list_books(&self) -> anyhow::Result<Vec<BookRecord>> {
        let rows = sqlx::query(
            "SELECT b.id, b.title, a.name AS author, g.name AS genre,
                    b.pages, b.rating, b.start_date, b.end_date
             FROM books b
             LEFT JOIN authors a ON a.id = b.author_id
             LEFT JOIN genres g ON g.id = b.genre_id
             ORDER BY b.created_at DESC, b.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_book).collect())
    }

    pub async fn update_book(
        &self,
        id: i64,
        draft: &BookDraft,
    ) -> anyhow::Result<Option<BookRecord>> {
        let (author_id, genre_id) = self.resolve_catalog_ids(draft).await?;
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE books SET title = ?, author_id = ?, genre_id = ?, pages = ?,
                    rating = ?, start_date = ?, end_date = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(draft.title.trim())
        .bind(author_id)
        .bind(genre_id)
        .bind(draft.pages)
        .bind(draft.rating)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_book(id).await
    }

    pub async fn delete_book(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_authors(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        let rows = sqlx::query(
            "SELECT a.id, a.name, COUNT(b.id) AS book_count
             FROM authors a
             LEFT JOIN books b ON b.author_id = a.id
             GROUP BY a.id, a.name
             ORDER BY a.name COLLATE NOCASE ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| CatalogEntry {
                id: r.get("id"),
                name: r.get("name"),
                book_count: r.get("book_count"),
            })
            .collect())
    }

    pub async fn list_genres(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        let rows = sqlx::query(
            "SELECT g.id, g.name, COUNT(b.id) AS book_count
             FROM genres g
             LEFT JOIN books b ON b.genre_id = g.id
             GROUP BY g.id, g.name
             ORDER BY g.name COLLATE NOCASE ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| CatalogEntry {
                id: r.get("id"),
                name: r.get("name"),
                book_count: r.get("book_count"),
            })
            .collect())
    }

    /// Books finished and pages read, grouped by completion year, newest first.
    pub async fn year_counts(&self) -> anyhow::Result<Vec<YearCount>> {
        let rows = sqlx::query(
            "SELECT CAST(strftime('%Y', end_date) AS INTEGER) AS year,
                    COUNT(*) AS books,
                    COALESCE(SUM(pages), 0) AS pages
             FROM books
             WHERE end_date IS NOT NULL
             GROUP BY year
             ORDER BY year DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| YearCount {
                year: r.get("year"),
                books: r.get("books"),
                pages: r.get("pages"),
            })
            .collect())
    }
}
