use super::*;

use sqlx::sqlite::SqliteRow;

use crate::types::ChallengeDefinition;

/// Challenge fields ready to persist, with the compiled query attached.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub name: String,
    pub description: Option<String>,
    pub goal_value: i64,
    pub unit: String,
    pub year: i32,
    pub rule_description: Option<String>,
    pub query_sql: String,
}

fn row_to_challenge(row: &SqliteRow) -> ChallengeDefinition {
    ChallengeDefinition {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        goal_value: row.get("goal_value"),
        unit: row.get("unit"),
        year: row.get("year"),
        rule_description: row.get("rule_description"),
        query_sql: row.get("query_sql"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl SqliteStore {
    pub async fn insert_challenge(
        &self,
        challenge: &NewChallenge,
    ) -> anyhow::Result<ChallengeDefinition> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO challenges
                (name, description, goal_value, unit, year, rule_description, query_sql,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&challenge.name)
        .bind(&challenge.description)
        .bind(challenge.goal_value)
        .bind(&challenge.unit)
        .bind(challenge.year)
        .bind(&challenge.rule_description)
        .bind(&challenge.query_sql)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_challenge(id)
            .await?
            .ok_or_else(|| anyhow!("challenge {} missing after insert", id))
    }

    pub async fn get_challenge(&self, id: i64) -> anyhow::Result<Option<ChallengeDefinition>> {
        let row = sqlx::query(
            "SELECT id, name, description, goal_value, unit, year, rule_description, query_sql,
                    created_at, updated_at
             FROM challenges WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_challenge(&r)))
    }

    pub async fn list_challenges(&self) -> anyhow::Result<Vec<ChallengeDefinition>> {
        let rows = sqlx::query(
            "SELECT id, name, description, goal_value, unit, year, rule_description, query_sql,
                    created_at, updated_at
             FROM challenges ORDER BY year DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_challenge).collect())
    }

    pub async fn list_challenges_for_year(
        &self,
        year: i32,
    ) -> anyhow::Result<Vec<ChallengeDefinition>> {
        let rows = sqlx::query(
            "SELECT id, name, description, goal_value, unit, year, rule_description, query_sql,
                    created_at, updated_at
             FROM challenges WHERE year = ? ORDER BY id ASC",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_challenge).collect())
    }

    /// Overwrite every user-editable field. Returns None when the id does not
    /// exist so callers can surface a not-found instead of a silent no-op.
    pub async fn update_challenge(
        &self,
        id: i64,
        challenge: &NewChallenge,
    ) -> anyhow::Result<Option<ChallengeDefinition>> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE challenges SET name = ?, description = ?, goal_value = ?, unit = ?,
                    year = ?, rule_description = ?, query_sql = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&challenge.name)
        .bind(&challenge.description)
        .bind(challenge.goal_value)
        .bind(&challenge.unit)
        .bind(challenge.year)
        .bind(&challenge.rule_description)
        .bind(&challenge.query_sql)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_challenge(id).await
    }

    pub async fn delete_challenge(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM challenges WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
