use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::db::PgStore;
use crate::testplans::repo_types::{TestPlan, TestPlanFields};

const PLAN_COLUMNS: &str = "id, title, description, author, start_date, end_date, \
                            created, modified, deleted, is_current";

/// Serializes every transaction that moves the current flag.
const CURRENT_PLAN_LOCK: i64 = 0x7465_7374_706c_616e;

#[async_trait]
pub trait TestPlanStore: Send + Sync {
    /// Whether a non-deleted plan with this id exists.
    async fn is_live(&self, id: i64) -> anyhow::Result<bool>;
    /// Inserts a plan; when it is current, every other plan stops being current.
    async fn create(&self, fields: &TestPlanFields) -> anyhow::Result<TestPlan>;
    /// Overwrites all mutable fields of a live plan. `None` if there is no such plan.
    async fn update(&self, id: i64, fields: &TestPlanFields) -> anyhow::Result<Option<TestPlan>>;
    /// Marks a live plan deleted and not current. `None` if there is no such plan.
    async fn soft_delete(&self, id: i64) -> anyhow::Result<Option<TestPlan>>;
    async fn current(&self) -> anyhow::Result<Option<TestPlan>>;
    /// Live, non-current plans ordered by id, optionally filtered by a
    /// case-insensitive title substring.
    async fn list(&self, title: Option<&str>) -> anyhow::Result<Vec<TestPlan>>;
}

/// Escapes `LIKE` metacharacters so the needle matches literally.
pub(crate) fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Takes the transaction-scoped lock that serializes plan writers. Must be
/// the first statement of the transaction, before any plan row is touched.
async fn lock_plans(tx: &mut Transaction<'_, Postgres>) -> anyhow::Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CURRENT_PLAN_LOCK)
        .execute(&mut **tx)
        .await
        .context("lock current plan")?;
    Ok(())
}

/// Clears the flag on every other live plan, then sets it on `id`.
/// Caller holds [`lock_plans`].
async fn set_current(tx: &mut Transaction<'_, Postgres>, id: i64) -> anyhow::Result<TestPlan> {
    sqlx::query(
        r#"
        UPDATE test_plans
           SET is_current = FALSE, modified = now()
         WHERE is_current AND deleted IS NULL AND id <> $1
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await
    .context("clear current plans")?;

    let plan = sqlx::query_as::<_, TestPlan>(&format!(
        r#"
        UPDATE test_plans
           SET is_current = TRUE, modified = now()
         WHERE id = $1 AND deleted IS NULL
        RETURNING {PLAN_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_one(&mut **tx)
    .await
    .context("set current plan")?;
    Ok(plan)
}

#[async_trait]
impl TestPlanStore for PgStore {
    async fn is_live(&self, id: i64) -> anyhow::Result<bool> {
        let live: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM test_plans WHERE id = $1 AND deleted IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .context("check test plan")?;
        Ok(live)
    }

    async fn create(&self, fields: &TestPlanFields) -> anyhow::Result<TestPlan> {
        let mut tx = self.pool.begin().await.context("begin tx")?;
        lock_plans(&mut tx).await?;
        let plan = sqlx::query_as::<_, TestPlan>(&format!(
            r#"
            INSERT INTO test_plans (title, description, author, start_date, end_date, is_current)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.author)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .fetch_one(&mut *tx)
        .await
        .context("insert test plan")?;

        let plan = if fields.is_current {
            set_current(&mut tx, plan.id).await?
        } else {
            plan
        };
        tx.commit().await.context("commit tx")?;
        Ok(plan)
    }

    async fn update(&self, id: i64, fields: &TestPlanFields) -> anyhow::Result<Option<TestPlan>> {
        let mut tx = self.pool.begin().await.context("begin tx")?;
        lock_plans(&mut tx).await?;
        let row = sqlx::query_as::<_, TestPlan>(&format!(
            r#"
            UPDATE test_plans
               SET title = $2, description = $3, author = $4,
                   start_date = $5, end_date = $6, is_current = FALSE, modified = now()
             WHERE id = $1 AND deleted IS NULL
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.author)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .fetch_optional(&mut *tx)
        .await
        .context("update test plan")?;

        let Some(plan) = row else {
            return Ok(None);
        };
        let plan = if fields.is_current {
            set_current(&mut tx, plan.id).await?
        } else {
            plan
        };
        tx.commit().await.context("commit tx")?;
        Ok(Some(plan))
    }

    async fn soft_delete(&self, id: i64) -> anyhow::Result<Option<TestPlan>> {
        let plan = sqlx::query_as::<_, TestPlan>(&format!(
            r#"
            UPDATE test_plans
               SET deleted = now(), is_current = FALSE, modified = now()
             WHERE id = $1 AND deleted IS NULL
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("soft delete test plan")?;
        Ok(plan)
    }

    async fn current(&self) -> anyhow::Result<Option<TestPlan>> {
        let plan = sqlx::query_as::<_, TestPlan>(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
              FROM test_plans
             WHERE is_current AND deleted IS NULL
             ORDER BY id ASC
             LIMIT 1
            "#
        ))
        .fetch_optional(&self.pool)
        .await
        .context("current test plan")?;
        Ok(plan)
    }

    async fn list(&self, title: Option<&str>) -> anyhow::Result<Vec<TestPlan>> {
        let pattern = title
            .filter(|t| !t.is_empty())
            .map(|t| format!("%{}%", escape_like(t)));
        let plans = sqlx::query_as::<_, TestPlan>(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
              FROM test_plans
             WHERE deleted IS NULL
               AND NOT is_current
               AND ($1::TEXT IS NULL OR title ILIKE $1 ESCAPE '\')
             ORDER BY id ASC
            "#
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .context("list test plans")?;
        Ok(plans)
    }
}
