use sqlx::FromRow;
use time::OffsetDateTime;

/// Test plan record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TestPlan {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<i64>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub created: OffsetDateTime,
    pub modified: OffsetDateTime,
    pub deleted: Option<OffsetDateTime>, // soft-delete marker
    pub is_current: bool,
}

impl TestPlan {
    pub fn is_live(&self) -> bool {
        self.deleted.is_none()
    }
}

/// Normalized mutable fields of a plan, written wholesale on create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlanFields {
    pub title: String,
    pub description: Option<String>,
    pub author: Option<i64>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTestPlan {
    pub test_plan_id: i64,
    pub fields: TestPlanFields,
}
