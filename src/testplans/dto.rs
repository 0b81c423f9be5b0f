use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::repo_types::TestPlan;

/// Request body for plan mutations: `{"test_plan": {...}}`.
#[derive(Debug, Default, Deserialize)]
pub struct TestPlanRequest {
    #[serde(default)]
    pub test_plan: TestPlanInput,
}

/// Raw, untyped plan fields as sent by the client.
#[derive(Debug, Default, Deserialize)]
pub struct TestPlanInput {
    #[serde(default)]
    pub test_plan_id: Option<Value>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub start_date: Option<Value>,
    #[serde(default)]
    pub end_date: Option<Value>,
    #[serde(default)]
    pub is_current: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestPlanOut {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<i64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub is_current: bool,
}

impl From<TestPlan> for TestPlanOut {
    fn from(p: TestPlan) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            author: p.author,
            start_date: p.start_date,
            end_date: p.end_date,
            is_current: p.is_current,
        }
    }
}

/// The current plan, or `{}` when there is none.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CurrentPlan {
    Found(TestPlanOut),
    Empty {},
}
