//! In-memory store used by unit and router tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::auth::{
    password::hash_password,
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::testplans::{
    repo::TestPlanStore,
    repo_types::{TestPlan, TestPlanFields},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    plans: Vec<TestPlan>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_active: bool,
        is_staff: bool,
    ) -> User {
        let mut user = self
            .create_user(&NewUser {
                username: username.into(),
                email: email.into(),
                password_hash: hash_password(password).expect("hash"),
                is_staff,
            })
            .await
            .expect("insert user");
        user.is_active = is_active;
        let mut tables = self.tables.lock().await;
        if let Some(stored) = tables.users.iter_mut().find(|u| u.id == user.id) {
            stored.is_active = is_active;
        }
        user
    }

    pub async fn set_names(&self, id: i64, first_name: &str, last_name: &str) {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.first_name = first_name.into();
            user.last_name = last_name.into();
        }
    }

    /// Every plan including deleted ones.
    pub async fn all_plans(&self) -> Vec<TestPlan> {
        self.tables.lock().await.plans.clone()
    }
}

fn set_current(plans: &mut [TestPlan], id: i64, now: OffsetDateTime) {
    for plan in plans.iter_mut().filter(|p| p.is_live()) {
        let current = plan.id == id;
        if plan.is_current != current {
            plan.is_current = current;
            plan.modified = now;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_active_staff(&self) -> anyhow::Result<Vec<User>> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.is_active && u.is_staff)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn create_user(&self, user: &NewUser) -> anyhow::Result<User> {
        let mut tables = self.tables.lock().await;
        anyhow::ensure!(
            !tables
                .users
                .iter()
                .any(|u| u.email == user.email || u.username == user.username),
            "duplicate user"
        );
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: tables.users.len() as i64 + 1,
            username: user.username.clone(),
            first_name: String::new(),
            last_name: String::new(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            is_active: true,
            is_staff: user.is_staff,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl TestPlanStore for MemoryStore {
    async fn is_live(&self, id: i64) -> anyhow::Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.plans.iter().any(|p| p.id == id && p.is_live()))
    }

    async fn create(&self, fields: &TestPlanFields) -> anyhow::Result<TestPlan> {
        let mut tables = self.tables.lock().await;
        let now = OffsetDateTime::now_utc();
        let id = tables.plans.len() as i64 + 1;
        tables.plans.push(TestPlan {
            id,
            title: fields.title.clone(),
            description: fields.description.clone(),
            author: fields.author,
            start_date: fields.start_date,
            end_date: fields.end_date,
            created: now,
            modified: now,
            deleted: None,
            is_current: false,
        });
        if fields.is_current {
            set_current(&mut tables.plans, id, now);
        }
        let created = tables.plans.iter().find(|p| p.id == id).cloned();
        created.ok_or_else(|| anyhow::anyhow!("inserted plan missing"))
    }

    async fn update(&self, id: i64, fields: &TestPlanFields) -> anyhow::Result<Option<TestPlan>> {
        let mut tables = self.tables.lock().await;
        let now = OffsetDateTime::now_utc();
        let Some(plan) = tables.plans.iter_mut().find(|p| p.id == id && p.is_live()) else {
            return Ok(None);
        };
        plan.title = fields.title.clone();
        plan.description = fields.description.clone();
        plan.author = fields.author;
        plan.start_date = fields.start_date;
        plan.end_date = fields.end_date;
        plan.is_current = false;
        plan.modified = now;
        if fields.is_current {
            set_current(&mut tables.plans, id, now);
        }
        Ok(tables.plans.iter().find(|p| p.id == id).cloned())
    }

    async fn soft_delete(&self, id: i64) -> anyhow::Result<Option<TestPlan>> {
        let mut tables = self.tables.lock().await;
        let now = OffsetDateTime::now_utc();
        Ok(tables
            .plans
            .iter_mut()
            .find(|p| p.id == id && p.is_live())
            .map(|plan| {
                plan.deleted = Some(now);
                plan.is_current = false;
                plan.modified = now;
                plan.clone()
            }))
    }

    async fn current(&self) -> anyhow::Result<Option<TestPlan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .plans
            .iter()
            .find(|p| p.is_current && p.is_live())
            .cloned())
    }

    async fn list(&self, title: Option<&str>) -> anyhow::Result<Vec<TestPlan>> {
        let tables = self.tables.lock().await;
        let needle = title.map(str::to_lowercase);
        Ok(tables
            .plans
            .iter()
            .filter(|p| p.is_live() && !p.is_current)
            .filter(|p| match &needle {
                Some(n) => p.title.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }
}
