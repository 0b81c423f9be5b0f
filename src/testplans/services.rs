use tracing::{info, warn};

use crate::auth::repo::UserStore;
use crate::error::{ApiErrorKind, FieldErrors, ValidationError};
use crate::testplans::{
    dto::TestPlanInput,
    repo::TestPlanStore,
    repo_types::{TestPlan, TestPlanFields, UpdateTestPlan},
    validation::{check_dates, parse_create, parse_delete, parse_update},
};

fn reject(err: ValidationError) -> ApiErrorKind {
    FieldErrors::rule(err).into()
}

async fn check_author(users: &dyn UserStore, author: Option<i64>) -> Result<(), ApiErrorKind> {
    let Some(id) = author else {
        return Ok(());
    };
    match users.find_by_id(id).await? {
        Some(user) if user.is_active => Ok(()),
        _ => Err(reject(ValidationError::NoSuchAuthor)),
    }
}

async fn check_plan(plans: &dyn TestPlanStore, id: i64) -> Result<(), ApiErrorKind> {
    if plans.is_live(id).await? {
        Ok(())
    } else {
        Err(reject(ValidationError::NoSuchTestPlan))
    }
}

async fn check_rules(users: &dyn UserStore, fields: &TestPlanFields) -> Result<(), ApiErrorKind> {
    check_author(users, fields.author).await?;
    check_dates(fields).map_err(reject)
}

pub async fn validate_create(
    users: &dyn UserStore,
    input: &TestPlanInput,
) -> Result<TestPlanFields, ApiErrorKind> {
    let fields = parse_create(input)?;
    check_rules(users, &fields).await?;
    Ok(fields)
}

pub async fn validate_update(
    users: &dyn UserStore,
    plans: &dyn TestPlanStore,
    input: &TestPlanInput,
) -> Result<UpdateTestPlan, ApiErrorKind> {
    let update = parse_update(input)?;
    check_plan(plans, update.test_plan_id).await?;
    check_rules(users, &update.fields).await?;
    Ok(update)
}

pub async fn validate_delete(
    plans: &dyn TestPlanStore,
    input: &TestPlanInput,
) -> Result<i64, ApiErrorKind> {
    let id = parse_delete(input)?;
    check_plan(plans, id).await?;
    Ok(id)
}

pub async fn create_test_plan(
    users: &dyn UserStore,
    plans: &dyn TestPlanStore,
    input: &TestPlanInput,
) -> Result<TestPlan, ApiErrorKind> {
    let fields = validate_create(users, input).await?;
    let plan = plans.create(&fields).await?;
    info!(test_plan_id = plan.id, is_current = plan.is_current, "test plan created");
    Ok(plan)
}

/// Full replace: fields missing from the input are reset to their defaults.
pub async fn update_test_plan(
    users: &dyn UserStore,
    plans: &dyn TestPlanStore,
    input: &TestPlanInput,
) -> Result<TestPlan, ApiErrorKind> {
    let UpdateTestPlan {
        test_plan_id,
        fields,
    } = validate_update(users, plans, input).await?;
    // deleted between validation and write
    let Some(plan) = plans.update(test_plan_id, &fields).await? else {
        warn!(test_plan_id, "test plan vanished before update");
        return Err(reject(ValidationError::NoSuchTestPlan));
    };
    info!(test_plan_id, is_current = plan.is_current, "test plan updated");
    Ok(plan)
}

pub async fn delete_test_plan(
    plans: &dyn TestPlanStore,
    input: &TestPlanInput,
) -> Result<TestPlan, ApiErrorKind> {
    let test_plan_id = validate_delete(plans, input).await?;
    let Some(plan) = plans.soft_delete(test_plan_id).await? else {
        warn!(test_plan_id, "test plan vanished before delete");
        return Err(reject(ValidationError::NoSuchTestPlan));
    };
    info!(test_plan_id, "test plan deleted");
    Ok(plan)
}
