use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        extractors::{AuthUser, TestPlanScope},
        handlers::body_or_400,
    },
    error::{ApiError, Envelope, Within, Wrapped},
    state::AppState,
    testplans::{
        dto::{CurrentPlan, ListQuery, TestPlanOut, TestPlanRequest},
        repo::TestPlanStore,
        services,
    },
};

const ENVELOPE: Envelope = Envelope::TestPlan;

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/api/testplan/create/", post(create_plan))
        .route("/api/testplan/update/", post(update_plan).put(update_plan))
        .route("/api/testplan/delete/", post(delete_plan).delete(delete_plan))
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/testplan/current/", get(current_plan))
        .route("/api/testplan/all/", get(list_plans))
}

type PlanResponse = Result<Json<Wrapped<TestPlanOut>>, ApiError>;

#[instrument(skip(state, auth, body), fields(user_id = auth.user.id))]
pub async fn create_plan(
    State(state): State<AppState>,
    auth: AuthUser<TestPlanScope>,
    body: Result<Json<TestPlanRequest>, JsonRejection>,
) -> PlanResponse {
    let request = body_or_400(body, ENVELOPE)?;
    let plan = services::create_test_plan(
        state.users.as_ref(),
        state.plans.as_ref(),
        &request.test_plan,
    )
    .await
    .within(ENVELOPE)?;
    Ok(ENVELOPE.wrap(TestPlanOut::from(plan)))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.user.id))]
pub async fn update_plan(
    State(state): State<AppState>,
    auth: AuthUser<TestPlanScope>,
    body: Result<Json<TestPlanRequest>, JsonRejection>,
) -> PlanResponse {
    let request = body_or_400(body, ENVELOPE)?;
    let plan = services::update_test_plan(
        state.users.as_ref(),
        state.plans.as_ref(),
        &request.test_plan,
    )
    .await
    .within(ENVELOPE)?;
    Ok(ENVELOPE.wrap(TestPlanOut::from(plan)))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.user.id))]
pub async fn delete_plan(
    State(state): State<AppState>,
    auth: AuthUser<TestPlanScope>,
    body: Result<Json<TestPlanRequest>, JsonRejection>,
) -> PlanResponse {
    let request = body_or_400(body, ENVELOPE)?;
    let plan = services::delete_test_plan(state.plans.as_ref(), &request.test_plan)
        .await
        .within(ENVELOPE)?;
    Ok(ENVELOPE.wrap(TestPlanOut::from(plan)))
}

#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn current_plan(
    State(state): State<AppState>,
    auth: AuthUser<TestPlanScope>,
) -> Result<Json<Wrapped<CurrentPlan>>, ApiError> {
    let current = state.plans.current().await.within(ENVELOPE)?;
    Ok(ENVELOPE.wrap(match current {
        Some(plan) => CurrentPlan::Found(plan.into()),
        None => CurrentPlan::Empty {},
    }))
}

#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn list_plans(
    State(state): State<AppState>,
    auth: AuthUser<TestPlanScope>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Wrapped<Vec<TestPlanOut>>>, ApiError> {
    let plans = state
        .plans
        .list(query.title.as_deref())
        .await
        .within(ENVELOPE)?;
    Ok(ENVELOPE.wrap(plans.into_iter().map(TestPlanOut::from).collect()))
}
