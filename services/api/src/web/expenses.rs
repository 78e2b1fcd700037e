//! services/api/src/web/expenses.rs
//!
//! Money endpoints: expenses with budget rollups, categories, budgets and
//! their summaries, financial goals, recurring schedules, subscriptions,
//! accounts, and per-user currencies.
//!
//! Paying a schedule or subscription is transactional in the adapter: the
//! expense lands, overlapping budgets are bumped, and the item rolls
//! forward by its cadence, all or nothing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::medicine_reminders::parse_reference_date;
use crate::web::middleware::CallerId;
use crate::web::state::AppState;
use household_core::domain::{
    Account, Budget, Expense, ExpenseCategory, ExpenseFrequency, ExpenseSchedule, FinancialGoal,
    PaymentMethod, Subscription, UserCurrency,
};
use household_core::ports::ExpenseFilter;
use household_core::recurrence::next_occurrence;

//=========================================================================================
// Expenses
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseListQuery {
    pub category_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_recurring: Option<bool>,
}

pub async fn list_expenses_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ExpenseListQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = ExpenseFilter {
        category_id: query.category_id,
        start_date: query
            .start_date
            .as_deref()
            .and_then(|raw| parse_reference_date(Some(raw))),
        end_date: query
            .end_date
            .as_deref()
            .and_then(|raw| parse_reference_date(Some(raw))),
        is_recurring: query.is_recurring,
    };
    let expenses = state.db.list_expenses(user_id, filter).await?;
    Ok(Json(serde_json::json!({ "status": 200, "expenses": expenses })))
}

pub async fn get_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let expense = state
        .db
        .find_expense(user_id, expense_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;
    Ok(Json(serde_json::json!({ "status": 200, "expense": expense })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub expense_date: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory: Option<String>,
    pub tags: Option<Vec<String>>,
    pub payment_method: Option<String>,
    pub payment_account: Option<String>,
    pub vendor: Option<String>,
    pub location: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub budget_id: Option<Uuid>,
    pub is_recurring: Option<bool>,
    pub frequency: Option<String>,
    pub recurring_until: Option<String>,
}

pub async fn create_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    let (title, amount) = match (
        req.title.clone().filter(|t| !t.trim().is_empty()),
        req.amount,
    ) {
        (Some(t), Some(a)) => (t, a),
        _ => return Err(ApiError::bad_request("title and amount are required")),
    };

    if let Some(category_id) = req.category_id {
        state
            .db
            .find_category(user_id, category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found for current user"))?;
    }

    let now = state.clock.now();
    let expense_date = req
        .expense_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
        .unwrap_or(now);

    if let Some(budget_id) = req.budget_id {
        let budget = state
            .db
            .find_budget(user_id, budget_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Budget not found"))?;
        if budget.start_date > expense_date || budget.end_date < expense_date {
            return Err(ApiError::bad_request(
                "Expense date is outside the selected budget window",
            ));
        }
    }

    let expense = state
        .db
        .create_expense(
            Expense {
                id: Uuid::new_v4(),
                user_id,
                title,
                description: req.description,
                amount,
                currency: req.currency.unwrap_or_else(|| "USD".to_string()),
                expense_date,
                category_id: req.category_id,
                subcategory: req.subcategory,
                tags: req.tags.unwrap_or_default(),
                payment_method: req
                    .payment_method
                    .as_deref()
                    .map(PaymentMethod::from_input)
                    .unwrap_or(PaymentMethod::Cash),
                payment_account: req.payment_account,
                vendor: req.vendor,
                location: req.location,
                receipt_url: req.receipt_url,
                notes: req.notes,
                is_recurring: req.is_recurring.unwrap_or(false),
                frequency: req
                    .frequency
                    .as_deref()
                    .map(ExpenseFrequency::from_input)
                    .unwrap_or(ExpenseFrequency::OneTime),
                recurring_until: req
                    .recurring_until
                    .as_deref()
                    .and_then(|raw| parse_reference_date(Some(raw))),
                created_at: now,
            },
            req.budget_id,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "expense": expense })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub expense_date: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory: Option<String>,
    pub tags: Option<Vec<String>>,
    pub payment_method: Option<String>,
    pub payment_account: Option<String>,
    pub vendor: Option<String>,
    pub location: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: Option<bool>,
    pub frequency: Option<String>,
    pub recurring_until: Option<String>,
}

pub async fn update_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(expense_id): Path<Uuid>,
    Json(req): Json<UpdateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut expense = state
        .db
        .find_expense(user_id, expense_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;

    if let Some(category_id) = req.category_id {
        state
            .db
            .find_category(user_id, category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found for current user"))?;
        expense.category_id = Some(category_id);
    }
    if let Some(title) = req.title {
        expense.title = title;
    }
    if let Some(description) = req.description {
        expense.description = Some(description);
    }
    if let Some(amount) = req.amount {
        expense.amount = amount;
    }
    if let Some(currency) = req.currency {
        expense.currency = currency;
    }
    if let Some(parsed) = req
        .expense_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        expense.expense_date = parsed;
    }
    if let Some(subcategory) = req.subcategory {
        expense.subcategory = Some(subcategory);
    }
    if let Some(tags) = req.tags {
        expense.tags = tags;
    }
    if let Some(method) = req.payment_method.as_deref() {
        expense.payment_method = PaymentMethod::from_input(method);
    }
    if let Some(account) = req.payment_account {
        expense.payment_account = Some(account);
    }
    if let Some(vendor) = req.vendor {
        expense.vendor = Some(vendor);
    }
    if let Some(location) = req.location {
        expense.location = Some(location);
    }
    if let Some(receipt) = req.receipt_url {
        expense.receipt_url = Some(receipt);
    }
    if let Some(notes) = req.notes {
        expense.notes = Some(notes);
    }
    if let Some(is_recurring) = req.is_recurring {
        expense.is_recurring = is_recurring;
    }
    if let Some(frequency) = req.frequency.as_deref() {
        expense.frequency = ExpenseFrequency::from_input(frequency);
    }
    if let Some(parsed) = req
        .recurring_until
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        expense.recurring_until = Some(parsed);
    }

    let expense = state.db.update_expense(expense).await?;
    Ok(Json(serde_json::json!({ "status": 200, "expense": expense })))
}

pub async fn delete_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let expense = state
        .db
        .find_expense(user_id, expense_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;

    state.db.delete_expense(&expense).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Expense deleted" })))
}

//=========================================================================================
// Categories
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_default: Option<bool>,
}

pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let categories = state.db.list_categories(user_id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "categories": categories })))
}

pub async fn create_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("name is required"))?;

    let category = state
        .db
        .create_category(ExpenseCategory {
            id: Uuid::new_v4(),
            user_id,
            name,
            color: req.color,
            icon: req.icon,
            is_default: req.is_default.unwrap_or(false),
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "category": category })),
    ))
}

pub async fn update_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut category = state
        .db
        .find_category(user_id, category_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    if let Some(name) = req.name {
        category.name = name;
    }
    if let Some(color) = req.color {
        category.color = Some(color);
    }
    if let Some(icon) = req.icon {
        category.icon = Some(icon);
    }
    if let Some(is_default) = req.is_default {
        category.is_default = is_default;
    }

    let category = state.db.update_category(category).await?;
    Ok(Json(serde_json::json!({ "status": 200, "category": category })))
}

pub async fn delete_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let category = state
        .db
        .find_category(user_id, category_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    state.db.delete_category(category.id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Category deleted" })))
}

//=========================================================================================
// Budgets
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category_id: Option<Uuid>,
    pub alert_threshold: Option<f64>,
    pub alert_enabled: Option<bool>,
    pub active: Option<bool>,
}

pub async fn list_budgets_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let budgets = state.db.list_budgets(user_id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "budgets": budgets })))
}

/// A budget with its effective spent total and what is left of it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    #[serde(flatten)]
    pub budget: Budget,
    pub remaining: f64,
}

pub async fn budget_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let budgets = state.db.list_budgets(user_id).await?;
    let mut summaries = Vec::with_capacity(budgets.len());
    for mut budget in budgets {
        // The stored running total wins; a freshly created budget that
        // predates tracked expenses falls back to the computed sum.
        if budget.spent == 0.0 {
            budget.spent = state
                .db
                .sum_expenses(user_id, budget.start_date, budget.end_date, budget.category_id)
                .await?;
        }
        let remaining = budget.amount - budget.spent;
        summaries.push(BudgetSummary { budget, remaining });
    }
    Ok(Json(serde_json::json!({ "status": 200, "budgets": summaries })))
}

pub async fn create_budget_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<BudgetRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.clone().filter(|n| !n.trim().is_empty());
    let start = req
        .start_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)));
    let end = req
        .end_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)));
    let (name, amount, start_date, end_date) = match (name, req.amount, start, end) {
        (Some(n), Some(a), Some(s), Some(e)) => (n, a, s, e),
        _ => {
            return Err(ApiError::bad_request(
                "name, amount, startDate and endDate are required",
            ))
        }
    };

    if let Some(category_id) = req.category_id {
        state
            .db
            .find_category(user_id, category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found for current user"))?;
    }

    let budget = state
        .db
        .create_budget(Budget {
            id: Uuid::new_v4(),
            user_id,
            name,
            amount,
            currency: req.currency.unwrap_or_else(|| "USD".to_string()),
            start_date,
            end_date,
            category_id: req.category_id,
            spent: 0.0,
            alert_threshold: req.alert_threshold,
            alert_enabled: req.alert_enabled.unwrap_or(true),
            active: req.active.unwrap_or(true),
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "budget": budget })),
    ))
}

pub async fn update_budget_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(budget_id): Path<Uuid>,
    Json(req): Json<BudgetRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut budget = state
        .db
        .find_budget(user_id, budget_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Budget not found"))?;

    if let Some(category_id) = req.category_id {
        state
            .db
            .find_category(user_id, category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found for current user"))?;
        budget.category_id = Some(category_id);
    }
    if let Some(name) = req.name {
        budget.name = name;
    }
    if let Some(amount) = req.amount {
        budget.amount = amount;
    }
    if let Some(currency) = req.currency {
        budget.currency = currency;
    }
    if let Some(parsed) = req
        .start_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        budget.start_date = parsed;
    }
    if let Some(parsed) = req
        .end_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        budget.end_date = parsed;
    }
    if let Some(threshold) = req.alert_threshold {
        budget.alert_threshold = Some(threshold);
    }
    if let Some(enabled) = req.alert_enabled {
        budget.alert_enabled = enabled;
    }
    if let Some(active) = req.active {
        budget.active = active;
    }

    let budget = state.db.update_budget(budget).await?;
    Ok(Json(serde_json::json!({ "status": 200, "budget": budget })))
}

pub async fn delete_budget_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(budget_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let budget = state
        .db
        .find_budget(user_id, budget_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Budget not found"))?;

    state.db.delete_budget(budget.id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Budget deleted" })))
}

//=========================================================================================
// Financial goals
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<f64>,
    pub current_amount: Option<f64>,
    pub currency: Option<String>,
    pub target_date: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub completed: Option<bool>,
}

pub async fn list_goals_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let goals = state.db.list_goals(user_id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "goals": goals })))
}

pub async fn create_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<GoalRequest>,
) -> ApiResult<impl IntoResponse> {
    let (title, target_amount) = match (
        req.title.clone().filter(|t| !t.trim().is_empty()),
        req.target_amount,
    ) {
        (Some(t), Some(a)) => (t, a),
        _ => return Err(ApiError::bad_request("title and targetAmount are required")),
    };

    let goal = state
        .db
        .create_goal(FinancialGoal {
            id: Uuid::new_v4(),
            user_id,
            title,
            description: req.description,
            target_amount,
            current_amount: req.current_amount.unwrap_or(0.0),
            currency: req.currency.unwrap_or_else(|| "USD".to_string()),
            target_date: req
                .target_date
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            color: req.color,
            icon: req.icon,
            completed: false,
            completed_at: None,
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "goal": goal })),
    ))
}

pub async fn update_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(goal_id): Path<Uuid>,
    Json(req): Json<GoalRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut goal = state
        .db
        .find_goal(user_id, goal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Goal not found"))?;

    if let Some(title) = req.title {
        goal.title = title;
    }
    if let Some(description) = req.description {
        goal.description = Some(description);
    }
    if let Some(target) = req.target_amount {
        goal.target_amount = target;
    }
    if let Some(current) = req.current_amount {
        goal.current_amount = current;
    }
    if let Some(currency) = req.currency {
        goal.currency = currency;
    }
    if let Some(parsed) = req
        .target_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        goal.target_date = Some(parsed);
    }
    if let Some(color) = req.color {
        goal.color = Some(color);
    }
    if let Some(icon) = req.icon {
        goal.icon = Some(icon);
    }
    if let Some(completed) = req.completed {
        goal.completed = completed;
        goal.completed_at = if completed {
            goal.completed_at.or_else(|| Some(state.clock.now()))
        } else {
            None
        };
    }

    let goal = state.db.update_goal(goal).await?;
    Ok(Json(serde_json::json!({ "status": 200, "goal": goal })))
}

pub async fn delete_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(goal_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let goal = state
        .db
        .find_goal(user_id, goal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Goal not found"))?;

    state.db.delete_goal(goal.id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Goal deleted" })))
}

//=========================================================================================
// Recurring schedules
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub expense_id: Option<Uuid>,
    pub frequency: Option<String>,
    pub next_run_at: Option<String>,
    pub last_run_at: Option<String>,
    pub active: Option<bool>,
}

pub async fn list_schedules_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let schedules = state.db.list_schedules(user_id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "schedules": schedules })))
}

pub async fn create_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.clone().filter(|t| !t.trim().is_empty());
    let start = req
        .start_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)));
    let (title, amount, start_date) = match (title, req.amount, start) {
        (Some(t), Some(a), Some(s)) => (t, a, s),
        _ => {
            return Err(ApiError::bad_request(
                "title, amount, startDate are required",
            ))
        }
    };

    if let Some(expense_id) = req.expense_id {
        state
            .db
            .find_expense(user_id, expense_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Linked expense not found"))?;
    }

    let schedule = state
        .db
        .create_schedule(ExpenseSchedule {
            id: Uuid::new_v4(),
            user_id,
            expense_id: req.expense_id,
            title,
            amount,
            currency: req.currency.unwrap_or_else(|| "USD".to_string()),
            start_date,
            end_date: req
                .end_date
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            frequency: req
                .frequency
                .as_deref()
                .map(ExpenseFrequency::from_input)
                .unwrap_or(ExpenseFrequency::Monthly),
            next_run_at: req
                .next_run_at
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            last_run_at: req
                .last_run_at
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            active: req.active.unwrap_or(true),
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "schedule": schedule })),
    ))
}

pub async fn update_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(schedule_id): Path<Uuid>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut schedule = state
        .db
        .find_schedule(user_id, schedule_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Schedule not found"))?;

    if let Some(expense_id) = req.expense_id {
        state
            .db
            .find_expense(user_id, expense_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Linked expense not found"))?;
        schedule.expense_id = Some(expense_id);
    }
    if let Some(title) = req.title {
        schedule.title = title;
    }
    if let Some(amount) = req.amount {
        schedule.amount = amount;
    }
    if let Some(currency) = req.currency {
        schedule.currency = currency;
    }
    if let Some(parsed) = req
        .start_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        schedule.start_date = parsed;
    }
    if let Some(parsed) = req
        .end_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        schedule.end_date = Some(parsed);
    }
    if let Some(frequency) = req.frequency.as_deref() {
        schedule.frequency = ExpenseFrequency::from_input(frequency);
    }
    if let Some(parsed) = req
        .next_run_at
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        schedule.next_run_at = Some(parsed);
    }
    if let Some(parsed) = req
        .last_run_at
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        schedule.last_run_at = Some(parsed);
    }
    if let Some(active) = req.active {
        schedule.active = active;
    }

    let schedule = state.db.update_schedule(schedule).await?;
    Ok(Json(serde_json::json!({ "status": 200, "schedule": schedule })))
}

pub async fn delete_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(schedule_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let schedule = state
        .db
        .find_schedule(user_id, schedule_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Schedule not found"))?;

    state.db.delete_schedule(schedule.id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Schedule deleted" })))
}

pub async fn mark_schedule_paid_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(schedule_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let schedule = state
        .db
        .find_schedule(user_id, schedule_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Schedule not found"))?;

    let now = state.clock.now();
    let expense_date = schedule.next_run_at.unwrap_or(schedule.start_date);
    let frequency = schedule.frequency;

    let expense = Expense {
        id: Uuid::new_v4(),
        user_id,
        title: schedule.title.clone(),
        description: None,
        amount: schedule.amount,
        currency: schedule.currency.clone(),
        expense_date,
        category_id: None,
        subcategory: None,
        tags: Vec::new(),
        payment_method: PaymentMethod::Cash,
        payment_account: None,
        vendor: None,
        location: None,
        receipt_url: None,
        notes: Some("Scheduled expense paid".to_string()),
        is_recurring: frequency != ExpenseFrequency::OneTime,
        frequency,
        recurring_until: None,
        created_at: now,
    };

    let follow_up = (frequency != ExpenseFrequency::OneTime).then(|| {
        let next = next_occurrence(expense_date, frequency);
        ExpenseSchedule {
            id: Uuid::new_v4(),
            user_id,
            expense_id: None,
            title: schedule.title.clone(),
            amount: schedule.amount,
            currency: schedule.currency.clone(),
            start_date: next,
            end_date: schedule.end_date,
            frequency,
            next_run_at: Some(next),
            last_run_at: Some(expense_date),
            active: schedule.active,
            created_at: now,
        }
    });

    let (expense, schedule) = state
        .db
        .mark_schedule_paid(&schedule, expense, follow_up)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": 201,
            "expense": expense,
            "schedule": schedule
        })),
    ))
}

//=========================================================================================
// Subscriptions
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub billing_cycle: Option<String>,
    pub next_billing_date: Option<String>,
    pub last_billed_at: Option<String>,
    pub category_id: Option<Uuid>,
    pub vendor: Option<String>,
    pub payment_method: Option<String>,
    pub payment_account: Option<String>,
    pub active: Option<bool>,
    pub auto_pay: Option<bool>,
    pub cancel_at: Option<String>,
    pub notes: Option<String>,
}

pub async fn list_subscriptions_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let subscriptions = state.db.list_subscriptions(user_id).await?;
    Ok(Json(
        serde_json::json!({ "status": 200, "subscriptions": subscriptions }),
    ))
}

pub async fn create_subscription_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<SubscriptionRequest>,
) -> ApiResult<impl IntoResponse> {
    let (title, amount) = match (
        req.title.clone().filter(|t| !t.trim().is_empty()),
        req.amount,
    ) {
        (Some(t), Some(a)) => (t, a),
        _ => return Err(ApiError::bad_request("title and amount are required")),
    };

    if let Some(category_id) = req.category_id {
        state
            .db
            .find_category(user_id, category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found for current user"))?;
    }

    let subscription = state
        .db
        .create_subscription(Subscription {
            id: Uuid::new_v4(),
            user_id,
            title,
            description: req.description,
            amount,
            currency: req.currency.unwrap_or_else(|| "USD".to_string()),
            billing_cycle: req
                .billing_cycle
                .as_deref()
                .map(ExpenseFrequency::from_input)
                .unwrap_or(ExpenseFrequency::Monthly),
            next_billing_date: req
                .next_billing_date
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            last_billed_at: req
                .last_billed_at
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            category_id: req.category_id,
            vendor: req.vendor,
            payment_method: req
                .payment_method
                .as_deref()
                .map(PaymentMethod::from_input)
                .unwrap_or(PaymentMethod::Cash),
            payment_account: req.payment_account,
            active: req.active.unwrap_or(true),
            auto_pay: req.auto_pay.unwrap_or(false),
            cancel_at: req
                .cancel_at
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            notes: req.notes,
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "subscription": subscription })),
    ))
}

pub async fn update_subscription_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(subscription_id): Path<Uuid>,
    Json(req): Json<SubscriptionRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut subscription = state
        .db
        .find_subscription(user_id, subscription_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription not found"))?;

    if let Some(category_id) = req.category_id {
        state
            .db
            .find_category(user_id, category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found for current user"))?;
        subscription.category_id = Some(category_id);
    }
    if let Some(title) = req.title {
        subscription.title = title;
    }
    if let Some(description) = req.description {
        subscription.description = Some(description);
    }
    if let Some(amount) = req.amount {
        subscription.amount = amount;
    }
    if let Some(currency) = req.currency {
        subscription.currency = currency;
    }
    if let Some(cycle) = req.billing_cycle.as_deref() {
        subscription.billing_cycle = ExpenseFrequency::from_input(cycle);
    }
    if let Some(parsed) = req
        .next_billing_date
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        subscription.next_billing_date = Some(parsed);
    }
    if let Some(parsed) = req
        .last_billed_at
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        subscription.last_billed_at = Some(parsed);
    }
    if let Some(vendor) = req.vendor {
        subscription.vendor = Some(vendor);
    }
    if let Some(method) = req.payment_method.as_deref() {
        subscription.payment_method = PaymentMethod::from_input(method);
    }
    if let Some(account) = req.payment_account {
        subscription.payment_account = Some(account);
    }
    if let Some(active) = req.active {
        subscription.active = active;
    }
    if let Some(auto_pay) = req.auto_pay {
        subscription.auto_pay = auto_pay;
    }
    if let Some(parsed) = req
        .cancel_at
        .as_deref()
        .and_then(|raw| parse_reference_date(Some(raw)))
    {
        subscription.cancel_at = Some(parsed);
    }
    if let Some(notes) = req.notes {
        subscription.notes = Some(notes);
    }

    let subscription = state.db.update_subscription(subscription).await?;
    Ok(Json(serde_json::json!({ "status": 200, "subscription": subscription })))
}

pub async fn delete_subscription_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(subscription_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let subscription = state
        .db
        .find_subscription(user_id, subscription_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription not found"))?;

    state.db.delete_subscription(subscription.id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Subscription deleted" })))
}

pub async fn mark_subscription_paid_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(subscription_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let subscription = state
        .db
        .find_subscription(user_id, subscription_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription not found"))?;

    let now = state.clock.now();
    let expense_date = subscription.next_billing_date.unwrap_or(now);
    let cycle = subscription.billing_cycle;
    let next_billing = next_occurrence(expense_date, cycle);

    let expense = Expense {
        id: Uuid::new_v4(),
        user_id,
        title: subscription.title.clone(),
        description: None,
        amount: subscription.amount,
        currency: subscription.currency.clone(),
        expense_date,
        category_id: subscription.category_id,
        subcategory: None,
        tags: Vec::new(),
        payment_method: subscription.payment_method,
        payment_account: None,
        vendor: None,
        location: None,
        receipt_url: None,
        notes: Some("Subscription paid".to_string()),
        is_recurring: true,
        frequency: cycle,
        recurring_until: None,
        created_at: now,
    };

    let successor = Subscription {
        id: Uuid::new_v4(),
        next_billing_date: Some(next_billing),
        last_billed_at: Some(expense_date),
        created_at: now,
        ..subscription.clone()
    };

    let (expense, subscription) = state
        .db
        .mark_subscription_paid(&subscription, expense, successor)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": 201,
            "expense": expense,
            "subscription": subscription
        })),
    ))
}

//=========================================================================================
// Accounts
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub name: Option<String>,
    pub institution: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub currency: Option<String>,
    pub balance: Option<f64>,
    pub is_default: Option<bool>,
    pub archived: Option<bool>,
    pub notes: Option<String>,
}

pub async fn list_accounts_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let accounts = state.db.list_accounts(user_id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "accounts": accounts })))
}

pub async fn create_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<AccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Account name is required"))?;

    let account = state
        .db
        .create_account(Account {
            id: Uuid::new_v4(),
            user_id,
            name,
            institution: req.institution,
            kind: req.kind,
            currency: req.currency.unwrap_or_else(|| "PHP".to_string()),
            balance: req.balance.unwrap_or(0.0),
            is_default: req.is_default.unwrap_or(false),
            archived: false,
            notes: req.notes,
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "account": account })),
    ))
}

pub async fn update_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<AccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut account = state
        .db
        .find_account(user_id, account_id)
        .await?
        .filter(|a| !a.archived)
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    if let Some(name) = req.name {
        account.name = name;
    }
    if let Some(institution) = req.institution {
        account.institution = Some(institution);
    }
    if let Some(kind) = req.kind {
        account.kind = Some(kind);
    }
    if let Some(currency) = req.currency {
        account.currency = currency;
    }
    if let Some(balance) = req.balance {
        account.balance = balance;
    }
    if let Some(is_default) = req.is_default {
        account.is_default = is_default;
    }
    if let Some(archived) = req.archived {
        account.archived = archived;
    }
    if let Some(notes) = req.notes {
        account.notes = Some(notes);
    }

    let account = state.db.update_account(account).await?;
    Ok(Json(serde_json::json!({ "status": 200, "account": account })))
}

pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .db
        .find_account(user_id, account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    state.db.delete_account(account.id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Account deleted" })))
}

//=========================================================================================
// Currencies
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub is_default: Option<bool>,
}

pub async fn list_currencies_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let currencies = state.db.list_currencies(user_id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "currencies": currencies })))
}

pub async fn create_currency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CurrencyRequest>,
) -> ApiResult<impl IntoResponse> {
    let code = req
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Currency code is required"))?
        .to_uppercase();

    let currency = state
        .db
        .create_currency(UserCurrency {
            id: Uuid::new_v4(),
            user_id,
            code,
            name: req.name,
            symbol: req.symbol,
            is_default: req.is_default.unwrap_or(false),
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": 201, "currency": currency })),
    ))
}

pub async fn update_currency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(currency_id): Path<Uuid>,
    Json(req): Json<CurrencyRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut currency = state
        .db
        .find_currency(user_id, currency_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Currency not found"))?;

    if let Some(code) = req.code {
        currency.code = code.to_uppercase();
    }
    if let Some(name) = req.name {
        currency.name = Some(name);
    }
    if let Some(symbol) = req.symbol {
        currency.symbol = Some(symbol);
    }
    if let Some(is_default) = req.is_default {
        currency.is_default = is_default;
    }

    let currency = state.db.update_currency(currency).await?;
    Ok(Json(serde_json::json!({ "status": 200, "currency": currency })))
}

pub async fn delete_currency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(currency_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let currency = state
        .db
        .find_currency(user_id, currency_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Currency not found"))?;

    state.db.delete_currency(currency.id).await?;
    Ok(Json(serde_json::json!({ "status": 200, "message": "Currency deleted" })))
}
