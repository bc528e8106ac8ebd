//! Expense API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use slip_core::models::{Category, Expense, ExpenseStatus, NewExpense, DEFAULT_CURRENCY};

use crate::{AppError, AppState};

/// Request body for creating an expense directly (bypassing the chat flow)
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    /// Owner's phone number; must belong to a registered user
    pub phone: String,
    pub image_url: Option<String>,
    pub merchant: String,
    pub amount: f64,
    /// YYYY-MM-DD
    pub date: String,
    pub category: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
    pub status: Option<String>,
}

/// POST /api/expenses - Create an expense for a registered user
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let user = state
        .db()
        .get_user_by_phone(&req.phone)?
        .ok_or_else(|| AppError::not_found("No user registered with that phone number"))?;

    let date = NaiveDate::parse_from_str(&req.date, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("Invalid date format (use YYYY-MM-DD)"))?;

    if req.amount < 0.0 {
        return Err(AppError::bad_request("Amount must be non-negative"));
    }

    let expense = state.db().create_expense(&NewExpense {
        user_id: user.id,
        image_url: req.image_url,
        merchant: req.merchant,
        amount: req.amount,
        date,
        category: req
            .category
            .as_deref()
            .map(Category::parse_lenient)
            .unwrap_or_default(),
        currency: req
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        language: req.language.unwrap_or_else(|| "en".to_string()),
        status: req
            .status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(ExpenseStatus::Pending),
    })?;

    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /api/expenses/:phone - List a user's expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let user = state
        .db()
        .get_user_by_phone(&phone)?
        .ok_or_else(|| AppError::not_found("No user registered with that phone number"))?;

    let expenses = state.db().list_expenses_for_user(user.id)?;
    Ok(Json(expenses))
}
