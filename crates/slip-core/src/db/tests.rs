//! Database layer tests

use chrono::NaiveDate;

use super::*;
use crate::models::{Category, ExpenseStatus, NewExpense, NewUser};

fn test_user(phone: &str) -> NewUser {
    NewUser {
        phone: phone.to_string(),
        name: "Test User".to_string(),
        email: Some("test@example.com".to_string()),
        company_id: None,
    }
}

fn test_expense(user_id: i64, date: NaiveDate, amount: f64, category: Category) -> NewExpense {
    NewExpense {
        user_id,
        image_url: None,
        merchant: "Test Mart".to_string(),
        amount,
        date,
        category,
        currency: "USD".to_string(),
        language: "en".to_string(),
        status: ExpenseStatus::Pending,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_create_and_lookup_user() {
    let db = Database::in_memory().unwrap();

    let user = db.create_user(&test_user("+15551230001")).unwrap();
    assert_eq!(user.phone, "+15551230001");
    assert_eq!(user.email.as_deref(), Some("test@example.com"));

    let by_phone = db.get_user_by_phone("+15551230001").unwrap().unwrap();
    assert_eq!(by_phone.id, user.id);

    assert!(db.get_user_by_phone("+15559999999").unwrap().is_none());
}

#[test]
fn test_duplicate_phone_rejected() {
    let db = Database::in_memory().unwrap();

    db.create_user(&test_user("+15551230002")).unwrap();
    let err = db.create_user(&test_user("+15551230002"));
    assert!(err.is_err());

    assert_eq!(db.count_users().unwrap(), 1);
}

#[test]
fn test_create_expense_and_list_order() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user(&test_user("+15551230003")).unwrap();

    db.create_expense(&test_expense(user.id, date(2025, 3, 1), 10.0, Category::Food))
        .unwrap();
    db.create_expense(&test_expense(user.id, date(2025, 3, 5), 20.0, Category::Fuel))
        .unwrap();
    db.create_expense(&test_expense(user.id, date(2025, 3, 3), 30.0, Category::Other))
        .unwrap();

    let expenses = db.list_expenses_for_user(user.id).unwrap();
    assert_eq!(expenses.len(), 3);
    // Newest date first
    assert_eq!(expenses[0].date, date(2025, 3, 5));
    assert_eq!(expenses[1].date, date(2025, 3, 3));
    assert_eq!(expenses[2].date, date(2025, 3, 1));
}

#[test]
fn test_negative_amount_rejected() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user(&test_user("+15551230004")).unwrap();

    let result = db.create_expense(&test_expense(user.id, date(2025, 3, 1), -5.0, Category::Food));
    assert!(matches!(result, Err(crate::error::Error::InvalidData(_))));
    assert_eq!(db.count_expenses().unwrap(), 0);
}

#[test]
fn test_expense_requires_existing_user() {
    let db = Database::in_memory().unwrap();

    let result = db.create_expense(&test_expense(999, date(2025, 3, 1), 5.0, Category::Food));
    assert!(result.is_err());
}

#[test]
fn test_list_expenses_since_window() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user(&test_user("+15551230005")).unwrap();

    db.create_expense(&test_expense(user.id, date(2025, 6, 15), 10.0, Category::Food))
        .unwrap();
    db.create_expense(&test_expense(user.id, date(2025, 6, 5), 20.0, Category::Fuel))
        .unwrap();
    db.create_expense(&test_expense(user.id, date(2025, 5, 6), 30.0, Category::Travel))
        .unwrap();

    let recent = db.list_expenses_since(user.id, date(2025, 6, 8)).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].date, date(2025, 6, 15));

    let month = db.list_expenses_since(user.id, date(2025, 6, 1)).unwrap();
    assert_eq!(month.len(), 2);

    let ytd = db.list_expenses_since(user.id, date(2025, 1, 1)).unwrap();
    assert_eq!(ytd.len(), 3);
}

#[test]
fn test_expenses_scoped_to_user() {
    let db = Database::in_memory().unwrap();
    let alice = db.create_user(&test_user("+15551230006")).unwrap();
    let bob = db.create_user(&test_user("+15551230007")).unwrap();

    db.create_expense(&test_expense(alice.id, date(2025, 6, 1), 10.0, Category::Food))
        .unwrap();
    db.create_expense(&test_expense(bob.id, date(2025, 6, 2), 20.0, Category::Fuel))
        .unwrap();

    let alices = db.list_expenses_for_user(alice.id).unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].user_id, alice.id);
}

#[test]
fn test_category_round_trips_through_db() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user(&test_user("+15551230008")).unwrap();

    let created = db
        .create_expense(&test_expense(user.id, date(2025, 6, 1), 42.5, Category::Groceries))
        .unwrap();
    assert_eq!(created.category, Some(Category::Groceries));
    assert_eq!(created.status, ExpenseStatus::Pending);
    assert_eq!(created.amount, 42.5);
}

#[test]
fn test_ping() {
    let db = Database::in_memory().unwrap();
    db.ping().unwrap();
}
