//! Dining Menu Model (食堂每日餐单)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::common::{parse_clock, validate_clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum MealType {
    Breakfast,
    Lunch,
    Snacks,
    Dinner,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Snacks => "snacks",
            Self::Dinner => "dinner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Dish {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_veg: bool,
}

fn default_true() -> bool {
    true
}

/// One meal on one date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiningMenu {
    pub id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub items: Vec<Dish>,
    /// HH:MM
    pub start_time: String,
    /// HH:MM
    pub end_time: String,
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiningMenuCreate {
    pub date: NaiveDate,
    pub meal_type: MealType,
    #[validate(length(min = 1, max = 50), nested)]
    pub items: Vec<Dish>,
    #[validate(custom(function = "validate_clock"))]
    pub start_time: String,
    #[validate(custom(function = "validate_clock"))]
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DiningMenuUpdate {
    #[validate(length(min = 1, max = 50))]
    pub items: Option<Vec<Dish>>,
    #[validate(custom(function = "validate_clock"))]
    pub start_time: Option<String>,
    #[validate(custom(function = "validate_clock"))]
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
}

/// `?date=YYYY-MM-DD&meal_type=lunch`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiningMenuQuery {
    pub date: Option<NaiveDate>,
    pub meal_type: Option<MealType>,
}

fn check_window(start: &str, end: &str) -> AppResult<()> {
    match (parse_clock(start), parse_clock(end)) {
        (Some(s), Some(e)) if e > s => Ok(()),
        (Some(_), Some(_)) => Err(AppError::validation("end_time must be after start_time")
            .with_detail("field", "end_time")),
        _ => Err(AppError::validation("serving times must be HH:MM")),
    }
}

impl DiningMenu {
    pub fn new(id: i64, input: DiningMenuCreate, created_by: i64, now: i64) -> AppResult<Self> {
        check_window(&input.start_time, &input.end_time)?;
        Ok(Self {
            id,
            date: input.date,
            meal_type: input.meal_type,
            items: input.items,
            start_time: input.start_time,
            end_time: input.end_time,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: DiningMenuUpdate, now: i64) -> AppResult<()> {
        let start = update.start_time.unwrap_or_else(|| self.start_time.clone());
        let end = update.end_time.unwrap_or_else(|| self.end_time.clone());
        check_window(&start, &end)?;
        self.start_time = start;
        self.end_time = end;
        if let Some(items) = update.items {
            for dish in &items {
                dish.validate()
                    .map_err(|e| AppError::validation(e.to_string()))?;
            }
            self.items = items;
        }
        if let Some(v) = update.is_active {
            self.is_active = v;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create() -> DiningMenuCreate {
        DiningMenuCreate {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            meal_type: MealType::Lunch,
            items: vec![Dish {
                name: "Rajma chawal".into(),
                description: None,
                is_veg: true,
            }],
            start_time: "12:30".into(),
            end_time: "14:30".into(),
        }
    }

    #[test]
    fn test_new_menu() {
        let menu = DiningMenu::new(1, create(), 9, 100).unwrap();
        assert!(menu.is_active);
        assert_eq!(menu.meal_type, MealType::Lunch);
        assert_eq!(menu.items.len(), 1);
    }

    #[test]
    fn test_serving_window_must_be_ordered() {
        let mut input = create();
        input.end_time = "12:00".into();
        assert!(DiningMenu::new(1, input, 9, 100).is_err());
    }

    #[test]
    fn test_create_validation() {
        let mut input = create();
        input.items.clear();
        input.start_time = "noon".into();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("start_time"));
    }

    #[test]
    fn test_update_keeps_window_valid() {
        let mut menu = DiningMenu::new(1, create(), 9, 100).unwrap();
        let err = menu
            .apply_update(
                DiningMenuUpdate {
                    start_time: Some("15:00".into()),
                    ..Default::default()
                },
                200,
            )
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationFailed);
        assert_eq!(menu.start_time, "12:30");

        menu.apply_update(
            DiningMenuUpdate {
                end_time: Some("15:00".into()),
                is_active: Some(false),
                ..Default::default()
            },
            300,
        )
        .unwrap();
        assert_eq!(menu.end_time, "15:00");
        assert!(!menu.is_active);
    }
}
