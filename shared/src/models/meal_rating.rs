//! Meal Rating Model (餐评)
//!
//! 每个 (user, menu) 只有一条评分；重复提交即原地更新。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Meal rating entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MealRating {
    pub id: i64,
    pub user_id: i64,
    pub menu_id: i64,
    pub rating: i32,
    pub taste: Option<i32>,
    pub quality: Option<i32>,
    pub quantity: Option<i32>,
    pub feedback: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub improvements: Vec<String>,
    pub would_recommend: Option<bool>,
    pub is_anonymous: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Submit rating payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealRatingInput {
    pub menu_id: i64,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(range(min = 1, max = 5))]
    pub taste: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub quality: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub quantity: Option<i32>,
    #[validate(length(max = 1000))]
    pub feedback: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub improvements: Vec<String>,
    pub would_recommend: Option<bool>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl MealRating {
    pub fn new(id: i64, user_id: i64, input: MealRatingInput, now: i64) -> Self {
        let mut rating = Self {
            id,
            user_id,
            menu_id: input.menu_id,
            rating: input.rating,
            taste: input.taste,
            quality: input.quality,
            quantity: input.quantity,
            feedback: input.feedback,
            improvements: input.improvements,
            would_recommend: input.would_recommend,
            is_anonymous: input.is_anonymous,
            created_at: now,
            updated_at: now,
        };
        rating.normalize();
        rating
    }

    /// With all three sub-scores present the overall rating is their rounded mean
    pub fn normalize(&mut self) {
        if let (Some(t), Some(q), Some(n)) = (self.taste, self.quality, self.quantity) {
            self.rating = (f64::from(t + q + n) / 3.0).round() as i32;
        }
    }
}

/// Rating as shown in a menu's rating list (anonymous entries hide the author)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRatingView {
    pub id: i64,
    pub user_id: Option<i64>,
    pub menu_id: i64,
    pub rating: i32,
    pub taste: Option<i32>,
    pub quality: Option<i32>,
    pub quantity: Option<i32>,
    pub feedback: Option<String>,
    pub improvements: Vec<String>,
    pub would_recommend: Option<bool>,
    pub is_anonymous: bool,
    pub created_at: i64,
}

impl From<MealRating> for MealRatingView {
    fn from(r: MealRating) -> Self {
        Self {
            id: r.id,
            user_id: (!r.is_anonymous).then_some(r.user_id),
            menu_id: r.menu_id,
            rating: r.rating,
            taste: r.taste,
            quality: r.quality,
            quantity: r.quantity,
            feedback: r.feedback,
            improvements: r.improvements,
            would_recommend: r.would_recommend,
            is_anonymous: r.is_anonymous,
            created_at: r.created_at,
        }
    }
}

/// Per-menu aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealRatingStats {
    pub menu_id: Option<i64>,
    pub total_ratings: i64,
    pub average_rating: f64,
    pub average_taste: Option<f64>,
    pub average_quality: Option<f64>,
    pub average_quantity: Option<f64>,
    /// Share of answers to would_recommend that were yes (0–100)
    pub would_recommend_percentage: Option<f64>,
    /// "1".."5" → count, every bucket present
    pub distribution: BTreeMap<String, i64>,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn mean(values: impl Iterator<Item = i32>) -> Option<f64> {
    let (sum, count) = values.fold((0_i64, 0_i64), |(s, c), v| (s + i64::from(v), c + 1));
    (count > 0).then(|| round1(sum as f64 / count as f64))
}

impl MealRatingStats {
    pub fn zeroed(menu_id: Option<i64>) -> Self {
        Self {
            menu_id,
            distribution: (1..=5).map(|n: i32| (n.to_string(), 0)).collect(),
            ..Default::default()
        }
    }

    pub fn from_ratings(menu_id: Option<i64>, ratings: &[MealRating]) -> Self {
        let mut stats = Self::zeroed(menu_id);
        if ratings.is_empty() {
            return stats;
        }

        stats.total_ratings = ratings.len() as i64;
        stats.average_rating = mean(ratings.iter().map(|r| r.rating)).unwrap_or_default();
        stats.average_taste = mean(ratings.iter().filter_map(|r| r.taste));
        stats.average_quality = mean(ratings.iter().filter_map(|r| r.quality));
        stats.average_quantity = mean(ratings.iter().filter_map(|r| r.quantity));

        let answers: Vec<bool> = ratings.iter().filter_map(|r| r.would_recommend).collect();
        if !answers.is_empty() {
            let yes = answers.iter().filter(|a| **a).count();
            stats.would_recommend_percentage =
                Some(round1(yes as f64 * 100.0 / answers.len() as f64));
        }

        for r in ratings {
            if let Some(bucket) = stats.distribution.get_mut(&r.rating.to_string()) {
                *bucket += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(rating: i32, subs: Option<(i32, i32, i32)>) -> MealRatingInput {
        MealRatingInput {
            menu_id: 7,
            rating,
            taste: subs.map(|s| s.0),
            quality: subs.map(|s| s.1),
            quantity: subs.map(|s| s.2),
            feedback: None,
            improvements: vec![],
            would_recommend: None,
            is_anonymous: false,
        }
    }

    #[test]
    fn test_sub_scores_override_rating() {
        let r = MealRating::new(1, 10, input(1, Some((5, 4, 4))), 0);
        // 13 / 3 = 4.33 → 4
        assert_eq!(r.rating, 4);

        let r = MealRating::new(2, 10, input(1, Some((5, 5, 4))), 0);
        // 14 / 3 = 4.67 → 5
        assert_eq!(r.rating, 5);
    }

    #[test]
    fn test_partial_sub_scores_keep_rating() {
        let mut i = input(2, Some((5, 5, 5)));
        i.quantity = None;
        let r = MealRating::new(1, 10, i, 0);
        assert_eq!(r.rating, 2);
    }

    #[test]
    fn test_rounding_law_holds_for_all_sub_scores() {
        for t in 1..=5 {
            for q in 1..=5 {
                for n in 1..=5 {
                    let r = MealRating::new(1, 1, input(3, Some((t, q, n))), 0);
                    let expected = (f64::from(t + q + n) / 3.0).round() as i32;
                    assert_eq!(r.rating, expected);
                    assert!((1..=5).contains(&r.rating));
                }
            }
        }
    }

    #[test]
    fn test_stats_distribution_defaults_to_zero() {
        let stats = MealRatingStats::from_ratings(Some(7), &[]);
        assert_eq!(stats.total_ratings, 0);
        assert_eq!(stats.distribution.len(), 5);
        assert!(stats.distribution.values().all(|v| *v == 0));
    }

    #[test]
    fn test_stats() {
        let mut a = MealRating::new(1, 10, input(5, None), 0);
        a.would_recommend = Some(true);
        let mut b = MealRating::new(2, 11, input(3, Some((3, 3, 3))), 0);
        b.would_recommend = Some(false);
        let c = MealRating::new(3, 12, input(4, None), 0);

        let stats = MealRatingStats::from_ratings(Some(7), &[a, b, c]);
        assert_eq!(stats.total_ratings, 3);
        assert_eq!(stats.average_rating, 4.0);
        assert_eq!(stats.average_taste, Some(3.0));
        assert_eq!(stats.would_recommend_percentage, Some(50.0));
        assert_eq!(stats.distribution["5"], 1);
        assert_eq!(stats.distribution["4"], 1);
        assert_eq!(stats.distribution["3"], 1);
        assert_eq!(stats.distribution["1"], 0);
    }

    #[test]
    fn test_anonymous_view_hides_author() {
        let mut r = MealRating::new(1, 10, input(4, None), 0);
        r.is_anonymous = true;
        assert_eq!(MealRatingView::from(r).user_id, None);
        let r = MealRating::new(2, 10, input(4, None), 0);
        assert_eq!(MealRatingView::from(r).user_id, Some(10));
    }
}
