use crate::ApiResponse;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

pub const RANDOM_MIN: u32 = 1;
pub const RANDOM_MAX: u32 = 28;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRandomBody {
    pub current_date: String,
    pub random_num: u32,
}

/// Today's UTC date plus a number drawn uniformly from `RANDOM_MIN..=RANDOM_MAX`.
pub fn handle<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Result<ApiResponse> {
    let body = DateRandomBody {
        current_date: now.format("%Y-%m-%d").to_string(),
        random_num: rng.gen_range(RANDOM_MIN..=RANDOM_MAX),
    };
    ApiResponse::json(200, &body)
}
