use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::extractors::QueryParams;
use crate::period::PeriodSpec;
use crate::ranking::PopularQuery;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(most_popular))
        .route("/ids", get(most_popular_ids))
}

#[derive(Debug, Default, Deserialize)]
struct PopularParams {
    period: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    year: Option<i32>,
    month: Option<u32>,
    week: Option<u32>,
    /// Comma separated content kinds, e.g. `post,page`.
    types: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl From<PopularParams> for PopularQuery {
    fn from(params: PopularParams) -> Self {
        let defaults = PopularQuery::default();
        let types: Vec<String> = params
            .types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|kind| kind.trim().to_ascii_lowercase())
            .filter(|kind| !kind.is_empty())
            .collect();

        PopularQuery {
            period: PeriodSpec {
                period: params.period,
                start: params.start,
                end: params.end,
                year: params.year,
                month: params.month,
                week: params.week,
            },
            types: if types.is_empty() { defaults.types } else { types },
            limit: params.limit.unwrap_or(defaults.limit),
            offset: params.offset.unwrap_or(defaults.offset),
        }
    }
}

async fn most_popular(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PopularParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let ranked = state.service().most_popular(&params.into()).await?;
    Ok(ok(ranked))
}

async fn most_popular_ids(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PopularParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let ids = state.service().most_popular_ids(&params.into()).await?;
    Ok(ok(ids))
}
