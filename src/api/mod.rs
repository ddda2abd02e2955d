use axum::{
    Form, Router,
    extract::{FromRequest, Query, Request, State},
    http::header::CONTENT_TYPE,
    response::{Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::{
    Result, VERSION, WeatherError,
    history::RecordFilter,
    models::{CityStats, Forecast, HistoryRecord, SearchEntry},
    state::AppState,
};

pub mod identity;

pub use identity::RequestIdentity;

/// Shown when a search produced no forecast
pub const FORECAST_UNAVAILABLE: &str = "Прогноз недоступен. Попробуйте другой город.";

/// Everything the weather page renders
#[derive(Debug, Serialize, Deserialize)]
pub struct WeatherPage {
    pub forecast: Forecast,
    pub last_city: Option<String>,
    pub history: Vec<SearchEntry>,
    pub message: Option<String>,
}

/// `period_days` as submitted; forms send text, JSON may send a number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PeriodInput {
    Int(i64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    pub city: Option<String>,
    pub period_days: Option<PeriodInput>,
}

impl<S: Send + Sync> FromRequest<S> for SearchForm {
    type Rejection = WeatherError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(form) = Json::<SearchForm>::from_request(req, state)
                .await
                .map_err(|e| WeatherError::validation(e.body_text()))?;
            Ok(form)
        } else {
            let Form(form) = Form::<SearchForm>::from_request(req, state)
                .await
                .map_err(|e| WeatherError::validation(e.body_text()))?;
            Ok(form)
        }
    }
}

/// Validated search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub city: String,
    pub period_days: u32,
}

impl SearchForm {
    pub fn validate(&self) -> Result<SearchRequest> {
        let city = self.city.as_deref().map(str::trim).unwrap_or_default();
        if city.is_empty() {
            return Err(WeatherError::validation("city must not be empty"));
        }
        Ok(SearchRequest {
            city: city.to_string(),
            period_days: parse_period(self.period_days.as_ref())?,
        })
    }
}

/// Missing means one day; anything else must be a positive integer.
///
/// Large values are fine, the forecast is cut to the dates the provider has.
pub fn parse_period(input: Option<&PeriodInput>) -> Result<u32> {
    let value = match input {
        None => return Ok(1),
        Some(PeriodInput::Int(value)) => *value,
        Some(PeriodInput::Text(text)) => text.trim().parse::<i64>().map_err(|_| {
            WeatherError::validation(format!("period_days must be an integer, got '{text}'"))
        })?,
    };

    if value < 1 {
        return Err(WeatherError::validation("period_days must be at least 1"));
    }
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/weather", get(show_weather).post(search_weather))
        .route("/stats", get(get_stats))
        .route("/admin/history", get(get_admin_history))
        .route("/health", get(health))
}

async fn show_weather(
    State(state): State<AppState>,
    caller: RequestIdentity,
) -> Result<Response> {
    let history = state.history.backend_for(&caller.identity);
    let page = WeatherPage {
        forecast: Forecast::new(),
        last_city: history.last_city().await?,
        history: history.recent(state.config.defaults.history_limit).await?,
        message: None,
    };
    Ok(caller.respond(Json(page)))
}

#[instrument(skip_all)]
async fn search_weather(
    State(state): State<AppState>,
    caller: RequestIdentity,
    form: SearchForm,
) -> Result<Response> {
    let search = form.validate()?;
    let history = state.history.backend_for(&caller.identity);

    // read before this search is recorded
    let last_city = history.last_city().await?;

    let forecast = state
        .forecasts
        .summarize(&search.city, search.period_days)
        .await;

    let message = if forecast.is_empty() {
        Some(FORECAST_UNAVAILABLE.to_string())
    } else {
        history.record(&search.city, search.period_days).await?;
        info!(
            "Recorded search '{}' for {} day(s)",
            search.city, search.period_days
        );
        None
    };

    let page = WeatherPage {
        forecast,
        last_city,
        history: history.recent(state.config.defaults.history_limit).await?,
        message,
    };
    Ok(caller.respond(Json(page)))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<Vec<CityStats>>> {
    Ok(Json(state.history.store().city_stats().await?))
}

async fn get_admin_history(
    State(state): State<AppState>,
    caller: RequestIdentity,
    Query(filter): Query<RecordFilter>,
) -> Result<Json<Vec<HistoryRecord>>> {
    let is_admin = caller
        .user_id()
        .is_some_and(|id| state.config.server.admin_users.iter().any(|admin| admin == id));
    if !is_admin {
        return Err(WeatherError::forbidden("admin access required"));
    }
    Ok(Json(state.history.store().list_records(&filter).await?))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, 1)]
    #[case(Some(PeriodInput::Int(3)), 3)]
    #[case(Some(PeriodInput::Text("5".into())), 5)]
    #[case(Some(PeriodInput::Text(" 2 ".into())), 2)]
    #[case(Some(PeriodInput::Int(6)), 6)]
    #[case(Some(PeriodInput::Text("30".into())), 30)]
    #[case(Some(PeriodInput::Int(i64::MAX)), u32::MAX)]
    fn test_parse_period_accepts(#[case] input: Option<PeriodInput>, #[case] expected: u32) {
        assert_eq!(parse_period(input.as_ref()).unwrap(), expected);
    }

    #[rstest]
    #[case(PeriodInput::Int(0))]
    #[case(PeriodInput::Int(-2))]
    #[case(PeriodInput::Text("abc".into()))]
    #[case(PeriodInput::Text("".into()))]
    #[case(PeriodInput::Text("2.5".into()))]
    fn test_parse_period_rejects(#[case] input: PeriodInput) {
        let err = parse_period(Some(&input)).unwrap_err();
        assert!(matches!(err, WeatherError::Validation { .. }));
    }

    #[test]
    fn test_city_is_trimmed_and_required() {
        let form = SearchForm {
            city: Some("  London ".into()),
            period_days: None,
        };
        assert_eq!(
            form.validate().unwrap(),
            SearchRequest {
                city: "London".into(),
                period_days: 1
            }
        );

        let blank = SearchForm {
            city: Some("   ".into()),
            period_days: None,
        };
        assert!(blank.validate().is_err());
        assert!(SearchForm::default().validate().is_err());
    }

    #[test]
    fn test_period_from_json_number_or_string() {
        let form: SearchForm =
            serde_json::from_str(r#"{"city": "Paris", "period_days": 2}"#).unwrap();
        assert!(matches!(form.period_days, Some(PeriodInput::Int(2))));

        let form: SearchForm =
            serde_json::from_str(r#"{"city": "Paris", "period_days": "2"}"#).unwrap();
        assert_eq!(form.validate().unwrap().period_days, 2);
    }
}
