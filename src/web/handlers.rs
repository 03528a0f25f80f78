use super::AppState;
use super::templates::{INDEX_HTML, results_html};
use crate::error::Result;
use crate::prediction::PatientRecord;
use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::collections::HashMap;

/// Body of every failed prediction.
pub const ERROR_MESSAGE: &str = "something is wrong";

pub async fn home() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn predict(
    State(state): State<AppState>,
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let outcome = form
        .map_err(|e| crate::error::PipelineError::Validation(e.body_text()))
        .and_then(|Form(fields)| score(&state, &fields));

    match outcome {
        Ok(prediction) => Html(results_html(prediction)).into_response(),
        Err(e) => {
            tracing::error!("Prediction failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, ERROR_MESSAGE).into_response()
        }
    }
}

fn score(state: &AppState, fields: &HashMap<String, String>) -> Result<f64> {
    let record = PatientRecord::from_form(fields)?;
    state.pipeline.predict(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;
    use crate::model::LinearModel;
    use crate::prediction::{FEATURE_ORDER, PredictionPipeline};
    use crate::web::router;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> AppState {
        let model = LinearModel::new(
            ModelKind::ElasticNet,
            "diabetes",
            FEATURE_ORDER.iter().map(|s| (*s).to_owned()).collect(),
            vec![0.0, 0.01, 0.0, 0.0, 0.0, 0.0, 0.1, 0.0],
            -0.5,
        )
        .expect("model");
        AppState::new(PredictionPipeline::new(model).expect("pipeline"))
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .expect("request")
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn test_home_serves_form() {
        for uri in ["/", "/predict"] {
            let response = router(state())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            assert!(body_text(response).await.contains("name=\"HbA1c_level\""));
        }
    }

    #[tokio::test]
    async fn test_predict_renders_result() {
        let body = "gender=1&age=50&hypertension=0&heart_disease=0&smoking_history=0\
                    &bmi=25.1&HbA1c_level=6.0&blood_glucose_level=120";
        let response = router(state()).oneshot(post(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        // 0.01 * 50 + 0.1 * 6.0 - 0.5
        assert!(body_text(response).await.contains("0.6000"));
    }

    #[tokio::test]
    async fn test_bad_field_is_generic_error() {
        let body = "gender=Female&age=50&hypertension=0&heart_disease=0&smoking_history=0\
                    &bmi=25.1&HbA1c_level=6.0&blood_glucose_level=120";
        let response = router(state()).oneshot(post(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_field_is_generic_error() {
        let response = router(state()).oneshot(post("gender=1")).await.expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, ERROR_MESSAGE);
    }
}
