use axum::extract::{Query, State};
use std::sync::Arc;

use crate::models::ask::ExpressionQuery;
use crate::services::{MathOperation, MathService};
use crate::utils::error::ApiError;

pub async fn derive_handler(
    State(math): State<Arc<MathService>>,
    Query(query): Query<ExpressionQuery>,
) -> Result<String, ApiError> {
    evaluate(&math, MathOperation::Derive, query).await
}

pub async fn integrate_handler(
    State(math): State<Arc<MathService>>,
    Query(query): Query<ExpressionQuery>,
) -> Result<String, ApiError> {
    evaluate(&math, MathOperation::Integrate, query).await
}

pub async fn simplify_handler(
    State(math): State<Arc<MathService>>,
    Query(query): Query<ExpressionQuery>,
) -> Result<String, ApiError> {
    evaluate(&math, MathOperation::Simplify, query).await
}

async fn evaluate(
    math: &MathService,
    operation: MathOperation,
    query: ExpressionQuery,
) -> Result<String, ApiError> {
    let expr = query
        .expr
        .filter(|expr| !expr.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing expr".to_string()))?;

    Ok(math.evaluate(operation, &expr).await)
}
