//! 处方识别与健康风险评估

use std::sync::Arc;

use actix_web::{Responder, Result as ActixResult, web};
use tracing::info;

use crate::api::middleware::AuthenticatedUser;
use crate::services::{HealthData, PrescriptionService, RiskService};

use super::helpers::api_result;
use super::types::ImageBody;

/// POST /process-medication
pub async fn process_medication(
    user: web::ReqData<AuthenticatedUser>,
    body: web::Json<ImageBody>,
    prescriptions: web::Data<Arc<PrescriptionService>>,
) -> ActixResult<impl Responder> {
    info!("Processing prescription image for {}", user.0.email);
    let result = prescriptions.extract(&body.image, &user.0.email).await;
    Ok(api_result(result))
}

/// POST /predict-risk
pub async fn predict_risk(
    user: web::ReqData<AuthenticatedUser>,
    body: web::Json<HealthData>,
    risk: web::Data<Arc<RiskService>>,
) -> ActixResult<impl Responder> {
    let result = risk.predict(&body, &user.0.email).await;
    Ok(api_result(result))
}
