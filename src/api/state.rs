//! 处理器共享的应用数据

use std::sync::Arc;

use actix_web::web;
use tracing::info;

use crate::config::AppConfig;
use crate::services::ai::{GenerativeModel, build_model};
use crate::services::{
    Formulary, MedicationService, Notifiers, PrescriptionService, ReminderFeed, ReminderService,
    RiskService, UserService,
};
use crate::storage::SeaOrmStorage;

use super::services::AppStartTime;

/// 所有处理器依赖的服务，HttpServer 每个 worker 克隆一份
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub users: Arc<UserService>,
    pub medications: Arc<MedicationService>,
    pub reminders: Arc<ReminderService>,
    pub prescriptions: Arc<PrescriptionService>,
    pub risk: Arc<RiskService>,
    pub feed: ReminderFeed,
    pub notifiers: Notifiers,
    pub started: AppStartTime,
}

impl AppServices {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        notifiers: Notifiers,
        model: Option<Arc<dyn GenerativeModel>>,
        formulary: Arc<Formulary>,
        top_k: usize,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(storage.clone())),
            medications: Arc::new(MedicationService::new(storage.clone())),
            reminders: Arc::new(ReminderService::new(storage.clone())),
            prescriptions: Arc::new(PrescriptionService::new(model.clone())),
            risk: Arc::new(RiskService::new(model, formulary, top_k)),
            feed: ReminderFeed::new(storage.clone()),
            notifiers,
            started: AppStartTime::now(),
            storage,
        }
    }

    pub fn from_config(storage: Arc<SeaOrmStorage>, config: &AppConfig) -> Self {
        let formulary = Formulary::load_or_empty(&config.formulary.csv_path);
        info!("NLEM formulary entries loaded: {}", formulary.len());

        Self::new(
            storage,
            Notifiers::from_config(config),
            build_model(&config.ai),
            Arc::new(formulary),
            config.formulary.top_k,
        )
    }

    /// 注册到 `App::configure`
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.storage.clone()))
            .app_data(web::Data::new(self.users.clone()))
            .app_data(web::Data::new(self.medications.clone()))
            .app_data(web::Data::new(self.reminders.clone()))
            .app_data(web::Data::new(self.prescriptions.clone()))
            .app_data(web::Data::new(self.risk.clone()))
            .app_data(web::Data::new(self.feed.clone()))
            .app_data(web::Data::new(self.notifiers.clone()))
            .app_data(web::Data::new(self.started.clone()));
    }
}
