//! Shared fixtures for integration tests
//!
//! Each test gets its own temporary SQLite database; notification channels
//! and the generative model are replaced by recording mocks.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use mediremind::api::AppServices;
use mediremind::config::DatabaseConfig;
use mediremind::errors::{MediRemindError, Result};
use mediremind::services::Formulary;
use mediremind::services::FormularyEntry;
use mediremind::services::Notifiers;
use mediremind::services::ai::{GenerationRequest, GenerativeModel};
use mediremind::services::notifier::{EmailSender, PushMessage, PushOutcome, PushSender};
use mediremind::storage::{PushSubscription, SeaOrmStorage};

pub struct TestDb {
    // 保持临时目录存活
    _dir: TempDir,
    pub storage: Arc<SeaOrmStorage>,
}

pub async fn test_db() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("mediremind_test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}", db_path.display()),
        ..Default::default()
    };
    let storage = SeaOrmStorage::new(&config)
        .await
        .expect("Failed to create storage");
    TestDb {
        _dir: dir,
        storage: Arc::new(storage),
    }
}

/// 返回固定文本的模型
pub struct MockModel {
    pub response: std::result::Result<String, MediRemindError>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl MockModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: MediRemindError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(err),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    fn name(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.response.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingEmail {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        Ok(())
    }
}

/// 记录推送；`expired_endpoints` 中的订阅返回 410
#[derive(Default)]
pub struct RecordingPush {
    pub public_key: Option<String>,
    pub expired_endpoints: Vec<String>,
    pub sent: Mutex<Vec<(String, PushMessage)>>,
}

#[async_trait]
impl PushSender for RecordingPush {
    fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    async fn send(
        &self,
        subscription: &PushSubscription,
        message: &PushMessage,
    ) -> Result<PushOutcome> {
        if self.expired_endpoints.contains(&subscription.endpoint) {
            return Err(MediRemindError::push_subscription_expired(
                "Push subscription has expired or is no longer valid",
            ));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), message.clone()));
        Ok(PushOutcome::Delivered)
    }
}

pub fn notifiers(email: Arc<RecordingEmail>, push: Arc<RecordingPush>) -> Notifiers {
    Notifiers { email, push }
}

pub fn sample_formulary() -> Arc<Formulary> {
    let entries = vec![
        FormularyEntry {
            drug_name: "Amlodipine".into(),
            category: "Cardiovascular".into(),
            schedule: "H".into(),
            indication: "Hypertension, chest pain".into(),
            dosage_form: "Tablet 5 mg".into(),
        },
        FormularyEntry {
            drug_name: "Paracetamol".into(),
            category: "Analgesic".into(),
            schedule: "".into(),
            indication: "Fever, headache".into(),
            dosage_form: "Tablet 500 mg".into(),
        },
    ];
    Arc::new(Formulary::from_entries(&entries))
}

pub fn app_services(
    storage: Arc<SeaOrmStorage>,
    notifiers: Notifiers,
    model: Option<Arc<dyn GenerativeModel>>,
) -> AppServices {
    AppServices::new(storage, notifiers, model, sample_formulary(), 3)
}
