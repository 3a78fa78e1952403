pub mod ai;
pub mod formulary;
pub mod image;
pub mod medication_service;
pub mod notifier;
pub mod prescription;
pub mod reminder_feed;
pub mod reminder_service;
pub mod reminder_worker;
pub mod risk;
pub mod user_service;

pub use formulary::{Formulary, FormularyEntry};
pub use medication_service::{CreateMedicationRequest, MedicationService, TestReminder};
pub use notifier::Notifiers;
pub use prescription::{ExtractedMedication, PrescriptionService};
pub use reminder_feed::{ReminderEvent, ReminderFeed};
pub use reminder_service::ReminderService;
pub use reminder_worker::ReminderWorker;
pub use risk::{HealthData, RiskPrediction, RiskService};
pub use user_service::{SignupRequest, UserService};
