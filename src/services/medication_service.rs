//! Medication management service
//!
//! 创建药品时按每个 `HH:MM` 在当天（UTC）生成一条 PENDING 提醒。

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use tracing::info;

use crate::errors::{MediRemindError, Result};
pub use crate::storage::models::DEFAULT_INSTRUCTIONS;
use crate::storage::{
    Medication, MedicationPriority, NewMedication, Reminder, SeaOrmStorage,
};
use crate::utils::validation::{check_length, parse_date, parse_reminder_time};

pub const MAX_REMINDER_TIMES: usize = 10;
/// test-trigger 允许的偏移范围（分钟）
const TEST_TRIGGER_MIN_MINUTES: f64 = -24.0 * 60.0;
const TEST_TRIGGER_MAX_MINUTES: f64 = 7.0 * 24.0 * 60.0;

/// Request to create a medication with its daily reminder times
#[derive(Debug, Clone)]
pub struct CreateMedicationRequest {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    /// None 时使用 "Take as directed"
    pub instructions: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub start_date: String,
    pub end_date: Option<String>,
    pub priority: Option<MedicationPriority>,
    /// `HH:MM` (24-hour)
    pub reminders: Vec<String>,
}

/// Result of the test-trigger helper
#[derive(Debug, Clone)]
pub struct TestReminder {
    pub medication: Medication,
    pub reminder: Reminder,
    pub message: String,
}

pub struct MedicationService {
    storage: Arc<SeaOrmStorage>,
}

impl MedicationService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn create(
        &self,
        user_id: i32,
        req: CreateMedicationRequest,
    ) -> Result<(Medication, Vec<Reminder>)> {
        let new = validate_new_medication(user_id, &req)?;
        let times = reminder_times_for_today(&req.reminders, Utc::now())?;

        let (medication, reminders) = self
            .storage
            .create_medication_with_reminders(&new, &times)
            .await?;

        info!(
            "Created medication '{}' ({} reminders) for user {}",
            medication.name,
            reminders.len(),
            user_id
        );
        Ok((medication, reminders))
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<Medication>> {
        self.storage.list_medications(user_id).await
    }

    /// 只返回属于该用户的药品，其他用户的视为不存在
    pub async fn get_owned(&self, user_id: i32, id: i32) -> Result<Medication> {
        match self.storage.get_medication(id).await? {
            Some(med) if med.user_id == user_id => Ok(med),
            _ => Err(MediRemindError::not_found("Medication not found")),
        }
    }

    pub async fn delete(&self, user_id: i32, id: i32) -> Result<()> {
        let med = self.get_owned(user_id, id).await?;
        if !self.storage.delete_medication(med.id).await? {
            return Err(MediRemindError::not_found("Medication not found"));
        }
        info!("Deleted medication {} for user {}", id, user_id);
        Ok(())
    }

    /// 创建一条示例药品和一条 `now + minutes` 的提醒，用于测试通知链路
    pub async fn create_test_reminder(
        &self,
        user_id: i32,
        minutes: f64,
        high_risk: bool,
    ) -> Result<TestReminder> {
        if !minutes.is_finite()
            || !(TEST_TRIGGER_MIN_MINUTES..=TEST_TRIGGER_MAX_MINUTES).contains(&minutes)
        {
            return Err(MediRemindError::validation(format!(
                "minutes must be between {} and {}",
                TEST_TRIGGER_MIN_MINUTES, TEST_TRIGGER_MAX_MINUTES
            )));
        }

        let now = Utc::now();
        let due = now + Duration::milliseconds((minutes * 60_000.0) as i64);
        let due = due.with_nanosecond(0).unwrap_or(due);

        let new = sample_medication(user_id, high_risk, now);
        let (medication, mut reminders) = self
            .storage
            .create_medication_with_reminders(&new, &[due])
            .await?;
        let reminder = reminders
            .pop()
            .ok_or_else(|| MediRemindError::database_operation("Test reminder was not created"))?;

        let message = format!(
            "Created {} test reminder for {} UTC",
            if high_risk { "HIGH-RISK" } else { "normal" },
            due.format("%Y-%m-%d %H:%M:%S")
        );
        info!("Test reminder for user {}: {}", user_id, medication.name);

        Ok(TestReminder {
            medication,
            reminder,
            message,
        })
    }
}

fn validate_new_medication(user_id: i32, req: &CreateMedicationRequest) -> Result<NewMedication> {
    check_length("name", &req.name, 1, 200)?;
    check_length("dosage", &req.dosage, 1, 100)?;
    check_length("frequency", &req.frequency, 1, 100)?;

    let instructions = req
        .instructions
        .clone()
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
    check_length("instructions", &instructions, 0, 500)?;

    let start_date = parse_date("start_date", &req.start_date)?;
    let end_date = match req.end_date.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Some(parse_date("end_date", value)?),
        _ => None,
    };
    if let Some(end) = end_date
        && end < start_date
    {
        return Err(MediRemindError::validation(
            "end_date must not be before start_date",
        ));
    }

    Ok(NewMedication {
        user_id,
        name: req.name.trim().to_string(),
        dosage: req.dosage.trim().to_string(),
        frequency: req.frequency.trim().to_string(),
        instructions,
        start_date,
        end_date,
        priority: req.priority.unwrap_or_default(),
    })
}

/// 把 `HH:MM` 列表转换为 `today` 当天的 UTC 时间，重复的时间只保留一个
pub fn reminder_times_for_today(
    reminders: &[String],
    today: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    if reminders.is_empty() || reminders.len() > MAX_REMINDER_TIMES {
        return Err(MediRemindError::validation(format!(
            "reminders must contain between 1 and {} times",
            MAX_REMINDER_TIMES
        )));
    }

    let date = today.date_naive();
    let mut times: Vec<NaiveTime> = reminders
        .iter()
        .map(|t| parse_reminder_time(t))
        .collect::<Result<_>>()?;
    times.sort();
    times.dedup();

    Ok(times
        .into_iter()
        .map(|t| date.and_time(t).and_utc())
        .collect())
}

fn sample_medication(user_id: i32, high_risk: bool, now: DateTime<Utc>) -> NewMedication {
    let start_date = now.with_nanosecond(0).unwrap_or(now);
    if high_risk {
        NewMedication {
            user_id,
            name: "Warfarin".into(),
            dosage: "5mg".into(),
            frequency: "Once daily".into(),
            instructions: "Take at the same time each day. Do not skip doses.".into(),
            start_date,
            end_date: None,
            priority: MedicationPriority::High,
        }
    } else {
        NewMedication {
            user_id,
            name: "Vitamin D".into(),
            dosage: "1000 IU".into(),
            frequency: "Once daily".into(),
            instructions: "Take with food.".into(),
            start_date,
            end_date: None,
            priority: MedicationPriority::Normal,
        }
    }
}
