use std::str::FromStr;

use tracing::warn;

use crate::storage::models::{
    Medication, MedicationPriority, NewMedication, PushSubscription, Reminder, ReminderStatus, User,
};
use migration::entities::{medication, push_subscription, reminder, user};

pub fn model_to_user(model: user::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        hashed_password: model.hashed_password,
        is_active: model.is_active,
        full_name: model.full_name,
        phone_number: model.phone_number,
        email_notifications: model.email_notifications,
        created_at: model.created_at,
    }
}

pub fn model_to_medication(model: medication::Model) -> Medication {
    let priority = MedicationPriority::from_str(&model.priority).unwrap_or_else(|_| {
        warn!(
            "Medication {} has unknown priority '{}', treating as NORMAL",
            model.id, model.priority
        );
        MedicationPriority::Normal
    });

    Medication {
        id: model.id,
        user_id: model.user_id,
        name: model.name,
        dosage: model.dosage,
        frequency: model.frequency,
        instructions: model.instructions,
        start_date: model.start_date,
        end_date: model.end_date,
        priority,
    }
}

pub fn model_to_reminder(model: reminder::Model) -> Reminder {
    let status = ReminderStatus::from_str(&model.status).unwrap_or_else(|_| {
        warn!(
            "Reminder {} has unknown status '{}', treating as PENDING",
            model.id, model.status
        );
        ReminderStatus::Pending
    });

    Reminder {
        id: model.id,
        medication_id: model.medication_id,
        scheduled_time: model.scheduled_time,
        status,
    }
}

pub fn model_to_subscription(model: push_subscription::Model) -> PushSubscription {
    PushSubscription {
        id: model.id,
        user_id: model.user_id,
        endpoint: model.endpoint,
        p256dh_key: model.p256dh_key,
        auth_key: model.auth_key,
        created_at: model.created_at,
    }
}

/// 新药品 → ActiveModel（id 由数据库生成）
pub fn new_medication_to_active_model(new: &NewMedication) -> medication::ActiveModel {
    use sea_orm::ActiveValue::*;

    medication::ActiveModel {
        id: NotSet,
        user_id: Set(new.user_id),
        name: Set(new.name.clone()),
        dosage: Set(new.dosage.clone()),
        frequency: Set(new.frequency.clone()),
        instructions: Set(new.instructions.clone()),
        start_date: Set(new.start_date),
        end_date: Set(new.end_date),
        priority: Set(new.priority.as_ref().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    fn medication_model(priority: &str) -> medication::Model {
        medication::Model {
            id: 3,
            user_id: 1,
            name: "Warfarin".into(),
            dosage: "5mg".into(),
            frequency: "Once daily".into(),
            instructions: "Take at the same time each day.".into(),
            start_date: Utc::now(),
            end_date: None,
            priority: priority.into(),
        }
    }

    #[test]
    fn test_model_to_medication_parses_priority() {
        let med = model_to_medication(medication_model("HIGH"));
        assert_eq!(med.priority, MedicationPriority::High);
        assert!(med.is_high_risk());
    }

    #[test]
    fn test_model_to_medication_unknown_priority_falls_back() {
        let med = model_to_medication(medication_model("URGENT"));
        assert_eq!(med.priority, MedicationPriority::Normal);
    }

    #[test]
    fn test_model_to_reminder_parses_status() {
        let now = Utc::now();
        let reminder = model_to_reminder(reminder::Model {
            id: 9,
            medication_id: 3,
            scheduled_time: now,
            status: "SENT".into(),
        });
        assert_eq!(reminder.status, ReminderStatus::Sent);
        assert_eq!(reminder.scheduled_time, now);
    }

    #[test]
    fn test_new_medication_active_model_leaves_id_unset() {
        let new = NewMedication {
            user_id: 5,
            name: "Vitamin D".into(),
            dosage: "1000 IU".into(),
            frequency: "Once daily".into(),
            instructions: "Take with food.".into(),
            start_date: Utc::now(),
            end_date: None,
            priority: MedicationPriority::Normal,
        };
        let active = new_medication_to_active_model(&new);
        assert!(matches!(active.id, ActiveValue::NotSet));
        assert!(matches!(active.user_id, ActiveValue::Set(5)));
        if let ActiveValue::Set(priority) = active.priority {
            assert_eq!(priority, "NORMAL");
        } else {
            panic!("priority should be set");
        }
    }
}
