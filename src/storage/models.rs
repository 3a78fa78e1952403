use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 提醒状态
///
/// PENDING → DUE（worker）→ SENT（SSE 已推送）→ TAKEN / SKIPPED（用户操作）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ReminderStatus {
    Pending,
    Due,
    Sent,
    Taken,
    Skipped,
}

impl ReminderStatus {
    /// 用户已处理（出现在历史记录中）
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Taken | Self::Skipped)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MedicationPriority {
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email_notifications: bool,
    pub created_at: DateTime<Utc>,
}

/// 个人资料部分更新，None 表示不修改
#[derive(Debug, Clone, Default)]
pub struct UserProfileUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email_notifications: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub priority: MedicationPriority,
}

/// 未填写用药说明时的默认文字
pub const DEFAULT_INSTRUCTIONS: &str = "Take as directed";

impl Medication {
    pub fn is_high_risk(&self) -> bool {
        self.priority == MedicationPriority::High
    }

    /// 去掉首尾空白的用药说明，为空时返回默认文字
    pub fn instructions_or_default(&self) -> &str {
        match self.instructions.trim() {
            "" => DEFAULT_INSTRUCTIONS,
            trimmed => trimmed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMedication {
    pub user_id: i32,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub priority: MedicationPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i32,
    pub medication_id: i32,
    pub scheduled_time: DateTime<Utc>,
    pub status: ReminderStatus,
}

/// 提醒及其所属药品
#[derive(Debug, Clone)]
pub struct ReminderDetail {
    pub reminder: Reminder,
    pub medication: Medication,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: i32,
    pub user_id: i32,
    pub endpoint: String,
    pub p256dh_key: String,
    pub auth_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageInfo {
    pub backend: String,
}
