use std::sync::Arc;

use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::SeaOrmStorage;
pub use models::{
    Medication, MedicationPriority, NewMedication, PushSubscription, Reminder, ReminderDetail,
    ReminderStatus, User, UserProfileUpdate,
};

pub struct StorageFactory;

impl StorageFactory {
    /// 按全局配置创建存储并执行迁移
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        let storage = SeaOrmStorage::new(&config.database).await?;
        Ok(Arc::new(storage))
    }
}
