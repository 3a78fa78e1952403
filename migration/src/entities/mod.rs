pub mod medication;
pub mod push_subscription;
pub mod reminder;
pub mod user;

pub use medication::Entity as MedicationEntity;
pub use push_subscription::Entity as PushSubscriptionEntity;
pub use reminder::Entity as ReminderEntity;
pub use user::Entity as UserEntity;
