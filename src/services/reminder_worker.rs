//! Reminder worker
//!
//! 周期性扫描到期的 PENDING 提醒：标记为 DUE，发送邮件与 Web Push，
//! 并为下一天生成同一时刻的提醒。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::errors::{MediRemindError, Result};
use crate::services::notifier::{Notifiers, PushMessage, PushOutcome};
use crate::storage::{Medication, ReminderDetail, ReminderStatus, SeaOrmStorage, User};

pub struct ReminderWorker {
    storage: Arc<SeaOrmStorage>,
    notifiers: Notifiers,
    daily_rollover: bool,
}

impl ReminderWorker {
    pub fn new(storage: Arc<SeaOrmStorage>, notifiers: Notifiers) -> Self {
        Self {
            storage,
            notifiers,
            daily_rollover: true,
        }
    }

    pub fn with_daily_rollover(mut self, enabled: bool) -> Self {
        self.daily_rollover = enabled;
        self
    }

    /// 处理所有已到期的提醒，返回本轮标记为 DUE 的数量
    pub async fn check_reminders(&self) -> Result<usize> {
        self.check_reminders_at(Utc::now()).await
    }

    pub async fn check_reminders_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.storage.pending_due_reminders(now).await?;
        if due.is_empty() {
            debug!("No due reminders found");
            return Ok(0);
        }

        info!("Found {} due reminder(s)", due.len());
        let mut processed = 0;
        for detail in due {
            match self.process(&detail, now).await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to process reminder {}: {}", detail.reminder.id, e),
            }
        }
        Ok(processed)
    }

    /// 返回 false 表示提醒已被其他 worker 处理
    async fn process(&self, detail: &ReminderDetail, now: DateTime<Utc>) -> Result<bool> {
        let reminder = &detail.reminder;
        let medication = &detail.medication;

        let claimed = self
            .storage
            .transition_reminder(reminder.id, &[ReminderStatus::Pending], ReminderStatus::Due)
            .await?;
        if !claimed {
            debug!("Reminder {} already claimed", reminder.id);
            return Ok(false);
        }
        info!("Processing reminder {} for {}", reminder.id, medication.name);

        // 续排失败只记日志，本次通知照常发送
        if self.daily_rollover {
            if let Err(e) = self.schedule_next(medication, reminder.scheduled_time, now).await {
                error!("Failed to schedule next reminder for {}: {}", medication.name, e);
            }
        }

        let Some(user) = self.storage.find_user_by_id(medication.user_id).await? else {
            warn!("No user associated with medication {}", medication.id);
            return Ok(true);
        };

        if user.email_notifications {
            self.send_email(&user, medication).await;
        }

        let pushed = self.send_push(&user, medication).await;
        if pushed > 0 {
            info!("Sent {} push notification(s) to {}", pushed, user.email);
        }

        Ok(true)
    }

    async fn schedule_next(
        &self,
        medication: &Medication,
        scheduled: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let next = next_occurrence(scheduled, now);
        if medication
            .end_date
            .is_some_and(|end| end.date_naive() < next.date_naive())
        {
            debug!("Medication {} ends before {}, no rollover", medication.id, next);
            return Ok(());
        }
        if self.storage.reminder_exists(medication.id, next).await? {
            return Ok(());
        }
        self.storage.create_reminder(medication.id, next).await?;
        debug!("Scheduled next reminder for {} at {}", medication.name, next);
        Ok(())
    }

    async fn send_email(&self, user: &User, medication: &Medication) {
        let subject = format!("Medication Reminder: {}", medication.name);
        let body = reminder_email_body(medication);
        match self.notifiers.email.send(&user.email, &subject, &body).await {
            Ok(()) => info!("Email notification sent to {}", user.email),
            Err(e) => error!("Failed to send email: {}", e),
        }
    }

    /// 向用户所有订阅推送，清理已失效的订阅
    async fn send_push(&self, user: &User, medication: &Medication) -> usize {
        let subscriptions = match self.storage.subscriptions_for_user(user.id).await {
            Ok(subs) => subs,
            Err(e) => {
                error!("Failed to load push subscriptions: {}", e);
                return 0;
            }
        };
        if subscriptions.is_empty() {
            debug!("No push subscriptions for user {}", user.email);
            return 0;
        }

        let message = reminder_push_message(medication);
        let mut delivered = 0;
        for subscription in &subscriptions {
            match self.notifiers.push.send(subscription, &message).await {
                Ok(PushOutcome::Delivered) => delivered += 1,
                Ok(PushOutcome::Skipped) => {}
                Err(MediRemindError::PushSubscriptionExpired(msg)) => {
                    warn!("Push notification failed: {}", msg);
                    match self.storage.delete_subscription_by_id(subscription.id).await {
                        Ok(()) => info!("Removed expired subscription for user {}", user.email),
                        Err(e) => error!("Failed to remove subscription {}: {}", subscription.id, e),
                    }
                }
                Err(e) => warn!("Push notification failed: {}", e),
            }
        }
        delivered
    }

    /// 按固定间隔运行，直到 `shutdown` 完成
    pub async fn run<F>(&self, poll_interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting reminder worker (poll interval: {}s)",
            poll_interval.as_secs()
        );
        info!(
            "Push notifications: {}",
            if self.notifiers.push.public_key().is_some() {
                "ENABLED"
            } else {
                "DISABLED (no VAPID keys)"
            }
        );

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.check_reminders().await {
                        error!("Error checking reminders: {}", e);
                    }
                }
            }
        }

        info!("Worker shutdown complete");
    }
}

/// `scheduled` 之后第一个晚于 `now` 的同一时刻
///
/// worker 停机多天后只补一次，不会为错过的每一天各生成一条。
pub fn next_occurrence(scheduled: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let days = ((now - scheduled).num_days() + 1).max(1);
    scheduled + chrono::Duration::days(days)
}

pub fn reminder_push_message(medication: &Medication) -> PushMessage {
    PushMessage {
        title: format!("💊 {}", medication.name),
        body: format!(
            "Time to take {} - {}",
            medication.dosage,
            medication.instructions_or_default()
        ),
        icon: None,
        tag: Some(format!("med-{}", medication.id)),
        url: Some("/medications".to_string()),
    }
}

pub fn reminder_email_body(medication: &Medication) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
    <h2 style="color: #2563eb;">⏰ Time to take your medication</h2>
    <div style="background: #f3f4f6; padding: 20px; border-radius: 8px;">
        <p style="font-size: 18px; margin: 0;">
            <strong>{name}</strong> ({dosage})
        </p>
        <p style="color: #6b7280; margin-top: 10px;">{instructions}</p>
    </div>
    <p style="color: #9ca3af; font-size: 12px; margin-top: 20px;">
        This is an automated reminder from MediRemind.
    </p>
</div>"#,
        name = html_escape(&medication.name),
        dosage = html_escape(&medication.dosage),
        instructions = html_escape(medication.instructions_or_default()),
    )
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MedicationPriority;

    fn medication(instructions: &str) -> Medication {
        Medication {
            id: 3,
            user_id: 1,
            name: "Metformin".into(),
            dosage: "500mg".into(),
            frequency: "Twice daily".into(),
            instructions: instructions.into(),
            start_date: Utc::now(),
            end_date: None,
            priority: MedicationPriority::Normal,
        }
    }

    fn ts(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_next_occurrence_is_next_day_when_on_time() {
        assert_eq!(next_occurrence(ts(1, 8, 0), ts(1, 8, 0)), ts(2, 8, 0));
        assert_eq!(next_occurrence(ts(1, 8, 0), ts(1, 23, 59)), ts(2, 8, 0));
    }

    #[test]
    fn test_next_occurrence_skips_missed_days() {
        assert_eq!(next_occurrence(ts(1, 8, 0), ts(6, 12, 0)), ts(7, 8, 0));
        assert_eq!(next_occurrence(ts(1, 8, 0), ts(6, 7, 59)), ts(6, 8, 0));
        assert_eq!(next_occurrence(ts(1, 8, 0), ts(6, 8, 0)), ts(7, 8, 0));
    }

    #[test]
    fn test_push_message_content() {
        let message = reminder_push_message(&medication("After meals"));
        assert_eq!(message.title, "💊 Metformin");
        assert_eq!(message.body, "Time to take 500mg - After meals");
        assert_eq!(message.tag.as_deref(), Some("med-3"));
        assert_eq!(message.url.as_deref(), Some("/medications"));
    }

    #[test]
    fn test_push_message_defaults_instructions() {
        let message = reminder_push_message(&medication(""));
        assert_eq!(message.body, "Time to take 500mg - Take as directed");
    }

    #[test]
    fn test_email_body_escapes_html() {
        let mut med = medication("Take <b>with</b> food");
        med.name = "A&B".into();
        let body = reminder_email_body(&med);
        assert!(body.contains("<strong>A&amp;B</strong> (500mg)"));
        assert!(body.contains("Take &lt;b&gt;with&lt;/b&gt; food"));
        assert!(body.contains("automated reminder from MediRemind"));
    }
}
