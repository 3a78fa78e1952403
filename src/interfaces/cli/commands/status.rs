//! Status command - show the most recent reminder

use colored::Colorize;

use crate::errors::Result;
use crate::storage::{ReminderDetail, ReminderStatus, StorageFactory};

/// Print the most recent reminder straight from the database
pub async fn reminder_status() -> Result<()> {
    let storage = StorageFactory::create().await?;

    match storage.latest_reminder().await? {
        Some(detail) => print!("{}", format_reminder(&detail)),
        None => println!("{} No reminders found", "ℹ".bold().blue()),
    }

    storage.get_db().clone().close().await?;
    Ok(())
}

fn colored_status(status: ReminderStatus) -> colored::ColoredString {
    match status {
        ReminderStatus::Pending => status.as_ref().yellow(),
        ReminderStatus::Due | ReminderStatus::Sent => status.as_ref().cyan(),
        ReminderStatus::Taken => status.as_ref().green(),
        ReminderStatus::Skipped => status.as_ref().red(),
    }
}

fn format_reminder(detail: &ReminderDetail) -> String {
    let reminder = &detail.reminder;
    format!(
        "{}\n  {}:         {}\n  {}: {} ({})\n  {}:  {}\n  {}:     {}\n",
        "Latest Reminder".bold().green(),
        "ID".cyan(),
        reminder.id,
        "Medication".cyan(),
        detail.medication.name,
        detail.medication.dosage,
        "Scheduled".cyan(),
        reminder.scheduled_time.format("%Y-%m-%d %H:%M:%S UTC"),
        "Status".cyan(),
        colored_status(reminder.status)
    )
}
