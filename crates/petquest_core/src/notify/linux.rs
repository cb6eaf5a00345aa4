use crate::error::AppError;
use crate::notify::{Notifier, Reminder, launch_show, parse_activation_argument};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
        self.notify_with_action(reminder, "")
    }

    fn notify_with_action(&self, reminder: &Reminder, action: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.summary(&reminder.title);
        notification.body(&reminder.body);
        if !action.trim().is_empty() {
            notification.action(action, "Open");
        }

        let handle = notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        if !action.trim().is_empty() {
            let action_key = action.to_string();
            let task_id = reminder.task_id.clone();
            std::thread::spawn(move || {
                let _ = handle.wait_for_action(|selected| {
                    let target = parse_activation_argument(selected).unwrap_or_else(|| task_id.clone());
                    if selected == action_key || selected == "default" {
                        let _ = launch_show(&target);
                    }
                });
            });
        }

        Ok(())
    }
}
