use crate::error::AppError;
use crate::notify::{Notifier, Reminder, launch_show, parse_activation_argument};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
        self.notify_with_action(reminder, "")
    }

    fn notify_with_action(&self, reminder: &Reminder, action: &str) -> Result<(), AppError> {
        let task_id = reminder.task_id.clone();
        let action_value = action.to_string();
        let mut toast = Toast::new(Toast::POWERSHELL_APP_ID)
            .title(&reminder.title)
            .text1(&reminder.body);

        if !action_value.trim().is_empty() {
            toast = toast.add_button("Open", &action_value);
        }

        toast
            .on_activated(move |args| {
                let target = args
                    .as_deref()
                    .and_then(parse_activation_argument)
                    .unwrap_or_else(|| task_id.clone());
                let _ = launch_show(&target);
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
