//! Push notification display.

use serde::Deserialize;

/// Options passed alongside a notification title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub body: Option<String>,
    pub icon: String,
}

/// Host notification surface. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn show(&self, title: &str, notification: Notification);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, title: &str, notification: Notification) {
        tracing::info!(
            title,
            body = notification.body.as_deref().unwrap_or(""),
            icon = %notification.icon,
            "notification"
        );
    }
}

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
}

/// Build the notification for a push payload.
///
/// A JSON object supplies `title` and `body`. Any other payload is used as
/// the body text. Missing titles fall back to `default_title`.
pub fn from_push(payload: Option<&[u8]>, default_title: &str, icon: &str) -> (String, Notification) {
    let parsed = match payload {
        None => PushPayload::default(),
        Some(bytes) => serde_json::from_slice::<PushPayload>(bytes).unwrap_or_else(|_| PushPayload {
            title: None,
            body: Some(String::from_utf8_lossy(bytes).into_owned()).filter(|b| !b.is_empty()),
        }),
    };

    let title = parsed.title.unwrap_or_else(|| default_title.to_string());
    (title, Notification { body: parsed.body, icon: icon.to_string() })
}
