use serde_json::Value;

use crate::error::{BotError, Result};

/// Known review statuses and the text sent for each.
pub const HOMEWORK_VERDICTS: [(&str, &str); 3] = [
    ("approved", "Работа проверена: ревьюеру всё понравилось. Ура!"),
    ("reviewing", "Работа взята на проверку ревьюером."),
    ("rejected", "Работа проверена: у ревьюера есть замечания."),
];

pub fn verdict(status: &str) -> Option<&'static str> {
    HOMEWORK_VERDICTS
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, v)| *v)
}

/// Build the notification text for one homework record.
///
/// The status is resolved first, so a record that is wrong on both counts
/// reports the unknown status.
pub fn parse_status(homework: &Value) -> Result<String> {
    let status = homework
        .get("status")
        .and_then(Value::as_str)
        .ok_or(BotError::MissingField("status"))?;
    let verdict = verdict(status).ok_or_else(|| BotError::UnknownStatus(status.to_string()))?;
    let name = homework
        .get("homework_name")
        .and_then(Value::as_str)
        .ok_or(BotError::MissingField("homework_name"))?;
    Ok(format!(
        "Изменился статус проверки работы \"{name}\". {verdict}"
    ))
}
