use anyhow::{Context, anyhow};
use chrono::{Duration, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::{info, warn};

use crate::config::Config;

const TIMEZONE_ENV_VAR: &str = "TASKBOARD_TIMEZONE";

#[tracing::instrument(skip(cfg))]
pub fn resolve_timezone(cfg: &Config) -> Option<Tz> {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR) {
        if let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR) {
            return Some(tz);
        }
    }

    if let Some(raw) = cfg.get("timezone") {
        if let Some(tz) = parse_timezone(&raw, "config:timezone") {
            return Some(tz);
        }
    }

    None
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            info!(source, timezone = %trimmed, "configured calendar timezone");
            Some(tz)
        }
        Err(err) => {
            warn!(
                source,
                timezone = %trimmed,
                error = %err,
                "failed to parse timezone id; falling back"
            );
            None
        }
    }
}

#[must_use]
pub fn today(tz: Option<Tz>) -> NaiveDate {
    match tz {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Local::now().date_naive(),
    }
}

#[tracing::instrument(skip(today))]
pub fn parse_due_expr(input: &str, today: NaiveDate) -> anyhow::Result<Option<NaiveDate>> {
    let token = input.trim();

    match token.to_ascii_lowercase().as_str() {
        "" | "none" => return Ok(None),
        "today" => return Ok(Some(today)),
        "tomorrow" => return Ok(Some(today + Duration::days(1))),
        _ => {}
    }

    let rel_re = Regex::new(r"^\+(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

    if let Some(caps) = rel_re.captures(token) {
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative number")?;
        let unit = caps
            .name("unit")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative unit"))?;

        let days = match unit {
            "d" => num,
            "w" => num * 7,
            _ => return Err(anyhow!("unknown relative unit: {unit}")),
        };

        return Ok(Some(today + Duration::days(days)));
    }

    let date = NaiveDate::parse_from_str(token, "%Y-%m-%d").with_context(|| {
        format!(
            "unrecognized due date: {input} (supported: YYYY-MM-DD, today, tomorrow, +Nd, +Nw, none)"
        )
    })?;
    Ok(Some(date))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::parse_due_expr;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_iso_date() {
        let parsed = parse_due_expr("2024-03-05", day(2024, 1, 1)).expect("parse");
        assert_eq!(parsed, Some(day(2024, 3, 5)));
    }

    #[test]
    fn resolves_relative_expressions() {
        let today = day(2026, 2, 16);
        assert_eq!(
            parse_due_expr("today", today).expect("parse"),
            Some(today)
        );
        assert_eq!(
            parse_due_expr("tomorrow", today).expect("parse"),
            Some(day(2026, 2, 17))
        );
        assert_eq!(
            parse_due_expr("+7d", today).expect("parse"),
            Some(day(2026, 2, 23))
        );
        assert_eq!(
            parse_due_expr("+2w", today).expect("parse"),
            Some(day(2026, 3, 2))
        );
    }

    #[test]
    fn empty_and_none_clear_the_date() {
        let today = day(2026, 2, 16);
        assert_eq!(parse_due_expr("", today).expect("parse"), None);
        assert_eq!(parse_due_expr("none", today).expect("parse"), None);
    }

    #[test]
    fn rejects_unrecognized_input() {
        assert!(parse_due_expr("next thursday-ish", day(2026, 2, 16)).is_err());
        assert!(parse_due_expr("2026-13-01", day(2026, 2, 16)).is_err());
    }
}
