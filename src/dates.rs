// Date handling for due dates and Graph timestamps.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

/// Time of day given to due dates entered as a day offset.
const DUE_TIME: (u32, u32, u32) = (9, 0, 0);

/// Turn the `--due` argument into a Graph `dateTime`. A whole number N is
/// "N days after `today`, 09:00"; anything else is passed through as is.
pub fn resolve_due(input: &str, today: NaiveDate) -> String {
    let Ok(days) = input.trim().parse::<i64>() else {
        return input.to_string();
    };
    let date = if days >= 0 {
        today.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    match date {
        Some(date) => {
            let (h, m, s) = DUE_TIME;
            let time = NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN);
            date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string()
        }
        None => input.to_string(),
    }
}

/// Graph writes `2026-02-10T09:00:00.0000000`, sometimes with a trailing `Z`.
pub fn parse_graph_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok()
}

/// `2026-02-10 09:00:00` for display; unparseable input is shown as is.
pub fn display(raw: &str) -> String {
    match parse_graph_datetime(raw) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => raw.replace('T', " ").trim_end_matches('Z').to_string(),
    }
}
