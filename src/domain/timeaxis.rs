use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::domain::session::{AxesSpec, Session};
use crate::error::{PlotError, PlotResult};
use crate::model::{AxesRef, DateFormat, FigureId};
use crate::utils::constants::{JD_UNIX_EPOCH, MINUTES_PER_DAY};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Time values accepted for a date axis.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeInput {
    Instants(Vec<DateTime<Utc>>),
    Timestamp(DateTime<Utc>),
    JulianDays(Vec<f64>),
    /// RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]` strings, naive ones read as UTC.
    Iso(Vec<String>),
}

impl From<Vec<f64>> for TimeInput {
    fn from(jd: Vec<f64>) -> Self {
        TimeInput::JulianDays(jd)
    }
}

impl From<Vec<DateTime<Utc>>> for TimeInput {
    fn from(t: Vec<DateTime<Utc>>) -> Self {
        TimeInput::Instants(t)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(t: DateTime<Utc>) -> Self {
        TimeInput::Timestamp(t)
    }
}

/// Days since 1970-01-01T00:00 UTC.
pub fn plot_date(t: &DateTime<Utc>) -> f64 {
    t.timestamp() as f64 / SECONDS_PER_DAY
        + f64::from(t.timestamp_subsec_nanos()) / (SECONDS_PER_DAY * 1e9)
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Converts `x` into plot dates.
pub fn to_plot_dates(x: &TimeInput) -> PlotResult<Vec<f64>> {
    let dates = match x {
        TimeInput::Instants(ts) => ts.iter().map(plot_date).collect(),
        TimeInput::Timestamp(t) => vec![plot_date(t)],
        TimeInput::JulianDays(jd) => {
            if let Some(bad) = jd.iter().find(|v| !v.is_finite()) {
                return Err(PlotError::UnrecognizedTimeFormat(format!(
                    "non-finite Julian day {}",
                    bad
                )));
            }
            jd.iter().map(|v| v - JD_UNIX_EPOCH).collect()
        }
        TimeInput::Iso(strings) => strings
            .iter()
            .map(|s| {
                parse_iso(s)
                    .map(|t| plot_date(&t))
                    .ok_or_else(|| PlotError::UnrecognizedTimeFormat(format!("'{}'", s)))
            })
            .collect::<PlotResult<Vec<f64>>>()?,
    };
    if dates.is_empty() {
        return Err(PlotError::UnrecognizedTimeFormat("empty time sequence".into()));
    }
    Ok(dates)
}

/// Tick format for a time axis spanning `span_minutes`.
pub fn span_format(span_minutes: f64) -> DateFormat {
    if span_minutes < 4.0 {
        DateFormat::HourMinuteSecond
    } else if span_minutes < 8.0 * 60.0 {
        DateFormat::HourMinute
    } else if span_minutes < 5.0 * MINUTES_PER_DAY {
        DateFormat::DayMinute
    } else if span_minutes < 365.0 * MINUTES_PER_DAY {
        DateFormat::YearMonth
    } else {
        DateFormat::Year
    }
}

/// Resolves `axes` and sets it up for a date x axis. Returns the x values
/// as plot dates.
pub fn figaxes_xdate(
    session: &mut Session,
    x: &TimeInput,
    axes: AxesSpec,
    clear: bool,
) -> PlotResult<(FigureId, AxesRef, Vec<f64>)> {
    let dates = to_plot_dates(x)?;
    let (lo, hi) = dates
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let format = span_format((hi - lo) * MINUTES_PER_DAY);
    log::debug!("{} time values, format {}", dates.len(), format.pattern());

    let (figure, axes) = session.figaxes(axes, true, clear)?;
    session.axes_mut(axes)?.x_date_format = Some(format);
    Ok((figure, axes, dates))
}
