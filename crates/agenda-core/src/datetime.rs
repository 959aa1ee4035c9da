use chrono::{
  DateTime,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  SecondsFormat,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

pub const DEFAULT_TIMEZONE: &str =
  "Europe/Berlin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzPreset {
  pub id:       &'static str,
  pub iana:     &'static str,
  pub label_de: &'static str,
  pub label_en: &'static str
}

const fn preset(
  id: &'static str,
  iana: &'static str,
  label_de: &'static str,
  label_en: &'static str
) -> TzPreset {
  TzPreset {
    id,
    iana,
    label_de,
    label_en
  }
}

/// Whole-hour offsets from UTC-12 to UTC+11, one representative zone each.
pub const TZ_PRESETS: [TzPreset; 24] = [
  preset(
    "UTC-12",
    "Etc/GMT+12",
    "UTC−12",
    "UTC−12"
  ),
  preset(
    "UTC-11",
    "Pacific/Pago_Pago",
    "UTC−11",
    "UTC−11"
  ),
  preset(
    "UTC-10",
    "Pacific/Honolulu",
    "UTC−10 (Honolulu)",
    "UTC−10 (Honolulu)"
  ),
  preset(
    "UTC-9",
    "America/Anchorage",
    "UTC−9 (Anchorage)",
    "UTC−9 (Anchorage)"
  ),
  preset(
    "UTC-8",
    "America/Los_Angeles",
    "UTC−8 (Los Angeles)",
    "UTC−8 (Los Angeles)"
  ),
  preset(
    "UTC-7",
    "America/Denver",
    "UTC−7 (Denver)",
    "UTC−7 (Denver)"
  ),
  preset(
    "UTC-6",
    "America/Chicago",
    "UTC−6 (Chicago)",
    "UTC−6 (Chicago)"
  ),
  preset(
    "UTC-5",
    "America/New_York",
    "UTC−5 (New York)",
    "UTC−5 (New York)"
  ),
  preset(
    "UTC-4",
    "America/Halifax",
    "UTC−4 (Halifax)",
    "UTC−4 (Halifax)"
  ),
  preset(
    "UTC-3",
    "America/Sao_Paulo",
    "UTC−3 (São Paulo)",
    "UTC−3 (São Paulo)"
  ),
  preset(
    "UTC-2",
    "Etc/GMT+2",
    "UTC−2",
    "UTC−2"
  ),
  preset(
    "UTC-1",
    "Atlantic/Azores",
    "UTC−1 (Azoren)",
    "UTC−1 (Azores)"
  ),
  preset(
    "UTC±0",
    "UTC",
    "UTC±0 (UTC)",
    "UTC±0 (UTC)"
  ),
  preset(
    "UTC+1",
    "Europe/Berlin",
    "UTC+1 (Berlin)",
    "UTC+1 (Berlin)"
  ),
  preset(
    "UTC+2",
    "Europe/Athens",
    "UTC+2 (Athen)",
    "UTC+2 (Athens)"
  ),
  preset(
    "UTC+3",
    "Europe/Moscow",
    "UTC+3 (Moskau)",
    "UTC+3 (Moscow)"
  ),
  preset(
    "UTC+4",
    "Asia/Dubai",
    "UTC+4 (Dubai)",
    "UTC+4 (Dubai)"
  ),
  preset(
    "UTC+5",
    "Asia/Karachi",
    "UTC+5 (Karachi)",
    "UTC+5 (Karachi)"
  ),
  preset(
    "UTC+6",
    "Asia/Dhaka",
    "UTC+6 (Dhaka)",
    "UTC+6 (Dhaka)"
  ),
  preset(
    "UTC+7",
    "Asia/Bangkok",
    "UTC+7 (Bangkok)",
    "UTC+7 (Bangkok)"
  ),
  preset(
    "UTC+8",
    "Asia/Shanghai",
    "UTC+8 (Shanghai)",
    "UTC+8 (Shanghai)"
  ),
  preset(
    "UTC+9",
    "Asia/Tokyo",
    "UTC+9 (Tokio)",
    "UTC+9 (Tokyo)"
  ),
  preset(
    "UTC+10",
    "Australia/Sydney",
    "UTC+10 (Sydney)",
    "UTC+10 (Sydney)"
  ),
  preset(
    "UTC+11",
    "Pacific/Noumea",
    "UTC+11 (Nouméa)",
    "UTC+11 (Nouméa)"
  )
];

/// Looks a preset up by IANA name or by its `UTC+n` id.
pub fn find_preset(
  raw: &str
) -> Option<&'static TzPreset> {
  let trimmed = raw.trim();
  TZ_PRESETS.iter().find(|preset| {
    preset.iana == trimmed
      || preset
        .id
        .eq_ignore_ascii_case(trimmed)
  })
}

/// Resolves a stored zone name to a `Tz`. Anything outside the preset
/// table falls back to the default zone.
pub fn resolve_timezone(raw: &str) -> Tz {
  if let Some(preset) = find_preset(raw)
    && let Some(tz) =
      parse_timezone(preset.iana)
  {
    return tz;
  }

  tracing::warn!(
    timezone = %raw,
    fallback = DEFAULT_TIMEZONE,
    "timezone is not a known preset; using default"
  );
  parse_timezone(DEFAULT_TIMEZONE)
    .unwrap_or(chrono_tz::UTC)
}

fn parse_timezone(raw: &str) -> Option<Tz> {
  match raw.trim().parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(err) => {
      tracing::error!(
        timezone = %raw,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(
  tz: &Tz,
  now: DateTime<Utc>
) -> NaiveDate {
  now.with_timezone(tz).date_naive()
}

/// Parses a stored timestamp. Strings with an offset are taken as-is;
/// naive date-times and bare dates are read as wall time in `tz`.
pub fn parse_timestamp(
  raw: &str,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.with_timezone(&Utc));
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return local_to_utc(ndt, tz);
    }
  }

  let midnight = parse_date(token)?
    .and_hms_opt(0, 0, 0)?;
  local_to_utc(midnight, tz)
}

pub fn parse_date(
  raw: &str
) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(
    raw.trim(),
    "%Y-%m-%d"
  )
  .ok()
}

/// Parses `HH:MM` (24h clock).
pub fn parse_clock(
  raw: &str
) -> Option<NaiveTime> {
  let clock_re = Regex::new(
    r"^(?P<hour>\d{1,2}):(?P<minute>\d{2})$"
  )
  .ok()?;
  let captures =
    clock_re.captures(raw.trim())?;

  let hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;

  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
}

/// Converts wall time in `tz` to UTC. Ambiguous times pick the earlier
/// instant; times inside a DST gap have no instant and yield `None`.
pub fn local_to_utc(
  local_naive: NaiveDateTime,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  match tz.from_local_datetime(
    &local_naive
  ) {
    | LocalResult::Single(local_dt) => {
      Some(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::debug!(
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Some(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      tracing::warn!(
        local = %local_naive,
        timezone = %tz,
        "local datetime does not exist in timezone"
      );
      None
    }
  }
}

/// Storage form of a timestamp: UTC, millisecond precision, `Z` suffix.
#[must_use]
pub fn format_timestamp(
  dt: DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}
