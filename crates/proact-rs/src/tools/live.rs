//! Live implementations of the context tools.
//!
//! - `get_current_datetime` reads the local clock.
//! - `get_current_gps_coordinates` geolocates the public IP and, with a
//!   LocationIQ key, reverse-geocodes a finer place name.
//! - `get_city_weather` queries Open-Meteo for daily maximum temperatures.
//!
//! All requests share one `reqwest::Client` carrying the configured timeout
//! and user agent. Weather lookups report network trouble in their result
//! text; the location tool fails with a [`ToolError`].

use crate::agent::time_phrase::{DateWindow, parse_base_instant};
use crate::tools::core::{FnTool, NoArgs, Tool, ToolError, ToolModule};
use crate::tools::names;
use crate::tools::sandbox::WeatherArgs;
use crate::{ToolDef, json_schema_for};
use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("proact-rs/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const IP_LOOKUP_URL: &str = "https://ipinfo.io/json";
const REVERSE_GEOCODE_URL: &str = "https://us1.locationiq.com/v1/reverse";
const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone)]
pub struct LiveToolsConfig {
    pub locationiq_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for LiveToolsConfig {
    fn default() -> Self {
        Self {
            locationiq_key: None,
            timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Tools backed by the clock and public web APIs.
#[derive(Debug, Clone)]
pub struct LiveTools {
    client: reqwest::Client,
    locationiq_key: Option<String>,
}

impl LiveTools {
    pub fn new(config: &LiveToolsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            locationiq_key: config.locationiq_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Names this module implements.
    pub fn tool_names() -> [&'static str; 3] {
        [
            names::GET_CURRENT_DATETIME,
            names::GET_CURRENT_GPS_COORDINATES,
            names::GET_CITY_WEATHER,
        ]
    }

    fn current_datetime(&self) -> Box<dyn Tool> {
        Box::new(FnTool::new(
            ToolDef::new(
                names::GET_CURRENT_DATETIME,
                "Get the current date and time.",
                json_schema_for::<NoArgs>(),
            ),
            |_: NoArgs| async { Ok::<_, ToolError>(format_clock(Local::now().naive_local())) },
        ))
    }

    fn current_location(&self) -> Box<dyn Tool> {
        let client = self.client.clone();
        let key = self.locationiq_key.clone();
        Box::new(FnTool::new(
            ToolDef::new(
                names::GET_CURRENT_GPS_COORDINATES,
                "Get the current location of the user as \"coarse | fine\" place names.",
                json_schema_for::<NoArgs>(),
            ),
            move |_: NoArgs| {
                let client = client.clone();
                let key = key.clone();
                async move { locate(&client, key.as_deref()).await }
            },
        ))
    }

    fn city_weather(&self) -> Box<dyn Tool> {
        let client = self.client.clone();
        Box::new(FnTool::new(
            ToolDef::new(
                names::GET_CITY_WEATHER,
                "Get the daily weather of a city: three days, or the three days around a target date.",
                json_schema_for::<WeatherArgs>(),
            ),
            move |args: WeatherArgs| {
                let client = client.clone();
                async move {
                    Ok::<_, ToolError>(weather(&client, args, Local::now().date_naive()).await)
                }
            },
        ))
    }
}

impl ToolModule for LiveTools {
    fn name(&self) -> &str {
        "live"
    }

    fn tools(&self) -> Vec<Box<dyn Tool>> {
        vec![
            self.current_datetime(),
            self.current_location(),
            self.city_weather(),
        ]
    }
}

/// `"Date: September 13, 2025 Time: 15:46:47"`.
pub fn format_clock(now: NaiveDateTime) -> String {
    now.format("Date: %B %d, %Y Time: %H:%M:%S").to_string()
}

async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value, String> {
    let resp = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("HTTP {status}: {body}"));
    }

    resp.json().await.map_err(|e: reqwest::Error| e.to_string())
}

/// Minimal percent-encoding for URL query parameters.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

// ── Location ───────────────────────────────────────────────────────

async fn locate(client: &reqwest::Client, key: Option<&str>) -> Result<String, ToolError> {
    let ip = get_json(client, IP_LOOKUP_URL)
        .await
        .map_err(|e| ToolError::failed(format!("IP geolocation failed: {e}")))?;
    let coarse = coarse_place(&ip);

    let coords = ip.get("loc").and_then(Value::as_str).and_then(parse_lat_lon);
    let (Some((lat, lon)), Some(key)) = (coords, key) else {
        debug!("No coordinates or reverse-geocoding key; mirroring coarse location");
        return Ok(format!("{coarse} | {coarse}"));
    };

    let url = format!(
        "{REVERSE_GEOCODE_URL}?key={}&lat={lat}&lon={lon}&format=json\
         &accept-language=en&normalizeaddress=1&zoom=18",
        urlencoded(key)
    );
    let reverse = get_json(client, &url)
        .await
        .map_err(|e| ToolError::failed(format!("reverse geocoding failed: {e}")))?;
    Ok(format!("{coarse} | {}", fine_place(&reverse)))
}

fn parse_lat_lon(loc: &str) -> Option<(f64, f64)> {
    let (lat, lon) = loc.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

fn text_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).map(str::trim).unwrap_or("")
}

/// `"City, Region, Country"` from an IP lookup.
pub fn coarse_place(ip: &Value) -> String {
    let parts: Vec<&str> = ["city", "region", "country"]
        .iter()
        .map(|k| text_field(ip, k))
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        "Unknown location".to_string()
    } else {
        parts.join(", ")
    }
}

fn first_field<'a>(value: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .map(|k| text_field(value, k))
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// A short place name from a reverse-geocoding response: district and
/// country when available (`"Wan Chai, Hong Kong"`).
pub fn fine_place(reverse: &Value) -> String {
    let Some(address) = reverse.get("address") else {
        return "Unknown location".to_string();
    };
    let district = first_field(
        address,
        &["city_district", "district", "borough", "suburb", "neighbourhood", "quarter"],
    );
    let city = first_field(address, &["city", "town", "village"]);
    let state = text_field(address, "state");
    let country = text_field(address, "country");

    if !country.is_empty()
        && let Some(local) = [district, city, state].into_iter().find(|s| !s.is_empty())
    {
        return format!("{local}, {country}");
    }
    [district, city, state, text_field(address, "road")]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown location")
        .to_string()
}

// ── Weather ────────────────────────────────────────────────────────

/// The date the forecast window is centred on, if the request names one.
///
/// Weekend phrases map to the Saturday of this or next week; a date window
/// maps to its midpoint.
pub fn center_date(time: &Value, today: NaiveDate) -> Option<NaiveDate> {
    match time {
        Value::String(s) => {
            let phrase = s.trim().to_lowercase().replace('_', " ");
            let until_saturday = (5 + 7 - today.weekday().num_days_from_monday()) % 7;
            let extra = match phrase.as_str() {
                "this weekend" | "weekend" => 0,
                "next weekend" | "next wknd" => 7,
                _ => return None,
            };
            today.checked_add_days(Days::new(u64::from(until_saturday + extra)))
        }
        Value::Object(map) => {
            let start = map.get("start_date").and_then(Value::as_str)?;
            let end = map.get("end_date").and_then(Value::as_str).unwrap_or(start);
            let window = DateWindow::new(parse_day(start)?, parse_day(end)?);
            Some(window.center())
        }
        _ => None,
    }
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    parse_base_instant(s).map(|dt| dt.date())
}

fn around(center: NaiveDate) -> [NaiveDate; 3] {
    [
        center.pred_opt().unwrap_or(center),
        center,
        center.succ_opt().unwrap_or(center),
    ]
}

async fn weather(client: &reqwest::Client, args: WeatherArgs, today: NaiveDate) -> String {
    let city = args.city.as_deref().map(str::trim).unwrap_or("");
    if city.is_empty() {
        return "Error: city cannot be empty.".to_string();
    }
    let center = args.time.as_ref().and_then(|t| center_date(t, today));

    let geo_url = format!(
        "{GEOCODING_URL}?name={}&count=1&language=en&format=json",
        urlencoded(city)
    );
    let geo = match get_json(client, &geo_url).await {
        Ok(v) => v,
        Err(e) => return format!("Network error: {e}"),
    };
    let first = geo
        .get("results")
        .and_then(Value::as_array)
        .and_then(|r| r.first());
    let Some((lat, lon)) = first.and_then(|r| Some((r["latitude"].as_f64()?, r["longitude"].as_f64()?)))
    else {
        return format!("Error: city not found: {city}");
    };

    let mut url = format!(
        "{FORECAST_URL}?latitude={lat}&longitude={lon}&daily=temperature_2m_max\
         &temperature_unit=celsius&timezone=auto"
    );
    if let Some(center) = center {
        let [start, _, end] = around(center);
        url.push_str(&format!("&start_date={start}&end_date={end}"));
    }

    match get_json(client, &url).await {
        Ok(forecast) => render_forecast(&forecast, center),
        Err(e) => format!("Network error: {e}"),
    }
}

/// Render daily maxima as `" --> <DailyForecast date=... temperature=...°C>"`
/// segments: the three days around `center`, or the first three days.
pub fn render_forecast(forecast: &Value, center: Option<NaiveDate>) -> String {
    let daily = &forecast["daily"];
    let dates = daily["time"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    let temps = daily["temperature_2m_max"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let mut rows: Vec<(&str, Option<f64>)> = dates
        .iter()
        .zip(temps)
        .filter_map(|(d, t)| Some((d.as_str()?, t.as_f64())))
        .collect();
    if rows.is_empty() {
        return "Error: no forecast data.".to_string();
    }

    match center {
        Some(center) => {
            let wanted = around(center).map(|d| d.to_string());
            rows.retain(|(d, _)| wanted.iter().any(|w| w == d));
            if rows.is_empty() {
                return format!("No forecast available for {} to {}.", wanted[0], wanted[2]);
            }
        }
        None => rows.truncate(3),
    }

    rows.iter()
        .map(|(date, temp)| {
            let temp = temp.map_or_else(|| "?".to_string(), |t| format!("{}", t.round() as i64));
            format!(" --> <DailyForecast date={date} temperature={temp}°C>")
        })
        .collect()
}
