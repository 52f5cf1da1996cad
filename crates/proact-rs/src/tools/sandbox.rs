//! Deterministic built-in tools.
//!
//! Every tool the planner knows about, answering with fixed responses. Used
//! for offline runs, evaluation, and as the fallback for tools without a live
//! implementation.

use crate::tools::core::{FnTool, NoArgs, Tool, ToolError, ToolModule};
use crate::tools::names;
use crate::{ToolDef, json_schema_for};
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const GPS_RESPONSE: &str = "Hong Kong, Hong Kong, HK | Wan Chai, Hong Kong";
pub const DATETIME_RESPONSE: &str = "Date: September 13, 2025 Time: 15:46:47";
pub const WEATHER_RESPONSE: &str = " --> <DailyForecast date=2025-09-10 temperature=28°C> \
--> <DailyForecast date=2025-09-11 temperature=29°C> \
--> <DailyForecast date=2025-09-12 temperature=27°C>";
pub const AGENDA_RESPONSE: &[&str] = &[
    "Event: Group Meeting, Start: 2025-09-10 15:00:00, End: 2025-09-10 16:00:00",
    "Event: Group Meeting, Start: 2025-09-11 15:00:00, End: 2025-09-11 16:00:00",
    "Event: Visa Appointment, Start: 2025-09-12 11:30:00, End: 2025-09-12 12:30:00",
];
const ADD_TO_AGENDA_RESPONSE: &str = "Event 'Group meeting' added for 2025-09-19 15:00.";
const TIMER_RESPONSE: &str = "⏰ Timer up! (at 2025-09-11 22:50:21)";
const STOCK_RESPONSE: &str = "AAPL 2023-09-11 Close: 174.07.";
const PRODUCT_PRICE_RESPONSE: &str =
    "Apple Iphone 15 Pro Max - 256gb - Black Titanium - T-mobile - Fair — $519.00 ";
const MUSIC_RESPONSE: &str =
    "Ready to play: Loves Me Not via ytmusic -> https://music.youtube.com/search?q=Loves+Me+Not";
const BUS_RESPONSE: &str = "Nearby stops for 'University, Vincent Drive, Birmingham Research Park, \
Bournbrook, Metchley, Birmingham, West Midlands, England, B15 2SG, United Kingdom' (≤1000 m):\
- KMB: No stops within radius.";
const REDDIT_RESPONSE: &str = "This is going to be a SUBJECTIVE noise cancelling comparison between \
all the headphones I have tried, with subjective I mean Im going to tell you my experience and \
comparisons between those headphones, Im not going to take in count objective measurments, \
technology, mics quantity etc or db cancelled";
const VLLM_RESPONSE: &str = "The vegetables appear to be fresh, as they are in their original \
packaging and have a vibrant color, which typically indicates they are not overripe or old.";
const WIKIPEDIA_RESPONSE: &str = "Cyber physical systems (CPS) are systems that integrate \
computation, networking, and physical processes. In CPS, embedded computers and networks monitor \
and control the physical processes, usually with feedback loops where physical processes affect \
computations and vice versa. Examples of CPS include smart grids, autonomous automobile systems, \
medical monitoring, industrial control systems, robotics systems, and automatic pilot avionics. \
CPS is a key technology in the development of the Internet of Things (IoT) and Industry 4.0.";
const HEALTH_RESPONSE: &str = "Health summary (from CSV)\n\
Range: 2025-09-01 → 2025-09-05\n\
Total: 25,000 steps, 150 min, 2,500 kcal\n\
Intensity minutes: Sedentary 300, Light 100, Fair 30, Very 20\n\
Top activities: Walking (90 min), Running (40 min), Cycling (20 min)\n\n\
Recent 5 entries:\n\
- 2025-09-05 18:30 • Walking • 30 min • 4,000 steps • 400 kcal\n\
- 2025-09-05 07:00 • Running • 20 min • 3,000 steps • 300 kcal\n\
- 2025-09-04 19:00 • Cycling • 20 min • 2,500 steps • 250 kcal\n\
- 2025-09-03 18:00 • Walking • 25 min • 3,500 steps • 350 kcal\n\
- 2025-09-02 07:30 • Running • 20 min • 3,000 steps • 300 kcal";
const MEDICAL_RESPONSE: &str = "Top PubMed evidence (information only, not medical advice):\n\
- Diabetes mellitus is a chronic condition characterized by high blood sugar levels due to insulin \
resistance or deficiency. Common symptoms include increased thirst, frequent urination, fatigue, and \
blurred vision. (Source: PubMed)\n\
- Type 2 diabetes is the most common form of diabetes, often associated with obesity and lifestyle \
factors. Management includes lifestyle changes, oral medications, and sometimes insulin therapy. \
(Source: PubMed)\n\
- Complications of diabetes can include cardiovascular disease, neuropathy, nephropathy, and \
retinopathy. Regular monitoring and management are crucial to prevent these complications. \
(Source: PubMed)";

// ── Argument types ─────────────────────────────────────────────────

/// Arguments of `get_city_weather`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// City name, e.g. "Hong Kong".
    #[serde(default)]
    pub city: Option<String>,
    /// A time phrase or a `{start_date, end_date}` window.
    #[serde(default)]
    pub time: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AgendaEventArgs {
    #[serde(default)]
    pub event: Option<String>,
    /// "YYYY-MM-DD HH:MM", a weekday phrase, or a date window.
    #[serde(default)]
    pub time: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MeetingArgs {
    #[serde(default)]
    pub meeting_topic: Option<String>,
    /// "%Y-%m-%d %H:%M:%S".
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub meeting_location: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmailArgs {
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TimerArgs {
    /// Duration ("25min", "1h30m") or an absolute time ("7:00 am tomorrow").
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryArgs {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LimitedQueryArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RedditArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub subreddit: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProductArgs {
    #[serde(default)]
    pub product_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RouteArgs {
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BusArgs {
    #[serde(default)]
    pub bus_stop: Option<String>,
    /// "auto", "kmb" or "ctb".
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub radius_m: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MusicArgs {
    #[serde(default)]
    pub song: Option<String>,
    /// "ytmusic", "spotify", "apple" or "local".
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub prefer_app: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StockArgs {
    #[serde(default)]
    pub stock_code: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Open, High, Low, Close or Volume.
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VllmArgs {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

// ── Module ─────────────────────────────────────────────────────────

fn fixed<A>(name: &str, description: &str, response: &'static str) -> Box<dyn Tool>
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
{
    Box::new(FnTool::new(
        ToolDef::new(name, description, json_schema_for::<A>()),
        move |_: A| async move { Ok::<_, ToolError>(response) },
    ))
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn shown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

fn google_map() -> Box<dyn Tool> {
    Box::new(FnTool::new(
        ToolDef::new(
            names::GOOGLE_MAP,
            "Get the route and distance from the current location to the destination.",
            json_schema_for::<RouteArgs>(),
        ),
        |args: RouteArgs| async move {
            let from = shown(&args.current_location);
            let reply = if blank(&args.destination) {
                format!(
                    "You are at {from}. Do you want to get directions to a destination? \
                     Provide a destination to receive distance and ETA."
                )
            } else {
                format!(
                    "The distance from {from} to {} is 2 km, approx 36 min.",
                    shown(&args.destination)
                )
            };
            Ok::<_, ToolError>(reply)
        },
    ))
}

fn book_uber() -> Box<dyn Tool> {
    Box::new(FnTool::new(
        ToolDef::new(
            names::BOOK_UBER,
            "Estimate the time and cost of an Uber ride and ask whether to book it.",
            json_schema_for::<RouteArgs>(),
        ),
        |args: RouteArgs| async move {
            let from = shown(&args.current_location);
            let reply = if blank(&args.destination) {
                format!(
                    "You are at {from}. Do you want to request an Uber? \
                     If so, please provide the destination."
                )
            } else {
                format!(
                    "Estimate for {from} to {}: 15.86 km, ~20 min, ~USD 31.14 \
                     (base 2.5 + booking 2.0 + 15.9 km × 1.3/km + 20 min × 0.3/min).",
                    shown(&args.destination)
                )
            };
            Ok::<_, ToolError>(reply)
        },
    ))
}

fn check_agenda() -> Box<dyn Tool> {
    Box::new(FnTool::new(
        ToolDef::new(
            names::CHECK_AGENDA_TIME_CONFLICT,
            "Check the user's agenda and return all events.",
            json_schema_for::<NoArgs>(),
        ),
        |_: NoArgs| async { Ok::<_, ToolError>(AGENDA_RESPONSE.to_vec()) },
    ))
}

/// Every built-in tool with canned responses.
#[derive(Debug, Clone, Default)]
pub struct SandboxTools {
    exclude: Vec<String>,
}

impl SandboxTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// The module without the named tools.
    pub fn without<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: names.into_iter().map(Into::into).collect(),
        }
    }

    fn all_tools() -> Vec<Box<dyn Tool>> {
        vec![
            fixed::<NoArgs>(
                names::GET_CURRENT_GPS_COORDINATES,
                "Get the current location of the user as \"coarse | fine\" place names.",
                GPS_RESPONSE,
            ),
            fixed::<NoArgs>(
                names::GET_CURRENT_DATETIME,
                "Get the current date and time.",
                DATETIME_RESPONSE,
            ),
            fixed::<WeatherArgs>(
                names::GET_CITY_WEATHER,
                "Get the daily weather of a city: three days, or the three days around a target date.",
                WEATHER_RESPONSE,
            ),
            check_agenda(),
            fixed::<AgendaEventArgs>(
                names::ADD_TO_AGENDA,
                "Add an event to the user's agenda.",
                ADD_TO_AGENDA_RESPONSE,
            ),
            fixed::<MeetingArgs>(
                names::ADD_MEETING,
                "Add a meeting with topic, start time and location.",
                "success: 1.",
            ),
            fixed::<EmailArgs>(
                names::SEND_EMAIL,
                "Send an email given the receiver, subject and content.",
                "success",
            ),
            fixed::<TimerArgs>(
                names::SET_TIMER,
                "Set a timer for a duration or an absolute time.",
                TIMER_RESPONSE,
            ),
            fixed::<QueryArgs>(
                names::GOOGLE_SEARCH,
                "Search Google and return the top results.",
                "google search results",
            ),
            fixed::<QueryArgs>(
                names::WIKIPEDIA_SEARCH,
                "Search Wikipedia for general questions about people, places, companies, facts \
                 and events.",
                WIKIPEDIA_RESPONSE,
            ),
            fixed::<RedditArgs>(
                names::SEARCH_REDDIT,
                "Search Reddit posts and return short snippets.",
                REDDIT_RESPONSE,
            ),
            fixed::<ProductArgs>(
                names::GET_ONLINE_PRODUCT_PRICE,
                "Look up the online price of a product.",
                PRODUCT_PRICE_RESPONSE,
            ),
            fixed::<NoArgs>(
                names::GET_HEALTH_DATA,
                "Summarize the user's recent activity and health data.",
                HEALTH_RESPONSE,
            ),
            fixed::<LimitedQueryArgs>(
                names::GET_MEDICAL_KNOWLEDGE,
                "Look up medical knowledge from PubMed.",
                MEDICAL_RESPONSE,
            ),
            google_map(),
            book_uber(),
            fixed::<BusArgs>(
                names::CHECK_BUS_SCHEDULE,
                "Check upcoming buses at a stop or near a landmark.",
                BUS_RESPONSE,
            ),
            fixed::<MusicArgs>(
                names::PLAY_MUSIC,
                "Play a song through a music provider.",
                MUSIC_RESPONSE,
            ),
            fixed::<StockArgs>(
                names::QUERY_STOCK,
                "Query the price of a stock on a date.",
                STOCK_RESPONSE,
            ),
            fixed::<VllmArgs>(
                names::VLLM,
                "Answer a question about an image with a vision language model.",
                VLLM_RESPONSE,
            ),
        ]
    }
}

impl ToolModule for SandboxTools {
    fn name(&self) -> &str {
        "sandbox"
    }

    fn tools(&self) -> Vec<Box<dyn Tool>> {
        Self::all_tools()
            .into_iter()
            .filter(|tool| !self.exclude.contains(&tool.name()))
            .collect()
    }
}
