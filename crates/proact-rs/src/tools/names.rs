//! Canonical tool name constants.
//!
//! Plans, normalizer registrations and tool modules all refer to tools by
//! these names.

pub const GET_CURRENT_GPS_COORDINATES: &str = "get_current_gps_coordinates";
pub const GET_CURRENT_DATETIME: &str = "get_current_datetime";
pub const GET_CITY_WEATHER: &str = "get_city_weather";
pub const CHECK_AGENDA_TIME_CONFLICT: &str = "check_agenda_time_conflict";
pub const ADD_TO_AGENDA: &str = "add_to_agenda";
pub const ADD_MEETING: &str = "add_meeting";
pub const SEND_EMAIL: &str = "send_email";
pub const SET_TIMER: &str = "set_timer";
pub const GOOGLE_SEARCH: &str = "google_search";
pub const WIKIPEDIA_SEARCH: &str = "wikipedia_search";
pub const SEARCH_REDDIT: &str = "search_reddit";
pub const GET_ONLINE_PRODUCT_PRICE: &str = "get_online_product_price";
pub const GET_HEALTH_DATA: &str = "get_health_data";
pub const GET_MEDICAL_KNOWLEDGE: &str = "get_medical_knowledge";
pub const GOOGLE_MAP: &str = "google_map";
pub const BOOK_UBER: &str = "book_uber";
pub const CHECK_BUS_SCHEDULE: &str = "check_bus_schedule";
pub const PLAY_MUSIC: &str = "play_music";
pub const QUERY_STOCK: &str = "query_stock";
pub const VLLM: &str = "vllm";

/// Every built-in tool name.
pub const ALL: &[&str] = &[
    GET_CURRENT_GPS_COORDINATES,
    GET_CURRENT_DATETIME,
    GET_CITY_WEATHER,
    CHECK_AGENDA_TIME_CONFLICT,
    ADD_TO_AGENDA,
    ADD_MEETING,
    SEND_EMAIL,
    SET_TIMER,
    GOOGLE_SEARCH,
    WIKIPEDIA_SEARCH,
    SEARCH_REDDIT,
    GET_ONLINE_PRODUCT_PRICE,
    GET_HEALTH_DATA,
    GET_MEDICAL_KNOWLEDGE,
    GOOGLE_MAP,
    BOOK_UBER,
    CHECK_BUS_SCHEDULE,
    PLAY_MUSIC,
    QUERY_STOCK,
    VLLM,
];
