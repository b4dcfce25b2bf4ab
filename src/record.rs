//! Surprise record data model
//!
//! The record is authored by the creation wizard and read-only during the
//! experience. Stored as camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_CANDLES, MIN_CANDLES};

/// Id used by marketing links and previews; never deleted
pub const PLACEHOLDER_ID: &str = "demo-123";
/// Id of the fallback record substituted when loading fails
pub const DEMO_RECORD_ID: &str = "demo";

/// Wheel messages used when the creator supplied none
pub const DEFAULT_WHEEL_MESSAGES: [&str; 6] = [
    "You are loved beyond measure ❤️",
    "The world is better with you in it 🌍",
    "Your smile lights up every room ✨",
    "May this year be your best yet 🚀",
    "You deserve all the happiness 🎁",
    "Keep shining, beautiful soul 🌟",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CakeFlavor {
    #[default]
    Vanilla,
    Chocolate,
    Strawberry,
    RedVelvet,
    Lemon,
    Mint,
    Blueberry,
    Caramel,
    Coffee,
    Pistachio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CakeStyle {
    #[default]
    Classic,
    Modern,
    Grand,
    Heart,
    Hexagon,
    TieredSquare,
    Bundt,
    Pillow,
    Sphere,
    Tower,
}

/// A persisted birthday surprise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurpriseRecord {
    pub id: String,
    /// The creator
    pub sender_name: String,
    /// The viewer
    pub receiver_name: String,
    pub intro_message: String,
    pub personal_note: String,
    pub final_message: String,
    #[serde(default)]
    pub cake_flavor: CakeFlavor,
    #[serde(default)]
    pub cake_style: CakeStyle,
    pub candle_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_message_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel_options: Option<Vec<String>>,
    /// Unix timestamp (ms)
    #[serde(default)]
    pub created_at: f64,
}

impl SurpriseRecord {
    /// Fixed record shown when the real one cannot be loaded
    pub fn demo() -> Self {
        Self {
            id: DEMO_RECORD_ID.to_string(),
            sender_name: "A Friend".to_string(),
            receiver_name: "You".to_string(),
            intro_message: "Someone wanted to make you smile.".to_string(),
            personal_note: "Happy Birthday!".to_string(),
            final_message: "Big hug!".to_string(),
            cake_flavor: CakeFlavor::Vanilla,
            cake_style: CakeStyle::Classic,
            candle_count: 3,
            song_url: None,
            voice_message_url: None,
            wheel_options: None,
            created_at: 0.0,
        }
    }

    /// Whether this record must never be deleted after viewing
    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty() || self.id == PLACEHOLDER_ID || self.id == DEMO_RECORD_ID
    }

    /// Candle count clamped to the supported range
    pub fn candle_count(&self) -> u32 {
        self.candle_count.clamp(MIN_CANDLES, MAX_CANDLES)
    }

    /// Non-blank creator options, or the default messages if none remain
    pub fn wheel_options(&self) -> Vec<String> {
        let custom: Vec<String> = self
            .wheel_options
            .iter()
            .flatten()
            .filter(|o| !o.trim().is_empty())
            .cloned()
            .collect();
        if custom.is_empty() {
            DEFAULT_WHEEL_MESSAGES.iter().map(|m| m.to_string()).collect()
        } else {
            custom
        }
    }

    /// Uploaded media owned by this record (deleted along with it)
    pub fn media_urls(&self) -> Vec<String> {
        [&self.song_url, &self.voice_message_url]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Track to play once the candles are out
    pub fn celebration_track(&self) -> &str {
        self.song_url.as_deref().unwrap_or(crate::DEMO_MUSIC_URL)
    }
}
