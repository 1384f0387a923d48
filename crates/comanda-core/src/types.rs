// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order data model and the request/response types exchanged with the
//! language backend.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Gateway,
}

// --- Conversation types ---

/// Author of a chat turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Summary row for a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub turn_count: i64,
    /// RFC 3339 timestamp of the most recent turn.
    pub last_activity: String,
}

// --- Extraction schema ---

/// Container volume in millilitres, restricted to the sizes the shop sells.
///
/// `Unspecified` (0 ml) means the user did not mention a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Volume {
    #[default]
    Unspecified,
    Ml15,
    Ml30,
    Ml60,
    Ml100,
}

impl Volume {
    /// Every allowed volume, ascending.
    pub const ALL: [Volume; 5] = [
        Volume::Unspecified,
        Volume::Ml15,
        Volume::Ml30,
        Volume::Ml60,
        Volume::Ml100,
    ];

    /// Largest millilitre value still considered a plausible volume request.
    pub const MAX_PLAUSIBLE_ML: i64 = 1000;

    pub fn ml(self) -> u16 {
        match self {
            Volume::Unspecified => 0,
            Volume::Ml15 => 15,
            Volume::Ml30 => 30,
            Volume::Ml60 => 60,
            Volume::Ml100 => 100,
        }
    }

    /// Exact lookup; `None` for values outside the enumeration.
    pub fn from_ml(ml: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.ml() == ml)
    }

    /// Coerce an arbitrary millilitre value to the closest allowed volume.
    ///
    /// Ties resolve to the smaller volume. Returns `None` for negative values
    /// and values above [`Volume::MAX_PLAUSIBLE_ML`].
    pub fn nearest(ml: i64) -> Option<Self> {
        if !(0..=Self::MAX_PLAUSIBLE_ML).contains(&ml) {
            return None;
        }
        Self::ALL
            .into_iter()
            .min_by_key(|v| (ml - i64::from(v.ml())).abs())
    }
}

impl Serialize for Volume {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.ml())
    }
}

impl<'de> Deserialize<'de> for Volume {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ml = u16::deserialize(deserializer)?;
        Volume::from_ml(ml).ok_or_else(|| {
            serde::de::Error::custom(format!("volume {ml} ml is not one of 0, 15, 30, 60, 100"))
        })
    }
}

/// One requested catalog entry extracted from a user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_name: String,
    /// Empty when not mentioned.
    #[serde(default)]
    pub flavor: String,
    /// 1 when the user named the item without a count, 0 only when the
    /// user explicitly said they do not want it.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub volume_ml: Volume,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    /// A line item with schema defaults for everything but the product.
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            flavor: String::new(),
            quantity: default_quantity(),
            volume_ml: Volume::Unspecified,
        }
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = flavor.into();
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volume_ml = volume;
        self
    }
}

impl Default for LineItem {
    fn default() -> Self {
        Self::new("")
    }
}

/// The structured record produced from one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedOrder {
    pub items: Vec<LineItem>,
    /// Always an absolute calendar date.
    pub date: NaiveDate,
    /// `"hh:mm"`, or empty when the user gave no time.
    pub time: String,
}

impl ExtractedOrder {
    /// An order with no items for the given date and no time.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            items: Vec::new(),
            date,
            time: String::new(),
        }
    }

    pub fn has_time(&self) -> bool {
        !self.time.is_empty()
    }
}

// --- Catalog types ---

/// A persisted catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: i64,
    pub product_name: String,
    pub flavor: String,
    pub quantity: u32,
}

/// Input for creating or replacing a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub product_name: String,
    #[serde(default)]
    pub flavor: String,
    #[serde(default)]
    pub quantity: u32,
}

impl NewProduct {
    /// Trim and lowercase text fields; catalog values are stored this way so
    /// matching can compare case-insensitively.
    pub fn normalized(&self) -> Self {
        Self {
            product_name: self.product_name.trim().to_lowercase(),
            flavor: self.flavor.trim().to_lowercase(),
            quantity: self.quantity,
        }
    }

    /// Reject records that could never be matched by name.
    pub fn validate(&self) -> Result<(), crate::ComandaError> {
        if self.product_name.trim().is_empty() {
            return Err(crate::ComandaError::InvalidInput(
                "productName must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The OR-combined predicate set used to look up a catalog record.
///
/// A field is `None` when the line item left it unspecified; unspecified
/// fields never take part in the match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPredicates {
    pub product_name: Option<String>,
    pub flavor: Option<String>,
    pub quantity: Option<u32>,
}

impl MatchPredicates {
    pub fn from_line_item(item: &LineItem) -> Self {
        let text = |s: &str| {
            let s = s.trim().to_lowercase();
            (!s.is_empty()).then_some(s)
        };
        Self {
            product_name: text(&item.product_name),
            flavor: text(&item.flavor),
            quantity: (item.quantity > 0).then_some(item.quantity),
        }
    }

    /// True when no field is specified; such a set matches nothing.
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none() && self.flavor.is_none() && self.quantity.is_none()
    }
}

// --- Provider types ---

/// A function declaration the backend may answer with structured arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the function's arguments object.
    pub parameters: serde_json::Value,
}

/// A request to the language backend.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    /// Ordered conversation; the system turn comes first.
    pub messages: Vec<ChatTurn>,
    pub function: Option<FunctionSchema>,
    pub max_tokens: u32,
}

/// A structured function-call payload returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON argument blob, exactly as the backend produced it.
    pub arguments: String,
}

/// The shape a backend reply arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    /// Plain text content only.
    Content(String),
    /// A function-call payload with no accompanying content.
    FunctionCall(FunctionCall),
    /// Both content and a function call were populated.
    Mixed { content: String, call: FunctionCall },
}

impl BackendReply {
    /// Tag the raw reply fields. Blank content counts as absent.
    pub fn from_parts(content: Option<String>, call: Option<FunctionCall>) -> Self {
        let content = content.filter(|c| !c.trim().is_empty());
        match (content, call) {
            (Some(content), Some(call)) => Self::Mixed { content, call },
            (Some(content), None) => Self::Content(content),
            (None, Some(call)) => Self::FunctionCall(call),
            (None, None) => Self::Content(String::new()),
        }
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A full reply from the language backend.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub model: String,
    pub reply: BackendReply,
    pub usage: TokenUsage,
}
