// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a backend reply into an [`ExtractedOrder`].
//!
//! Decoding is tolerant: missing fields take schema defaults, stray values
//! are coerced with a recorded issue, and older payload shapes are accepted:
//!
//! - `{"items": [{productName, flavor, quantity, volumeMl}], date, time}` (canonical)
//! - `{"list": [{product, flavor, quantity, volume}], date, time}`
//! - `{"products": [{item, flavor, quantity, volume}], date, time}`
//! - `{"item": {...}, date, time}`
//! - `{product, flavor, quantity, volume, date, time}`
//!
//! Nothing here returns an error. A payload that is not JSON at all yields
//! an order with no items dated today, and the text is kept as the
//! assistant's reply.

use comanda_core::{BackendReply, ComandaError, ExtractedOrder, LineItem, Volume};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::temporal::{self, TemporalContext};

const PRODUCT_KEYS: [&str; 5] = ["productName", "product_name", "product", "item", "name"];
const FLAVOR_KEYS: [&str; 2] = ["flavor", "flavour"];
const QUANTITY_KEYS: [&str; 2] = ["quantity", "qty"];
const VOLUME_KEYS: [&str; 3] = ["volumeMl", "volume_ml", "volume"];
const LIST_KEYS: [&str; 3] = ["items", "list", "products"];

/// The result of interpreting one backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub order: ExtractedOrder,
    /// Non-fatal problems found while degrading the payload.
    pub issues: Vec<String>,
    /// Set when the backend answered in prose instead of an extraction.
    pub assistant_text: Option<String>,
    /// The payload that was selected for decoding, verbatim.
    pub payload: String,
}

/// Select the payload according to reply shape: non-empty content wins,
/// otherwise the function-call arguments.
pub fn select_payload(reply: &BackendReply) -> &str {
    match reply {
        BackendReply::Content(content) => content,
        BackendReply::Mixed { content, .. } => content,
        BackendReply::FunctionCall(call) => &call.arguments,
    }
}

/// Interpret a backend reply against the context captured for this turn.
pub fn interpret(reply: &BackendReply, ctx: &TemporalContext) -> Interpretation {
    interpret_payload(select_payload(reply), ctx)
}

/// Interpret a raw payload string.
pub fn interpret_payload(payload: &str, ctx: &TemporalContext) -> Interpretation {
    let mut issues = Vec::new();

    let strict_err = match decode_strict(payload) {
        Ok(order) => {
            return Interpretation {
                order,
                issues,
                assistant_text: None,
                payload: payload.to_string(),
            };
        }
        Err(e) => e,
    };
    debug!(error = %strict_err, "canonical decode failed, falling back to tolerant decode");

    let value = extract_json_object(payload)
        .and_then(|json| serde_json::from_str::<Value>(json).ok());

    let (order, assistant_text) = match value {
        Some(value) => (decode_tolerant(&value, ctx, &mut issues), None),
        None => {
            let text = payload.trim();
            issues.push(strict_err.to_string());
            (
                ExtractedOrder::empty(ctx.today()),
                (!text.is_empty()).then(|| text.to_string()),
            )
        }
    };

    if !issues.is_empty() {
        warn!(issues = ?issues, items = order.items.len(), "extraction degraded");
    }

    Interpretation {
        order,
        issues,
        assistant_text,
        payload: payload.to_string(),
    }
}

/// Decode the canonical shape exactly.
///
/// Fails with [`ComandaError::MalformedExtraction`] on anything else,
/// including a time that is not zero-padded `"hh:mm"`.
pub fn decode_strict(payload: &str) -> Result<ExtractedOrder, ComandaError> {
    let json = extract_json_object(payload).ok_or_else(|| ComandaError::MalformedExtraction {
        message: "reply carried no JSON object".to_string(),
    })?;
    let order: ExtractedOrder =
        serde_json::from_str(json).map_err(|e| ComandaError::MalformedExtraction {
            message: e.to_string(),
        })?;
    if !order.time.is_empty() && !temporal::is_canonical_time(&order.time) {
        return Err(ComandaError::MalformedExtraction {
            message: format!("time `{}` is not hh:mm", order.time),
        });
    }
    Ok(order)
}

/// Slice out the outermost JSON object, skipping code fences and prose.
fn extract_json_object(payload: &str) -> Option<&str> {
    let trimmed = payload.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

fn decode_tolerant(value: &Value, ctx: &TemporalContext, issues: &mut Vec<String>) -> ExtractedOrder {
    let Some(root) = value.as_object() else {
        issues.push("payload is not a JSON object".to_string());
        return ExtractedOrder::empty(ctx.today());
    };

    let is_flat = PRODUCT_KEYS
        .iter()
        .any(|k| root.get(*k).is_some_and(Value::is_string));
    let values = match item_values(root) {
        found if found.is_empty() && is_flat => vec![value],
        found => found,
    };

    let items = values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, v)| decode_item(idx, v, issues))
        .collect();

    ExtractedOrder {
        items,
        date: decode_date(root.get("date"), ctx, issues),
        time: decode_time(root.get("time"), issues),
    }
}

/// Collect the item objects from whichever shape the payload uses.
fn item_values(root: &Map<String, Value>) -> Vec<&Value> {
    for key in LIST_KEYS {
        match root.get(key) {
            Some(Value::Array(list)) => return list.iter().collect(),
            Some(single @ Value::Object(_)) => return vec![single],
            _ => {}
        }
    }
    if let Some(nested @ Value::Object(_)) = root.get("item") {
        return vec![nested];
    }
    if let Some(Value::Array(list)) = root.get("item") {
        return list.iter().collect();
    }
    Vec::new()
}

fn decode_item(idx: usize, value: &Value, issues: &mut Vec<String>) -> Option<LineItem> {
    let obj = match value {
        Value::Object(obj) => obj,
        Value::String(name) => return Some(LineItem::new(name.trim())),
        other => {
            issues.push(format!("item {idx} is not an object: {other}"));
            return None;
        }
    };

    let product_name = first_string(obj, &PRODUCT_KEYS).unwrap_or_default();
    if product_name.is_empty() {
        issues.push(format!("item {idx} has no product name"));
    }

    Some(LineItem {
        product_name,
        flavor: first_string(obj, &FLAVOR_KEYS).unwrap_or_default(),
        quantity: decode_quantity(idx, first_present(obj, &QUANTITY_KEYS), issues),
        volume_ml: decode_volume(idx, first_present(obj, &VOLUME_KEYS), issues),
    })
}

fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
}

/// Missing means 1. Explicit 0 is kept. Negative or non-numeric degrade to 1.
fn decode_quantity(idx: usize, value: Option<&Value>, issues: &mut Vec<String>) -> u32 {
    let parsed = match value {
        None => return 1,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) if s.trim().is_empty() => return 1,
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match parsed.and_then(|q| u32::try_from(q).ok()) {
        Some(q) => q,
        None => {
            issues.push(format!(
                "item {idx} quantity {} is not a non-negative integer, using 1",
                value.map(Value::to_string).unwrap_or_default()
            ));
            1
        }
    }
}

/// Coerce to the enumeration; implausible or non-numeric values become 0.
fn decode_volume(idx: usize, value: Option<&Value>, issues: &mut Vec<String>) -> Volume {
    let ml = match value {
        None => return Volume::Unspecified,
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim().to_lowercase();
            let digits = s.strip_suffix("ml").unwrap_or(&s).trim();
            if digits.is_empty() {
                return Volume::Unspecified;
            }
            digits.parse::<i64>().ok()
        }
        Some(_) => None,
    };

    let Some(ml) = ml else {
        issues.push(format!(
            "item {idx} volume {} is not numeric, using 0",
            value.map(Value::to_string).unwrap_or_default()
        ));
        return Volume::Unspecified;
    };

    match Volume::nearest(ml) {
        Some(volume) if i64::from(volume.ml()) == ml => volume,
        Some(volume) => {
            issues.push(format!(
                "item {idx} volume {ml} ml coerced to {} ml",
                volume.ml()
            ));
            volume
        }
        None => {
            issues.push(format!(
                "item {idx} volume {ml} ml is out of range, using 0"
            ));
            Volume::Unspecified
        }
    }
}

fn decode_date(
    value: Option<&Value>,
    ctx: &TemporalContext,
    issues: &mut Vec<String>,
) -> chrono::NaiveDate {
    let text = match value.and_then(Value::as_str).map(str::trim) {
        None | Some("") => return ctx.today(),
        Some(text) => text,
    };
    if let Some(date) = temporal::parse_iso_date(text) {
        return date;
    }
    temporal::resolve_date(ctx, text).unwrap_or_else(|| {
        issues.push(format!("date `{text}` not understood, using today"));
        ctx.today()
    })
}

fn decode_time(value: Option<&Value>, issues: &mut Vec<String>) -> String {
    let text = match value.and_then(Value::as_str).map(str::trim) {
        None | Some("") => return String::new(),
        Some(text) => text,
    };
    if temporal::is_canonical_time(text) {
        return text.to_string();
    }
    temporal::resolve_time(text).unwrap_or_else(|| {
        issues.push(format!("time `{text}` not understood, leaving it empty"));
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use comanda_core::FunctionCall;

    fn ctx() -> TemporalContext {
        TemporalContext::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn call(arguments: &str) -> BackendReply {
        BackendReply::FunctionCall(FunctionCall {
            name: "getProductsAndDate".into(),
            arguments: arguments.into(),
        })
    }

    #[test]
    fn canonical_function_call_decodes_cleanly() {
        let reply = call(
            r#"{"items":[{"productName":"juice","flavor":"strawberry","quantity":1,"volumeMl":0},
                        {"productName":"vape","flavor":"","quantity":1,"volumeMl":0}],
                "date":"2024-01-02","time":"14:00"}"#,
        );
        let out = interpret(&reply, &ctx());
        assert!(out.issues.is_empty());
        assert_eq!(
            out.order.items,
            vec![
                LineItem::new("juice").with_flavor("strawberry"),
                LineItem::new("vape"),
            ]
        );
        assert_eq!(out.order.date, date(2024, 1, 2));
        assert_eq!(out.order.time, "14:00");
    }

    #[test]
    fn content_takes_precedence_over_function_call() {
        let reply = BackendReply::Mixed {
            content: r#"{"items":[{"productName":"pod"}],"date":"2024-01-05","time":""}"#.into(),
            call: FunctionCall {
                name: "getProductsAndDate".into(),
                arguments: r#"{"items":[{"productName":"coil"}],"date":"2024-01-09","time":""}"#
                    .into(),
            },
        };
        let out = interpret(&reply, &ctx());
        assert_eq!(out.order.items[0].product_name, "pod");
        assert_eq!(out.order.date, date(2024, 1, 5));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let out = interpret(&call(r#"{"items":[{"productName":"vape"}]}"#), &ctx());
        let item = &out.order.items[0];
        assert_eq!(item.quantity, 1);
        assert_eq!(item.volume_ml, Volume::Unspecified);
        assert_eq!(item.flavor, "");
        assert_eq!(out.order.date, date(2024, 1, 1));
        assert_eq!(out.order.time, "");
    }

    #[test]
    fn legacy_list_shape_with_string_volume() {
        let payload = r#"{"list":[{"product":"juice","flavor":"morango","quantity":2,"volume":"30"}],
                          "date":"2024-01-03","time":"09:15"}"#;
        let out = interpret(&call(payload), &ctx());
        assert_eq!(
            out.order.items,
            vec![LineItem::new("juice")
                .with_flavor("morango")
                .with_quantity(2)
                .with_volume(Volume::Ml30)]
        );
        assert!(out.issues.is_empty(), "{:?}", out.issues);
    }

    #[test]
    fn legacy_products_and_nested_item_shapes() {
        let products = r#"{"products":[{"item":"coil"},{"item":"pod","quantity":"3"}]}"#;
        let out = interpret(&call(products), &ctx());
        let names: Vec<_> = out.order.items.iter().map(|i| i.product_name.as_str()).collect();
        assert_eq!(names, ["coil", "pod"]);
        assert_eq!(out.order.items[1].quantity, 3);

        let nested = r#"{"item":{"product":"vape","quantity":1},"date":"","time":""}"#;
        let out = interpret(&call(nested), &ctx());
        assert_eq!(out.order.items, vec![LineItem::new("vape")]);
    }

    #[test]
    fn flat_single_item_shape() {
        let out = interpret(
            &call(r#"{"product":"juice","flavor":"uva","quantity":1,"volume":"60","date":"2024-01-04"}"#),
            &ctx(),
        );
        assert_eq!(
            out.order.items,
            vec![LineItem::new("juice").with_flavor("uva").with_volume(Volume::Ml60)]
        );
        assert_eq!(out.order.date, date(2024, 1, 4));
    }

    #[test]
    fn volumes_are_coerced_or_dropped_with_issues() {
        let payload = r#"{"items":[
            {"productName":"a","volumeMl":40},
            {"productName":"b","volumeMl":"30ml"},
            {"productName":"c","volumeMl":5000},
            {"productName":"d","volumeMl":"big"}
        ]}"#;
        let out = interpret(&call(payload), &ctx());
        let volumes: Vec<_> = out.order.items.iter().map(|i| i.volume_ml).collect();
        assert_eq!(
            volumes,
            [Volume::Ml30, Volume::Ml30, Volume::Unspecified, Volume::Unspecified]
        );
        assert_eq!(out.issues.len(), 3, "{:?}", out.issues);
    }

    #[test]
    fn quantities_degrade_to_one() {
        let payload = r#"{"items":[
            {"productName":"a","quantity":-2},
            {"productName":"b","quantity":"lots"},
            {"productName":"c","quantity":0},
            {"productName":"d","quantity":null}
        ]}"#;
        let out = interpret(&call(payload), &ctx());
        let quantities: Vec<_> = out.order.items.iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, [1, 1, 0, 1]);
        assert_eq!(out.issues.len(), 2);
    }

    #[test]
    fn relative_date_and_loose_time_are_resolved() {
        let payload = r#"{"items":[],"date":"next monday","time":"14h25"}"#;
        let out = interpret(&call(payload), &ctx());
        assert_eq!(out.order.date, date(2024, 1, 8));
        assert_eq!(out.order.time, "14:25");
    }

    #[test]
    fn unparseable_date_falls_back_to_today_with_issue() {
        let out = interpret(&call(r#"{"items":[],"date":"someday","time":"soon"}"#), &ctx());
        assert_eq!(out.order.date, date(2024, 1, 1));
        assert_eq!(out.order.time, "");
        assert_eq!(out.issues.len(), 2);
    }

    #[test]
    fn fenced_json_with_prose_is_accepted() {
        let content = "Sure! Here is the order:\n```json\n{\"items\":[{\"productName\":\"vape\",\"flavor\":\"\",\"quantity\":1,\"volumeMl\":0}],\"date\":\"2024-01-02\",\"time\":\"\"}\n```";
        let out = interpret(&BackendReply::Content(content.into()), &ctx());
        assert_eq!(out.order.items, vec![LineItem::new("vape")]);
        assert!(out.assistant_text.is_none());
    }

    #[tracing_test::traced_test]
    #[test]
    fn prose_reply_becomes_assistant_text() {
        let out = interpret(
            &BackendReply::Content("Sorry, I can only help with shop orders.".into()),
            &ctx(),
        );
        assert!(out.order.items.is_empty());
        assert_eq!(out.order.date, date(2024, 1, 1));
        assert_eq!(
            out.assistant_text.as_deref(),
            Some("Sorry, I can only help with shop orders.")
        );
        assert_eq!(out.issues.len(), 1);
        assert!(logs_contain("extraction degraded"));
    }

    #[test]
    fn empty_reply_yields_empty_order() {
        let out = interpret(&BackendReply::Content(String::new()), &ctx());
        assert!(out.order.items.is_empty());
        assert!(out.assistant_text.is_none());
    }

    #[test]
    fn strict_decode_reports_malformed_extraction() {
        let err = decode_strict(r#"{"list":[]}"#).unwrap_err();
        assert_eq!(err.kind(), comanda_core::ErrorKind::MalformedExtraction);
        let err = decode_strict(r#"{"items":[],"date":"2024-01-01","time":"2pm"}"#).unwrap_err();
        assert!(err.to_string().contains("hh:mm"));
    }

    #[test]
    fn interpretation_is_idempotent_through_serialization() {
        let payload = r#"{"list":[{"product":"juice","flavor":"mint","quantity":"2","volume":"45"}],
                          "date":"tomorrow","time":"9h"}"#;
        let first = interpret(&call(payload), &ctx()).order;
        let serialized = serde_json::to_string(&first).unwrap();
        let second = interpret(&BackendReply::Content(serialized), &ctx());
        assert_eq!(second.order, first);
        assert!(second.issues.is_empty());
    }
}
