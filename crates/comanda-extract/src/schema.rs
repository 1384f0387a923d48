// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The function declaration the backend answers with structured arguments.

use comanda_core::{FunctionSchema, Volume};
use serde_json::json;

use crate::temporal::TemporalContext;

/// Name of the extraction function offered to the backend.
pub const EXTRACTION_FUNCTION: &str = "getProductsAndDate";

/// Build the extraction function declaration for one call.
///
/// The date descriptions embed today's date and weekday from `ctx` so the
/// backend can anchor relative phrases to the same instant the interpreter
/// will use.
pub fn extraction_function(ctx: &TemporalContext) -> FunctionSchema {
    let today = ctx.today_iso();
    let tomorrow = ctx.plus_days(1).format("%Y-%m-%d");
    let after_tomorrow = ctx.plus_days(2).format("%Y-%m-%d");
    let weekday = ctx.weekday_name();
    let volumes: Vec<u16> = Volume::ALL.iter().map(|v| v.ml()).collect();

    FunctionSchema {
        name: EXTRACTION_FUNCTION.to_string(),
        description: "Extract the products the user wants to order and the pickup date and time"
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "description": "Every product the user asked for, in the order mentioned. \
                        Products may be vapes, pods, coils or juices, named by kind, brand or model \
                        (\"SMOK Nord 2\", \"SWAG Kit\", \"Freebase\"). \
                        Example: \"I want a 30ml strawberry juice\" gives one item \
                        {\"productName\": \"juice\", \"flavor\": \"strawberry\", \"quantity\": 1, \"volumeMl\": 30}.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "productName": {
                                "type": "string",
                                "description": "Kind, brand or model of the product, without flavor or size. \
                                    \"I'll take a strawberry SWAG Kit pod\" gives \"SWAG Kit\"."
                            },
                            "flavor": {
                                "type": "string",
                                "description": "Flavor of a juice or nicsalt, e.g. \"strawberry\". \
                                    Empty string when no flavor was mentioned."
                            },
                            "quantity": {
                                "type": "integer",
                                "minimum": 0,
                                "description": "How many units of this item. 1 when the user names the item \
                                    without a count; 0 only when the user says they do not want it."
                            },
                            "volumeMl": {
                                "type": "integer",
                                "enum": volumes,
                                "description": "Volume in millilitres. 0 when no volume was mentioned."
                            }
                        },
                        "required": ["productName", "flavor", "quantity", "volumeMl"]
                    }
                },
                "date": {
                    "type": "string",
                    "description": format!(
                        "Pickup date as YYYY-MM-DD. Today is {weekday}, {today}; tomorrow is \
                         {tomorrow}; the day after tomorrow is {after_tomorrow}. A weekday name means \
                         its next occurrence after today. When the user gives no date, return {today}."
                    )
                },
                "time": {
                    "type": "string",
                    "description": "Pickup time as zero-padded hh:mm, e.g. \"at 14h30\" gives \"14:30\". \
                        Empty string when the user gives no time."
                }
            },
            "required": ["items", "date", "time"]
        }),
    }
}
