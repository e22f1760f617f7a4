//! Page resource schema.
//!
//! One declaration drives three things: the `schema` block returned by
//! OPTIONS, validation of write bodies, and per-context output filtering.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value, json};

use crate::content::PaginationLimits;
use crate::error::AppError;
use crate::models::PostStatus;
use crate::store::OrderBy;

/// Request scope; decides which fields a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Context {
    #[default]
    View,
    Embed,
    Edit,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::View, Context::Embed, Context::Edit];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Embed => "embed",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| "context is not one of view, embed, edit".to_string())
    }
}

/// Format of the local `date` field and of dates without an offset.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A client-supplied date. The offset is present only when the client sent one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedDate {
    pub naive: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

/// Accepts RFC 3339 or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_date_time(value: &str) -> Option<ParsedDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(ParsedDate {
            naive: dt.naive_local(),
            offset: Some(*dt.offset()),
        });
    }
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|naive| ParsedDate {
            naive,
            offset: None,
        })
}

fn contexts(list: &[Context]) -> Value {
    json!(list.iter().map(|c| c.as_str()).collect::<Vec<_>>())
}

fn statuses() -> Value {
    json!(PostStatus::WRITABLE.iter().map(|s| s.as_str()).collect::<Vec<_>>())
}

/// Rich text property with `raw`/`rendered` (and `protected` when it can be hidden).
fn rich_text(description: &str, ctx: &[Context], protectable: bool) -> Value {
    use Context::*;
    let mut properties = json!({
        "raw": {
            "description": format!("{description}, as it exists in the database."),
            "type": "string",
            "context": contexts(&[Edit]),
        },
        "rendered": {
            "description": format!("{description}, transformed for display."),
            "type": "string",
            "context": contexts(ctx),
            "readonly": true,
        },
    });
    if protectable {
        properties["protected"] = json!({
            "description": "Whether the content is protected with a password.",
            "type": "boolean",
            "context": contexts(&[View, Edit, Embed]),
            "readonly": true,
        });
    }

    json!({
        "description": description,
        "type": "object",
        "context": contexts(ctx),
        "properties": properties,
    })
}

/// Property declarations, keyed by field name.
pub fn page_properties(template_slugs: &[String]) -> Map<String, Value> {
    use Context::*;
    let discussion = json!(["open", "closed"]);

    let properties = json!({
        "date": {
            "description": "The date the object was published, in the site's timezone.",
            "type": "string",
            "format": "date-time",
            "context": contexts(&[View, Edit, Embed]),
        },
        "date_gmt": {
            "description": "The date the object was published, as GMT.",
            "type": "string",
            "format": "date-time",
            "context": contexts(&[View, Edit]),
        },
        "guid": {
            "description": "The globally unique identifier for the object.",
            "type": "object",
            "context": contexts(&[View, Edit]),
            "readonly": true,
            "properties": {
                "raw": {
                    "description": "GUID for the object, as it exists in the database.",
                    "type": "string",
                    "context": contexts(&[Edit]),
                    "readonly": true,
                },
                "rendered": {
                    "description": "GUID for the object, transformed for display.",
                    "type": "string",
                    "context": contexts(&[View, Edit]),
                    "readonly": true,
                },
            },
        },
        "id": {
            "description": "Unique identifier for the object.",
            "type": "integer",
            "context": contexts(&[View, Edit, Embed]),
            "readonly": true,
        },
        "link": {
            "description": "URL to the object.",
            "type": "string",
            "format": "uri",
            "context": contexts(&[View, Edit, Embed]),
            "readonly": true,
        },
        "modified": {
            "description": "The date the object was last modified, in the site's timezone.",
            "type": "string",
            "format": "date-time",
            "context": contexts(&[View, Edit]),
            "readonly": true,
        },
        "modified_gmt": {
            "description": "The date the object was last modified, as GMT.",
            "type": "string",
            "format": "date-time",
            "context": contexts(&[View, Edit]),
            "readonly": true,
        },
        "password": {
            "description": "A password to protect access to the post.",
            "type": "string",
            "context": contexts(&[Edit]),
        },
        "slug": {
            "description": "An alphanumeric identifier for the object unique to its type.",
            "type": "string",
            "context": contexts(&[View, Edit, Embed]),
        },
        "status": {
            "description": "A named status for the object.",
            "type": "string",
            "enum": statuses(),
            "context": contexts(&[Edit]),
        },
        "type": {
            "description": "Type of Post for the object.",
            "type": "string",
            "context": contexts(&[View, Edit, Embed]),
            "readonly": true,
        },
        "title": rich_text("The title for the object", &[View, Edit, Embed], false),
        "content": rich_text("The content for the object", &[View, Edit], true),
        "excerpt": rich_text("The excerpt for the object", &[View, Edit, Embed], true),
        "author": {
            "description": "The id for the author of the object.",
            "type": "integer",
            "context": contexts(&[View, Edit, Embed]),
        },
        "featured_image": {
            "description": "The id of the featured image for the object.",
            "type": "integer",
            "context": contexts(&[View, Edit]),
        },
        "comment_status": {
            "description": "Whether or not comments are open on the object.",
            "type": "string",
            "enum": discussion.clone(),
            "context": contexts(&[View, Edit]),
        },
        "ping_status": {
            "description": "Whether or not the object can be pinged.",
            "type": "string",
            "enum": discussion,
            "context": contexts(&[View, Edit]),
        },
        "parent": {
            "description": "The id for the parent of the object.",
            "type": "integer",
            "context": contexts(&[View, Edit]),
        },
        "menu_order": {
            "description": "The order of the object in relation to other object of its type.",
            "type": "integer",
            "context": contexts(&[View, Edit]),
        },
        "template": {
            "description": "The theme file to use to display the object.",
            "type": "string",
            "enum": template_slugs,
            "context": contexts(&[View, Edit]),
        },
    });

    match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Full schema document for the page resource.
pub fn page_schema(template_slugs: &[String]) -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "title": "page",
        "type": "object",
        "properties": page_properties(template_slugs),
    })
}

/// The `context` argument accepted by every GET endpoint.
pub fn context_param() -> Value {
    json!({
        "description": "Scope under which the request is made; determines fields present in response.",
        "type": "string",
        "enum": contexts(&Context::ALL),
        "default": Context::View.as_str(),
        "required": false,
    })
}

/// Query arguments of the collection GET endpoint.
pub fn collection_params(limits: PaginationLimits) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("context".into(), context_param());
    params.insert(
        "page".into(),
        json!({
            "description": "Current page of the collection.",
            "type": "integer",
            "default": 1,
            "minimum": 1,
            "required": false,
        }),
    );
    params.insert(
        "per_page".into(),
        json!({
            "description": "Maximum number of items to be returned in result set.",
            "type": "integer",
            "default": limits.default_per_page,
            "minimum": 1,
            "maximum": limits.max_per_page,
            "required": false,
        }),
    );
    params.insert(
        "search".into(),
        json!({
            "description": "Limit results to those matching a string.",
            "type": "string",
            "required": false,
        }),
    );
    params.insert(
        "author".into(),
        json!({
            "description": "Limit result set to posts assigned to a specific author.",
            "type": "integer",
            "required": false,
        }),
    );
    params.insert(
        "exclude".into(),
        json!({
            "description": "Ensure result set excludes specific ids.",
            "type": "array",
            "items": { "type": "integer" },
            "default": [],
            "required": false,
        }),
    );
    params.insert(
        "include".into(),
        json!({
            "description": "Limit result set to specific ids.",
            "type": "array",
            "items": { "type": "integer" },
            "default": [],
            "required": false,
        }),
    );
    params.insert(
        "order".into(),
        json!({
            "description": "Order sort attribute ascending or descending.",
            "type": "string",
            "enum": ["asc", "desc"],
            "default": "desc",
            "required": false,
        }),
    );
    params.insert(
        "orderby".into(),
        json!({
            "description": "Sort collection by object attribute.",
            "type": "string",
            "enum": OrderBy::ALL.iter().map(|o| o.as_str()).collect::<Vec<_>>(),
            "default": OrderBy::default().as_str(),
            "required": false,
        }),
    );
    params.insert(
        "parent".into(),
        json!({
            "description": "Limit result set to those of particular parent ids.",
            "type": "integer",
            "required": false,
        }),
    );
    params.insert(
        "status".into(),
        json!({
            "description": "Limit result set to posts assigned a specific status.",
            "type": "string",
            "default": PostStatus::Publish.as_str(),
            "required": false,
        }),
    );
    params.insert(
        "filter".into(),
        json!({
            "description": "Use query vars to modify the response; private query vars require appropriate authorization.",
            "type": "object",
            "required": false,
        }),
    );
    params
}

/// Query arguments of the item GET endpoint.
pub fn item_params() -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("context".into(), context_param());
    params
}

/// Body arguments of the create and update endpoints: every writable property.
pub fn writable_params(properties: &Map<String, Value>) -> Map<String, Value> {
    let mut params = Map::new();
    for (name, property) in properties {
        if is_readonly(property) {
            continue;
        }
        let mut arg = Map::new();
        for key in ["description", "type", "enum", "format"] {
            if let Some(value) = property.get(key) {
                arg.insert(key.into(), value.clone());
            }
        }
        arg.insert("required".into(), Value::Bool(false));
        params.insert(name.clone(), Value::Object(arg));
    }
    params
}

/// Query arguments of the DELETE endpoint.
pub fn delete_params() -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(
        "force".into(),
        json!({
            "description": "Whether to bypass trash and force deletion.",
            "type": "boolean",
            "default": false,
            "required": false,
        }),
    );
    params
}

fn is_readonly(property: &Value) -> bool {
    property.get("readonly").and_then(Value::as_bool).unwrap_or(false)
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn check_string(name: &str, value: &str, property: &Value) -> Result<(), String> {
    if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
        // An empty template resets the page to the theme default.
        let reset = name == "template" && value.is_empty();
        if !reset && !allowed.iter().any(|a| a.as_str() == Some(value)) {
            let names: Vec<&str> = allowed.iter().filter_map(Value::as_str).collect();
            return Err(format!("{name} is not one of {}.", names.join(", ")));
        }
    }
    if property.get("format").and_then(Value::as_str) == Some("date-time")
        && parse_date_time(value).is_none()
    {
        return Err(format!("{name} is not a valid date."));
    }
    Ok(())
}

fn sanitize_value(name: &str, value: &Value, property: &Value) -> Result<Value, String> {
    match property.get("type").and_then(Value::as_str) {
        Some("integer") => coerce_integer(value)
            .map(Value::from)
            .ok_or_else(|| format!("{name} is not of type integer.")),
        Some("boolean") => coerce_boolean(value)
            .map(Value::Bool)
            .ok_or_else(|| format!("{name} is not of type boolean.")),
        Some("string") => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("{name} is not of type string."))?;
            check_string(name, text, property)?;
            Ok(value.clone())
        }
        Some("object") => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Object(map) if map.get("raw").is_some_and(Value::is_string) => {
                Ok(json!({ "raw": map["raw"] }))
            }
            _ => Err(format!("{name} must be a string or an object with a raw string.")),
        },
        _ => Ok(value.clone()),
    }
}

/// Validate a write body against the declared properties.
///
/// Unknown and readonly fields are dropped, as are nulls. Integers and
/// booleans sent as strings are coerced. Every failure is collected so the
/// client sees all bad parameters at once.
pub fn sanitize_write(
    body: &Map<String, Value>,
    properties: &Map<String, Value>,
) -> Result<Map<String, Value>, AppError> {
    let mut clean = Map::new();
    let mut errors = BTreeMap::new();

    for (name, value) in body {
        let Some(property) = properties.get(name) else {
            continue;
        };
        if is_readonly(property) || value.is_null() {
            continue;
        }
        match sanitize_value(name, value, property) {
            Ok(value) => {
                clean.insert(name.clone(), value);
            }
            Err(reason) => {
                errors.insert(name.clone(), reason);
            }
        }
    }

    if errors.is_empty() {
        Ok(clean)
    } else {
        Err(AppError::invalid_params(errors))
    }
}

/// Drop every field (and nested field) not declared for `context`.
/// Fields outside the schema, such as `_links`, pass through.
pub fn filter_by_context(value: &mut Value, properties: &Map<String, Value>, context: Context) {
    let Value::Object(object) = value else {
        return;
    };

    object.retain(|name, _| match properties.get(name) {
        Some(property) => property
            .get("context")
            .and_then(Value::as_array)
            .is_none_or(|list| list.iter().any(|c| c.as_str() == Some(context.as_str()))),
        None => true,
    });

    for (name, field) in object.iter_mut() {
        if let Some(nested) = properties
            .get(name)
            .and_then(|p| p.get("properties"))
            .and_then(Value::as_object)
        {
            filter_by_context(field, nested, context);
        }
    }
}
