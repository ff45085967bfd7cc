//! Wire shapes of a batch and batch-shape validation.
//!
//! Request item: `[id, route, body?, headers-or-selector?]`
//! Result item:  `[id, route, result?, error?]`
//!
//! Both are positional arrays. The fourth request slot is either a selector
//! array or a headers object; a headers object may carry a selector under
//! the `_s` key.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::error::{BatchError, ItemError};
use crate::routing::validate::validate_route_name;

/// Headers key that carries a selector.
pub const SELECTOR_KEY: &str = "_s";

/// One validated call of an inbound batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub id: String,
    pub route: String,
    /// Call body; `{}` when the slot is absent or `null`.
    pub body: Map<String, Value>,
    pub headers: Option<Map<String, Value>>,
    pub selector: Option<Value>,
}

/// One entry of a dispatch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ResultTuple", from = "ResultTuple")]
pub struct ResultItem {
    pub id: String,
    pub route: String,
    pub result: Option<Value>,
    pub error: Option<ItemError>,
}

type ResultTuple = (String, String, Option<Value>, Option<ItemError>);

impl ResultItem {
    pub fn success(id: String, route: String, result: Value) -> Self {
        Self {
            id,
            route,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: String, route: String, error: ItemError) -> Self {
        Self {
            id,
            route,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl From<ResultItem> for ResultTuple {
    fn from(item: ResultItem) -> Self {
        (item.id, item.route, item.result, item.error)
    }
}

impl From<ResultTuple> for ResultItem {
    fn from((id, route, result, error): ResultTuple) -> Self {
        Self { id, route, result, error }
    }
}

/// One outbound call, as sent by the client: `[id, route, body, headers]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CallTuple", from = "CallTuple")]
pub struct CallItem {
    pub id: String,
    pub route: String,
    pub body: Option<Value>,
    pub headers: Option<Value>,
}

type CallTuple = (String, String, Option<Value>, Option<Value>);

impl From<CallItem> for CallTuple {
    fn from(call: CallItem) -> Self {
        (call.id, call.route, call.body, call.headers)
    }
}

impl From<CallTuple> for CallItem {
    fn from((id, route, body, headers): CallTuple) -> Self {
        Self { id, route, body, headers }
    }
}

/// Check the shape of an inbound batch without keeping the parsed items.
pub fn validate_batch_shape(batch: &Value) -> Result<(), BatchError> {
    parse_batch(batch).map(|_| ())
}

/// Validate an inbound batch and parse its items.
///
/// The first violation rejects the whole batch.
pub fn parse_batch(batch: &Value) -> Result<Vec<BatchItem>, BatchError> {
    let Value::Array(raw_items) = batch else {
        return Err(BatchError::bad_request("Request should be an array"));
    };

    let mut seen = HashSet::with_capacity(raw_items.len());
    let mut items = Vec::with_capacity(raw_items.len());
    for raw in raw_items {
        let item = parse_item(raw)?;
        if !seen.insert(item.id.clone()) {
            return Err(BatchError::bad_request("Request items should have unique IDs"));
        }
        items.push(item);
    }

    Ok(items)
}

fn parse_item(raw: &Value) -> Result<BatchItem, BatchError> {
    let Value::Array(slots) = raw else {
        return Err(BatchError::bad_request("Request item should be an array"));
    };

    let id = match slots.first() {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => return Err(BatchError::bad_request("Request item should have an ID")),
    };

    let route = match slots.get(1) {
        Some(Value::String(route)) if !route.is_empty() => route.clone(),
        _ => return Err(BatchError::bad_request("Request item should have a route")),
    };

    if slots.len() > 4 {
        return Err(BatchError::bad_request("Request item should have at most four elements"));
    }

    validate_route_name(&route, false)
        .map_err(|err| BatchError::bad_request(format!("Request item route is invalid: {err}")))?;

    let body = match slots.get(2) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(body)) => body.clone(),
        Some(_) => return Err(BatchError::bad_request("Request item body should be an object")),
    };

    let (headers, selector) = match slots.get(3) {
        None | Some(Value::Null) => (None, None),
        Some(selector @ Value::Array(_)) => (None, Some(selector.clone())),
        Some(Value::Object(headers)) => {
            let selector = headers.get(SELECTOR_KEY).filter(|s| s.is_array()).cloned();
            (Some(headers.clone()), selector)
        }
        Some(_) => {
            return Err(BatchError::bad_request(
                "Request item headers should be an object or a selector array",
            ))
        }
    };

    Ok(BatchItem {
        id,
        route,
        body,
        headers,
        selector,
    })
}
