//! Batch execution.
//!
//! # Responsibilities
//! - Validate the inbound batch (`Received → Validated` or `Rejected`)
//! - Resolve every item to a chain; unknown routes get the not-found chain
//! - Run every item as its own task with its own context (`Dispatching`)
//! - Bound each chain by its route timeout
//! - Collect results in input order and apply selectors (`Aggregating → Done`)
//!
//! # Design Decisions
//! - Item failures are values, never aborts: one tuple per input item
//! - A timed-out chain future is dropped, so it cannot report anything later
//! - Panicking handlers surface as internal errors through the join handle

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::dispatch::batch::{parse_batch, BatchItem, ResultItem};
use crate::dispatch::context::Context;
use crate::dispatch::error::{is_production, BatchError, ChainError, ItemError};
use crate::observability::metrics;
use crate::projection::project;
use crate::routing::handler::{not_found, HandlerChain};
use crate::routing::registry::Router;

/// What one item will run.
struct Plan {
    chain: HandlerChain,
    timeout: Option<Duration>,
    expose_stack: bool,
}

impl Router {
    /// Dispatch a batch.
    ///
    /// `context` is the caller's base context; every item receives its own
    /// copy, enriched with the call metadata. Returns one result per item in
    /// input order, or a batch error if the batch is malformed.
    pub async fn handle(&self, batch: &Value, context: &Map<String, Value>) -> Result<Vec<ResultItem>, BatchError> {
        let started = Instant::now();
        let items = match parse_batch(batch) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(error = %err, "Rejected batch");
                metrics::record_batch("rejected", 0, started);
                return Err(err);
            }
        };

        let batch_id = Uuid::new_v4().to_string();
        tracing::debug!(batch_id = %batch_id, items = items.len(), "Dispatching batch");

        let tasks: Vec<(String, String, JoinHandle<ResultItem>)> = items
            .into_iter()
            .map(|item| {
                let plan = self.plan(&item.route);
                let context = Context::for_item(context, &batch_id, &item);
                let (id, route) = (item.id.clone(), item.route.clone());
                (id, route, tokio::spawn(execute(plan, item, context)))
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (id, route, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(err) => {
                    let err = ChainError::Aborted(err.to_string());
                    tracing::error!(batch_id = %batch_id, id = %id, route = %route, error = %err, "Route task failed");
                    metrics::record_item(&route, 500, started);
                    ResultItem::failure(id, route, err.into_item_error(false))
                }
            };
            results.push(result);
        }

        tracing::debug!(
            batch_id = %batch_id,
            items = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch complete"
        );
        metrics::record_batch("completed", results.len(), started);
        Ok(results)
    }

    fn plan(&self, route: &str) -> Plan {
        let expose_stack = self.options.expose_stack.unwrap_or_else(|| !is_production());
        match self.routes.get(route) {
            Some(entry) => Plan {
                chain: entry.chain.clone(),
                timeout: Some(entry.timeout.unwrap_or_else(|| self.default_timeout())),
                expose_stack,
            },
            None => Plan {
                chain: HandlerChain::from(not_found()),
                timeout: None,
                expose_stack,
            },
        }
    }
}

async fn execute(plan: Plan, item: BatchItem, context: Context) -> ResultItem {
    let started = Instant::now();
    let BatchItem {
        id,
        route,
        body,
        selector,
        ..
    } = item;
    let body = Value::Object(body);

    let outcome = match plan.timeout.filter(|limit| !limit.is_zero()) {
        Some(limit) => tokio::time::timeout(limit, run_chain(&plan.chain, body, context))
            .await
            .unwrap_or(Err(ChainError::TimedOut(limit))),
        None => run_chain(&plan.chain, body, context).await,
    };

    match outcome {
        Ok(result) => {
            let result = match &selector {
                Some(selector) => project(&result, selector),
                None => result,
            };
            metrics::record_item(&route, 200, started);
            ResultItem::success(id, route, result)
        }
        Err(err) => {
            match &err {
                ChainError::Handler(handler_err) if handler_err.status < 500 => {
                    tracing::debug!(id = %id, route = %route, status = handler_err.status, error = %err, "Route failed");
                }
                _ => tracing::warn!(id = %id, route = %route, error = %err, "Route failed"),
            }
            let error: ItemError = err.into_item_error(plan.expose_stack);
            metrics::record_item(&route, error.status, started);
            ResultItem::failure(id, route, error)
        }
    }
}

/// Run every handler of `chain` in order and pick the single result.
pub(crate) async fn run_chain(chain: &HandlerChain, body: Value, context: Context) -> Result<Value, ChainError> {
    let mut result: Option<Value> = None;

    for handler in chain.iter() {
        match handler.call(body.clone(), context.clone()).await {
            Ok(None) | Ok(Some(Value::Null)) => {}
            Ok(Some(value)) => {
                if result.is_some() {
                    return Err(ChainError::Conflict);
                }
                result = Some(value);
            }
            Err(err) => return Err(ChainError::Handler(err)),
        }
    }

    match result {
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(ChainError::NotAnObject),
        None => Err(ChainError::NoResult),
    }
}
