// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The command/event dispatch engine: worker pool, handlers, session
//! registry, rate limiter, metrics, and the three background tasks that
//! keep state durable and containers accounted for.

pub mod config;
pub mod engine;
pub mod handlers;
pub mod metrics;
pub mod rate_limiter;
pub mod registry;

pub use config::EngineConfig;
pub use engine::{Engine, EventEmitter, EventSink};
pub use handlers::EngineState;
pub use metrics::{DurationStats, MetricsSink, MetricsSnapshot};
pub use rate_limiter::LruRateLimiter;
pub use registry::SessionRegistry;
