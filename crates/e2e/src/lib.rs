//! pagecheck E2E Assertion Runner
//!
//! This crate drives a real browser through declarative route catalogs:
//! - Navigates to each route of a catalog on one page session
//! - Evaluates element rules against the live page with bounded retry
//! - Collects uncaught page errors per navigation
//! - Aggregates per-rule observations into ordered reports
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Suite (workers = N)                                        │
//! │    └── per catalog: DriverFactory::open() -> PageDriver     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AssertionRunner (one session, routes in declared order)    │
//! │    Pending -> Navigating -> Evaluating -> Passed | Failed   │
//! │      ├── navigate(path)   retried once with backoff         │
//! │      ├── title            matched against TitlePattern      │
//! │      ├── rules            locate + check, polled to timeout │
//! │      └── collect_errors() when the route opts in            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver                                                 │
//! │    ├── PlaywrightDriver   node sidecar, JSON lines          │
//! │    └── MemoryDriver       scripted pages for tests          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod server;
pub mod suite;
pub mod testing;

pub use driver::{DriverFactory, NodeHandle, PageDriver, RuntimeErrorLog};
pub use error::{DriverError, E2eError, E2eResult};
pub use report::{FailureKind, Observation, Report, RouteReport, RouteState, RuleOutcome, SuiteReport};
pub use runner::{AssertionRunner, RunnerSettings};
pub use suite::Suite;
