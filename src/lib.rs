//! A client for Apache Livy, the REST gateway for Apache Spark.
//!
//! The crate drives the full lifecycle of a remote Spark session: start (or
//! resume) a session, submit code, poll statements until their output is
//! attached, and decode the result into a [`DataFrame`].
//!
//! ```rust,no_run
//! use livy_client::{LivySession, SessionKind};
//!
//! # async fn example() -> livy_client::Result<()> {
//! let mut session = LivySession::builder("http://livy:8998", SessionKind::PySpark)
//!     .executor_memory("2g")
//!     .build();
//! session.start().await?;
//! session.run("df = spark.read.json('s3://bucket/data')").await?;
//! let frame = session.read("df").await?;
//! println!("{} rows, columns {:?}", frame.len(), frame.columns());
//! session.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! Waiting is sleep-then-poll against a [`PollSchedule`]: a short ramp-up
//! burst, then a constant interval, unbounded by default. Configure a
//! ceiling to surface [`LivyError::PollTimeout`] instead of blocking
//! indefinitely.

pub mod api;
pub mod client;
pub mod dataframe;
pub mod error;
pub mod models;
pub mod polling;
pub mod session;

pub use api::LivyApi;
pub use client::{Auth, LivyClient, LivyClientBuilder};
pub use dataframe::DataFrame;
pub use error::{LivyError, Result};
pub use models::{
    CreateSessionRequest, LivyVersion, Output, OutputStatus, Session, SessionKind, SessionState,
    Statement, StatementKind, StatementState,
};
pub use polling::{PollSchedule, PollingIntervals};
pub use session::{LivySession, LivySessionBuilder};
