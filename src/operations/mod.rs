//
//  aem-cli
//  operations/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Operations
//!
//! Orchestration on top of the transport.
//!
//! - [`bulk`]: run many independent requests with bounded concurrency
//! - [`poller`]: start a server-side job and poll it to completion
//!
//! Both are generic over the work they drive. The bulk executor accepts any
//! future; the poller talks to anything implementing [`JobApi`], which
//! [`AemClient`](crate::api::AemClient) does.

pub mod bulk;
pub mod poller;

pub use bulk::{
    BulkError, BulkExecutor, BulkOperation, BulkResult, BulkResultHandler, BulkStatistics,
    ExecutorConfig, OperationError,
};
pub use poller::{
    field_equals, field_in, AsyncPoller, JobApi, PollCondition, PollError, PollerConfig,
};
