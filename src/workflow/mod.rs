// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Downstream workflow service integration

pub mod client;

pub use client::{WorkflowClient, WorkflowError};
