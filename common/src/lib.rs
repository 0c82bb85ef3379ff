// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Shared task types and the recurring-task scheduling engine.
//!
//! Everything in this crate is pure: no I/O, no shared state. The server
//! crate owns persistence and decides when the engine runs.

pub mod recurrence;
mod task;

pub use task::{
    CompleteTaskResponse, CreateTaskPayload, NewTask, Task, TaskStatus, UpdatePriorityPayload,
    UpdateTaskPayload,
};
