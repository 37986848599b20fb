// SPDX-License-Identifier: Apache-2.0
//! Shared application services for Linkscope tools.
//! Keeps the dashboard controller thin and storage-agnostic.

pub mod settings;
