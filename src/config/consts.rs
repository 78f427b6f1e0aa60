// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Schema version written by export and required by parse
pub const CONFIG_SCHEMA_VERSION: &str = "1";
/// Revision of the empty configuration an engine starts with
pub const INITIAL_REVISION: u64 = 0;
/// Default buffer size of the engine event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
