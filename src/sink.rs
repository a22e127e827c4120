// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error sinks for recoverable per-element failures

use crate::error::ExchangeError;
use parking_lot::Mutex;

/// Receives errors that must not be swallowed but must not stop evaluation
pub trait ErrorSink: Send + Sync {
    /// Report one error
    fn report(&self, error: ExchangeError);
}

/// Sink that logs every error at `error` level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, error: ExchangeError) {
        log::error!("{error}");
    }
}

/// Sink that keeps every error for later inspection
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    errors: Mutex<Vec<ExchangeError>>,
}

impl CollectingErrorSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors reported so far
    pub fn errors(&self) -> Vec<ExchangeError> {
        self.errors.lock().clone()
    }

    /// Remove and return the errors reported so far
    pub fn take(&self) -> Vec<ExchangeError> {
        std::mem::take(&mut *self.errors.lock())
    }

    /// Number of errors reported so far
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    /// Whether nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, error: ExchangeError) {
        self.errors.lock().push(error);
    }
}
