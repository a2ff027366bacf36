// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Placeholder covers for uploads whose first page cannot be used.

pub mod fallback;

pub use fallback::FallbackCoverGenerator;
