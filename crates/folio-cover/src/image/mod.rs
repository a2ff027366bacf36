// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — watermark suppression filters and raster encoding.

pub mod codec;
pub mod watermark;

pub use watermark::WatermarkProcessor;
