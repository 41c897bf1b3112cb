//! Pure pipeline stages.
//!
//! Each submodule implements exactly one transformation step and performs
//! no I/O. The coordinators in [`crate::convert`] and [`crate::refresh`]
//! fetch inputs, call these stages, and persist their outputs.
//!
//! ## Data Flow
//!
//! ```text
//! conversion:   Presentation ──▶ extract ──▶ render ──▶ PDF bytes
//!                                (records)   (lopdf)
//!
//! aggregation:  metadata records ──▶ aggregate ──▶ dashboard ──▶ HTML
//!                                    (snapshot)    (askama)
//! ```
//!
//! 1. [`extract`]: slide titles and paragraph lines from the parsed deck
//! 2. [`render`]: paginated Letter-size report; CPU-bound, so the
//!    coordinator runs it in `spawn_blocking`
//! 3. [`aggregate`]: totals and ordering over every readable record
//! 4. [`dashboard`]: the HTML page, escaped by the template engine

pub mod aggregate;
pub mod dashboard;
pub mod extract;
pub mod fonts;
pub mod render;
