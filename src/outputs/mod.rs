//! Output generation for the briefing document.
//!
//! # Submodules
//!
//! - [`html`]: renders a [`Report`](crate::models::Report) into the HTML page
//! - [`json`]: writes the same report as JSON for other consumers
//!
//! Both writers replace the target file in full on every run.

pub mod html;
pub mod json;
