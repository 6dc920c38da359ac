/*!
# Tracker Client

Client side of the Fire and Gas Tracker Bot: pick spreadsheets, send them with a tracker file
to the processing service, and save the processed tracker it sends back.

## Overview

The main screen offers two forms, each opened in a popup over a dimmed backdrop:

- **Latest** - one input file plus the tracker, posted to `process_latest`, saved as
  `updated_latest_tracker.xlsx`
- **Backlog** - any number of input files plus the tracker, posted to `process_backlog`, saved as
  `processed_tracker.xlsx`

## Architecture

### Overlay Layer
- **placement**: pure resolver from a placement and anchor geometry to a position style
- **portal**: attachment containers, created once per id and shared by every overlay
- **overlay**: mounts a background layer and floating container, repositions on resize and
  capture-phase scroll, dismisses on outside clicks, releases its listeners on drop
- **headless** / **dom**: the in-memory document and the browser (`web` feature) hosts

### Workflow Layer
- **selection**: per-form file lists and single-file slots
- **workflow**: validation, submission, status mapping and delivery of the result
- **transport**: multipart request model and the HTTP transport
- **download**: save sinks (directory on disk, Blob download in the browser)
- **screen**: which forms are open, menu cards and popup presets

### Support
- **config**: API base URL and download directory from the environment
- **error**: error types and the fixed user-facing messages

## Errors

Missing files, non-success statuses and transport failures all end at the workflow
controller as one short message on the form. Raw status text and transport errors only go to
the log.
*/

pub mod config;
pub mod download;
pub mod error;
pub mod headless;
pub mod overlay;
pub mod placement;
pub mod portal;
pub mod screen;
pub mod selection;
pub mod transport;
pub mod workflow;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod dom;

/// Re-export everything from these modules to make it easier to use
pub use config::*;
pub use download::*;
pub use error::*;
pub use overlay::*;
pub use placement::*;
pub use portal::*;
pub use screen::*;
pub use selection::*;
pub use transport::*;
pub use workflow::*;
