//! Request handlers, one module per pipeline step.

pub mod download;
pub mod files;
pub mod pages;
pub mod process;
pub mod upload;

use std::future::Future;

use serde::Deserialize;
use vidtally_core::run::RunId;

use crate::error::{AppError, AppResult};

/// `?run=<uuid>`; the latest run is targeted when absent.
#[derive(Debug, Default, Deserialize)]
pub struct RunQuery {
    pub run: Option<String>,
}

impl RunQuery {
    pub fn run_id(&self) -> AppResult<Option<RunId>> {
        match self.run.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(raw.parse()?)),
        }
    }
}

/// Local calendar date used to name the tally report.
pub(crate) fn report_date() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Drive a stage on its own task and wait for it.
///
/// The stage future owns the run's guard. If the request is dropped (client
/// gone, request timeout) the stage still finishes and records its outcome,
/// and the run stays locked until it has.
pub(crate) async fn run_detached<T, F>(stage: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(stage)
        .await
        .map_err(|e| AppError::InternalError(format!("Stage task failed: {e}")))?
}
