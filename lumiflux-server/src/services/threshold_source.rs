use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use lumiflux_analyser::OverloadReading;
use serde::{Deserialize, Serialize};

use crate::configs::{CellRef, Layout, Source};
use crate::errors::SourceError;

/// Raw content of one cell of the external table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numbers pass through; text is trimmed and accepts a decimal comma.
    pub fn as_number(&self) -> Option<f64> {
        let value: Option<f64> = match self {
            CellValue::Number(value) => Some(*value),
            CellValue::Text(text) => text.trim().replace(',', ".").parse().ok(),
        };

        value.filter(|value| value.is_finite())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

#[async_trait]
pub trait ThresholdSource: Send + Sync {
    async fn fetch_cell(&self, row: u32, col: u32) -> Result<CellValue, SourceError>;
}

#[derive(Deserialize)]
struct CellBody {
    value: CellValue,
}

/// Reads cells from a tabular HTTP endpoint at `{url}/cells/{row}/{col}`.
pub struct HttpThresholdSource {
    client: reqwest::Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpThresholdSource {
    pub fn new(source: &Source) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(source.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: source.url.trim_end_matches('/').to_string(),
            username: source.username.clone(),
            password: source.password.clone(),
        })
    }
}

#[async_trait]
impl ThresholdSource for HttpThresholdSource {
    async fn fetch_cell(&self, row: u32, col: u32) -> Result<CellValue, SourceError> {
        let mut request = self.client.get(format!("{}/cells/{}/{}", self.url, row, col));
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { row, col, status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        let body: CellBody = serde_json::from_slice(&bytes).map_err(|e| SourceError::Malformed {
            row,
            col,
            reason: e.to_string(),
        })?;

        Ok(body.value)
    }
}

/// Thresholds for one device as read during one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRow {
    pub par_value: f64,
    pub limits: [f64; 5],
}

/// Memoizes cells for the lifetime of one control iteration.
pub struct IterationCells<'a> {
    source: &'a dyn ThresholdSource,
    cells: HashMap<(u32, u32), CellValue>,
}

impl<'a> IterationCells<'a> {
    pub fn new(source: &'a dyn ThresholdSource) -> Self {
        Self {
            source,
            cells: HashMap::new(),
        }
    }

    pub async fn cell(&mut self, row: u32, col: u32) -> Result<CellValue, SourceError> {
        if let Some(value) = self.cells.get(&(row, col)) {
            return Ok(value.clone());
        }

        let value = self.source.fetch_cell(row, col).await?;
        self.cells.insert((row, col), value.clone());

        Ok(value)
    }

    pub async fn number(&mut self, row: u32, col: u32) -> Result<f64, SourceError> {
        let value = self.cell(row, col).await?;

        value.as_number().ok_or_else(|| SourceError::NotNumeric {
            row,
            col,
            value: match value {
                CellValue::Number(number) => number.to_string(),
                CellValue::Text(text) => text,
            },
        })
    }

    async fn at(&mut self, cell: CellRef) -> Result<f64, SourceError> {
        self.number(cell.row, cell.col).await
    }

    pub async fn overload(&mut self, layout: &Layout) -> Result<OverloadReading, SourceError> {
        Ok(OverloadReading {
            import_value: self.at(layout.import_value).await?,
            import_limit: self.at(layout.import_limit).await?,
            export_value: self.at(layout.export_value).await?,
            export_limit: self.at(layout.export_limit).await?,
        })
    }

    /// Expects `layout.limit_columns` to hold exactly five columns, as settings
    /// validation guarantees.
    pub async fn threshold_row(&mut self, layout: &Layout, row: u32) -> Result<ThresholdRow, SourceError> {
        let par_value = self.number(row, layout.par_column).await?;

        let mut limits = [0.0; 5];
        for (limit, col) in limits.iter_mut().zip(layout.limit_columns.iter()) {
            *limit = self.number(row, *col).await?;
        }

        Ok(ThresholdRow { par_value, limits })
    }
}
