use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::types::RemainderPolicy;

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub receipt: ReceiptConfig,
    pub schedule: ScheduleConfig,
}

/// receipt numbering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// leading label, e.g. "RCPT"
    pub prefix: String,
    /// first sequence number handed out
    pub start_sequence: u64,
    /// zero padding applied to the sequence
    pub sequence_width: usize,
}

/// installment generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// day of month each installment falls due, clamped to the month length
    pub due_day: u32,
    /// which installment absorbs the split remainder
    pub remainder_policy: RemainderPolicy,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            prefix: "RCPT".to_string(),
            start_sequence: 1,
            sequence_width: 6,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            due_day: 10,
            remainder_policy: RemainderPolicy::Last,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl LedgerConfig {
    /// receipts `RCPT-<year>-000001`, installments due on the 10th,
    /// split remainder on the final installment
    pub fn standard() -> Self {
        Self {
            receipt: ReceiptConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }

    /// standard configuration with the split remainder on the first installment
    pub fn remainder_first() -> Self {
        Self {
            schedule: ScheduleConfig {
                remainder_policy: RemainderPolicy::First,
                ..ScheduleConfig::default()
            },
            ..Self::standard()
        }
    }

    /// builder-style override of the receipt prefix
    pub fn with_receipt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.receipt.prefix = prefix.into();
        self
    }

    /// builder-style override of the installment due day
    pub fn with_due_day(mut self, due_day: u32) -> Self {
        self.schedule.due_day = due_day;
        self
    }

    /// parse and validate a json configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json).map_err(|e| {
            LedgerError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.receipt.prefix.trim().is_empty() {
            return Err(LedgerError::InvalidConfiguration {
                message: "receipt prefix must not be empty".to_string(),
            });
        }
        if self.receipt.sequence_width == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "receipt sequence width must be positive".to_string(),
            });
        }
        if !(1..=31).contains(&self.schedule.due_day) {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("due day {} outside 1..=31", self.schedule.due_day),
            });
        }
        Ok(())
    }

    /// render a receipt number for a sequence value
    pub fn format_receipt_number(&self, year: i32, sequence: u64) -> String {
        format!(
            "{}-{}-{:0width$}",
            self.receipt.prefix,
            year,
            sequence,
            width = self.receipt.sequence_width
        )
    }
}
