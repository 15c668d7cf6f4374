// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use recad_core::RecadError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Fixed learning rates of the `type2` step schedule, keyed by epoch.
const TYPE2_STEPS: [(usize, f64); 7] = [
    (2, 5e-5),
    (4, 1e-5),
    (6, 5e-6),
    (8, 1e-6),
    (10, 5e-7),
    (15, 1e-7),
    (20, 5e-8),
];

/// Per-epoch learning-rate adjustment applied after each completed epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LrSchedule {
    /// Halve every epoch.
    #[default]
    Type1,
    /// Fixed step table.
    Type2,
    /// Hold for two epochs, then decay by 0.9 per epoch.
    Type3,
    /// Half-cosine from the base rate to zero over `train_epochs`.
    Cosine,
    Constant,
}

impl LrSchedule {
    /// Learning rate to use after finishing `epoch` (1-based), or `None` when
    /// the schedule leaves the rate unchanged.
    pub fn learning_rate(self, base: f64, epoch: usize, train_epochs: usize) -> Option<f64> {
        match self {
            Self::Type1 => Some(base * 0.5f64.powi(exponent(epoch.saturating_sub(1)))),
            Self::Type2 => TYPE2_STEPS
                .iter()
                .find(|(step, _)| *step == epoch)
                .map(|(_, lr)| *lr),
            Self::Type3 => Some(if epoch < 3 {
                base
            } else {
                base * 0.9f64.powi(exponent(epoch - 3))
            }),
            Self::Cosine => {
                let progress = epoch as f64 / train_epochs.max(1) as f64;
                Some(base / 2.0 * (1.0 + (progress * PI).cos()))
            }
            Self::Constant => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Type1 => "type1",
            Self::Type2 => "type2",
            Self::Type3 => "type3",
            Self::Cosine => "cosine",
            Self::Constant => "constant",
        }
    }
}

fn exponent(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl fmt::Display for LrSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LrSchedule {
    type Err = RecadError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "type1" => Ok(Self::Type1),
            "type2" => Ok(Self::Type2),
            "type3" => Ok(Self::Type3),
            "cosine" => Ok(Self::Cosine),
            "constant" => Ok(Self::Constant),
            _ => Err(RecadError::invalid_input(format!(
                "invalid lradj '{raw}'; expected one of: type1, type2, type3, cosine, constant"
            ))),
        }
    }
}
