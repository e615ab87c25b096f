use super::types::RealizedEvent;
use crate::config::LedgerConfig;
use serde::{Deserialize, Serialize};

/// Short/long-term totals with an illustrative tax estimate.
/// Rates come from `LedgerConfig` and are not tax advice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub short_term_gain: f64,
    pub short_term_loss: f64,
    pub long_term_gain: f64,
    pub long_term_loss: f64,
    pub event_count: usize,
    pub estimated_tax_usd: f64,
}

impl TaxSummary {
    pub fn from_events(events: &[RealizedEvent], config: &LedgerConfig) -> Self {
        let mut summary = Self {
            event_count: events.len(),
            ..Self::default()
        };

        for event in events {
            let (gain, loss) = if event.is_long_term {
                (&mut summary.long_term_gain, &mut summary.long_term_loss)
            } else {
                (&mut summary.short_term_gain, &mut summary.short_term_loss)
            };
            if event.gain_loss_usd >= 0.0 {
                *gain += event.gain_loss_usd;
            } else {
                *loss += -event.gain_loss_usd;
            }
        }

        summary.estimated_tax_usd = summary.net_short_term().max(0.0) * config.short_term_rate
            + summary.net_long_term().max(0.0) * config.long_term_rate;
        summary
    }

    pub fn net_short_term(&self) -> f64 {
        self.short_term_gain - self.short_term_loss
    }

    pub fn net_long_term(&self) -> f64 {
        self.long_term_gain - self.long_term_loss
    }

    pub fn net(&self) -> f64 {
        self.net_short_term() + self.net_long_term()
    }
}
