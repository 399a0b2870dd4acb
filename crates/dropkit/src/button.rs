//! Mint button view model

use std::fmt;

use crate::clock::Countdown;
use crate::controller::MintUiState;

/// What the primary action button shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonLabel {
    /// Nothing left to mint
    SoldOut,
    /// Sale not open yet
    Countdown(Countdown),
    /// Ready
    Mint,
    /// Mint in flight
    Spinner,
}

impl fmt::Display for ButtonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonLabel::SoldOut => write!(f, "SOLD OUT"),
            ButtonLabel::Countdown(countdown) => write!(f, "{countdown}"),
            ButtonLabel::Mint => write!(f, "MINT"),
            ButtonLabel::Spinner => write!(f, "..."),
        }
    }
}

/// Label and enabled state of the mint button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintButtonView {
    /// Label
    pub label: ButtonLabel,
    /// Clicks are ignored
    pub disabled: bool,
}

impl MintButtonView {
    /// Derive the button from the UI flags and the countdown to the sale start
    pub fn from_state(state: &MintUiState, countdown: Countdown) -> Self {
        let label = if state.is_sold_out {
            ButtonLabel::SoldOut
        } else if state.is_active {
            if state.is_minting {
                ButtonLabel::Spinner
            } else {
                ButtonLabel::Mint
            }
        } else {
            ButtonLabel::Countdown(countdown)
        };

        Self {
            label,
            disabled: is_mint_disabled(state),
        }
    }
}

/// The button is disabled whenever the sale is sold out, minting or not active
pub fn is_mint_disabled(state: &MintUiState) -> bool {
    state.is_sold_out || state.is_minting || !state.is_active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(is_active: bool, is_sold_out: bool, is_minting: bool) -> MintUiState {
        MintUiState {
            is_active,
            is_sold_out,
            is_minting,
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_for_all_flag_combinations() {
        for is_active in [false, true] {
            for is_sold_out in [false, true] {
                for is_minting in [false, true] {
                    let view = MintButtonView::from_state(
                        &state(is_active, is_sold_out, is_minting),
                        Countdown::between(0, 0),
                    );
                    assert_eq!(
                        view.disabled,
                        is_sold_out || is_minting || !is_active,
                        "active={is_active} sold_out={is_sold_out} minting={is_minting}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_label_precedence() {
        let countdown = Countdown::between(0, 1_000);

        let view = MintButtonView::from_state(&state(false, true, false), countdown);
        assert_eq!(view.label, ButtonLabel::SoldOut);
        assert_eq!(view.label.to_string(), "SOLD OUT");

        let view = MintButtonView::from_state(&state(false, false, false), countdown);
        assert_eq!(view.label, ButtonLabel::Countdown(countdown));
        assert_eq!(view.label.to_string(), "0 hours, 0 minutes, 1 seconds");

        let view = MintButtonView::from_state(&state(true, false, false), countdown);
        assert_eq!(view.label, ButtonLabel::Mint);
        assert!(!view.disabled);

        let view = MintButtonView::from_state(&state(true, false, true), countdown);
        assert_eq!(view.label, ButtonLabel::Spinner);
        assert!(view.disabled);
    }
}
