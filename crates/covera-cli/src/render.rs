//! Terminal renderer
//!
//! Prints flow events as they are published. Prompts are handled by the
//! command driver; this sink only reports.

use covera_core::effects::{ChainSpec, Renderer};
use covera_core::flow::{AttemptState, FlowEvent, MethodChoice};

pub struct TerminalRenderer {
    chain: ChainSpec,
}

impl TerminalRenderer {
    pub fn new(chain: ChainSpec) -> Self {
        Self { chain }
    }

    fn state_line(state: AttemptState) -> &'static str {
        match state {
            AttemptState::Created => "Preparing",
            AttemptState::AwaitingMethodChoice => "Choose a payment method",
            AttemptState::AwaitingSigning => "Waiting for signature",
            AttemptState::Submitted => "Submitted",
            AttemptState::AwaitingConfirmation => "Waiting for confirmation",
            AttemptState::Settling => "Registering with the backend",
            AttemptState::Succeeded => "Succeeded",
            AttemptState::Cancelled => "Cancelled",
            AttemptState::Failed => "Failed",
        }
    }
}

impl Renderer for TerminalRenderer {
    fn on_event(&self, event: &FlowEvent) {
        match event {
            FlowEvent::StateChanged { state, detail, .. } => match detail {
                Some(detail) => println!("[{}] {detail}", Self::state_line(*state)),
                None => println!("[{}]", Self::state_line(*state)),
            },
            FlowEvent::ChoiceRequested { request, .. } => {
                let options: Vec<&str> = request
                    .options
                    .iter()
                    .map(|choice| match choice {
                        MethodChoice::Wallet => "wallet",
                        MethodChoice::Manual => "manual transfer",
                        MethodChoice::Decline => "cancel",
                    })
                    .collect();
                println!(
                    "{} for ${} USDC can be paid by {}",
                    request.product,
                    request.price,
                    options.join(" or ")
                );
            }
            FlowEvent::ManualPaymentRequested { request, .. } => {
                println!("Send {} to {}", request.amount_label, request.pay_to);
                println!("  network: {} (chain {})", self.chain.chain_name, request.chain_id);
                println!("  QR:      {}", request.qr_payload);
            }
            FlowEvent::ManualPollNegative { polls, .. } => {
                println!("Payment not seen yet (check {polls}); try again in a moment.");
            }
            FlowEvent::Narration { line, .. } => println!("  > {line}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_has_a_label() {
        for state in [
            AttemptState::Created,
            AttemptState::AwaitingMethodChoice,
            AttemptState::AwaitingSigning,
            AttemptState::Submitted,
            AttemptState::AwaitingConfirmation,
            AttemptState::Settling,
            AttemptState::Succeeded,
            AttemptState::Cancelled,
            AttemptState::Failed,
        ] {
            assert!(!TerminalRenderer::state_line(state).is_empty());
        }
    }
}
