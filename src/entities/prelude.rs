pub use super::action::Entity as Action;
pub use super::applied_event::Entity as AppliedEvent;
pub use super::block::Entity as Block;
pub use super::currency_track::Entity as CurrencyTrack;
pub use super::deposit::Entity as Deposit;
pub use super::deposit_delta::Entity as DepositDelta;
pub use super::intent::Entity as Intent;
pub use super::participant::Entity as Participant;
pub use super::payee_details::Entity as PayeeDetails;
pub use super::payment_verifier::Entity as PaymentVerifier;
pub use super::rate_version::Entity as RateVersion;
pub use super::stat::Entity as Stat;
pub use super::transaction::Entity as Transaction;
pub use super::verifier_track::Entity as VerifierTrack;
