//! Donation Session Controller
//!
//! State machine behind the donation modal:
//!
//! ```text
//!   Idle ──open──▶ Initializing ──ready──▶ Open ◀──select──┐
//!    ▲                                       │  └──────────┘
//!    │                                    submit
//!    │                                       ▼
//!    │                              Validating ──invalid──▶ Open
//!    │                                       │
//!    │                                     valid
//!    │                                       ▼
//!    │                              Submitting ──backend error──▶ Failed ──dismiss──▶ Open
//!    │                                       │                      ▲
//!    │                                  client secret               │
//!    │                                       ▼                      │
//!    │                        AwaitingConfirmation ──declined───────┘
//!    │                                       │
//!    │                                   succeeded
//!    │                                       ▼
//!    └──────── close (any state) ─────── Succeeded ──(auto close after delay)
//! ```
//!
//! The session is a cheap-to-clone handle over single-threaded shared state.
//! No internal borrow is held across an await, so UI events (close, card
//! changes) can land while a submission is suspended. Every close advances an
//! epoch; async continuations started under an older epoch drop their
//! results instead of touching the fresh session.

use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::{self, Either};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::backend::DonationBackend;
use crate::clock::Clock;
use crate::config::DonateConfig;
use crate::error::{DonateError, Result};
use crate::model::{parse_custom_amount, AmountChoice, DonorField, Frequency, SessionStatus};
use crate::provider::{
    CardChange, CardInputHandle, ConfirmDetails, PaymentProvider, PaymentResult, ProviderLoader,
};
use crate::validate::{validate_donor, ValidationReport};
use crate::view::ModalView;
use crate::wire::{ClientSecret, DonationRequest, IdempotencyKey};

/// Receives a fresh snapshot after every state change
pub type ViewObserver = Rc<dyn Fn(&ModalView)>;

/// Why a submit request did nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Another submission is between validation and settlement
    InFlight,

    /// Modal is not open (idle, still initializing, or already succeeded)
    NotOpen,

    /// Payment provider or card input unavailable
    SubmitDisabled,
}

/// Result of one submit request
#[derive(Debug)]
pub enum SubmitOutcome {
    Ignored(IgnoreReason),

    /// Local validation failed; nothing was sent
    Invalid(ValidationReport),

    Succeeded(PaymentResult),

    /// Backend or provider failure; the session is resubmittable
    Failed(DonateError),

    /// The modal was closed while the submission was suspended
    Abandoned,
}

impl SubmitOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

struct State {
    view: ModalView,
    provider: Option<Rc<dyn PaymentProvider>>,
    card: Option<CardInputHandle>,
    card_mounted: bool,
    epoch: u64,
}

struct Inner {
    config: DonateConfig,
    loader: Rc<dyn ProviderLoader>,
    backend: Rc<dyn DonationBackend>,
    clock: Rc<dyn Clock>,
    state: RefCell<State>,
    observer: RefCell<Option<ViewObserver>>,
}

/// Everything a validated submission needs once the borrow is released
struct Prepared {
    provider: Rc<dyn PaymentProvider>,
    request: DonationRequest,
    key: IdempotencyKey,
    details: ConfirmDetails,
    epoch: u64,
}

/// Handle to the page's donation session
#[derive(Clone)]
pub struct DonationSession {
    inner: Rc<Inner>,
}

impl DonationSession {
    /// Create an idle session
    pub fn new(
        config: DonateConfig,
        loader: Rc<dyn ProviderLoader>,
        backend: Rc<dyn DonationBackend>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let view = ModalView::closed(&config);
        Ok(Self {
            inner: Rc::new(Inner {
                config,
                loader,
                backend,
                clock,
                state: RefCell::new(State {
                    view,
                    provider: None,
                    card: None,
                    card_mounted: false,
                    epoch: 0,
                }),
                observer: RefCell::new(None),
            }),
        })
    }

    /// Register the render callback; it immediately receives the current view
    pub fn set_observer(&self, observer: impl Fn(&ModalView) + 'static) {
        let observer: ViewObserver = Rc::new(observer);
        *self.inner.observer.borrow_mut() = Some(observer.clone());
        observer(&self.view());
    }

    pub fn config(&self) -> &DonateConfig {
        &self.inner.config
    }

    /// Current render snapshot
    pub fn view(&self) -> ModalView {
        self.inner.state.borrow().view.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().view.status
    }

    /// Amount that would be submitted right now
    pub fn amount(&self) -> Decimal {
        self.inner.state.borrow().view.amount.amount()
    }

    // ========================================================================
    // Open / close
    // ========================================================================

    /// Open the modal, acquiring the provider and mounting the card input on
    /// first use. A provider failure is a warning, not an error: the modal
    /// opens with the submit path disabled.
    pub async fn open(&self) {
        let epoch = {
            let state = self.inner.state.borrow();
            if state.view.status != SessionStatus::Idle {
                debug!(status = ?state.view.status, "Open ignored, session already active");
                return;
            }
            state.epoch
        };

        self.update(|s| {
            s.view.status = SessionStatus::Initializing;
            s.view.visible = true;
            s.view.scroll_locked = true;
            s.view.submit_enabled = false;
        });

        let ready = match self.acquire_provider().await {
            Ok(provider) if !self.is_stale(epoch) => self.ensure_card(&provider),
            Ok(_) => Ok(()),
            Err(err) => Err(err),
        };

        if self.is_stale(epoch) {
            debug!("Modal closed while initializing");
            return;
        }

        let warning = ready.err().map(|err| {
            warn!(error = %err, "Payment provider unavailable, submit disabled");
            err.user_message()
        });

        self.update(|s| {
            s.view.status = SessionStatus::Open;
            s.view.submit_enabled = warning.is_none();
            s.view.warning = warning;
        });
        info!("Donation modal opened");
    }

    /// Close the modal from any state and reset to defaults.
    ///
    /// The card input is cleared, never unmounted.
    pub fn close(&self) {
        let (provider, card, previous) = self.update(|s| {
            let previous = s.view.status;
            s.epoch += 1;
            s.view = ModalView::closed(&self.inner.config);
            let card = if s.card_mounted { s.card.clone() } else { None };
            (s.provider.clone(), card, previous)
        });

        if let (Some(provider), Some(card)) = (provider, card) {
            provider.clear_card_input(&card);
        }
        info!(from = ?previous, "Donation modal closed");
    }

    async fn acquire_provider(&self) -> Result<Rc<dyn PaymentProvider>> {
        let existing = self.inner.state.borrow().provider.clone();
        if let Some(provider) = existing {
            return Ok(provider);
        }

        let loaded = self.inner.loader.load().await?;
        // A concurrent open may have won the race; keep the first capability
        let provider = self
            .inner
            .state
            .borrow_mut()
            .provider
            .get_or_insert(loaded)
            .clone();
        info!(provider = provider.name(), "Payment provider ready");
        Ok(provider)
    }

    /// Create the card input once per page lifetime and mount it if needed
    fn ensure_card(&self, provider: &Rc<dyn PaymentProvider>) -> Result<()> {
        let (card, mounted) = {
            let state = self.inner.state.borrow();
            (state.card.clone(), state.card_mounted)
        };
        if mounted {
            return Ok(());
        }

        let card = match card {
            Some(card) => card,
            None => {
                let card = provider
                    .create_card_input()
                    .map_err(|err| DonateError::CardInput(err.to_string()))?;
                self.inner.state.borrow_mut().card = Some(card.clone());
                card
            }
        };

        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        provider
            .mount_card_input(
                &card,
                &self.inner.config.card_slot,
                Box::new(move |change| {
                    if let Some(inner) = weak.upgrade() {
                        Self { inner }.on_card_change(change);
                    }
                }),
            )
            .map_err(|err| DonateError::CardInput(err.to_string()))?;

        self.inner.state.borrow_mut().card_mounted = true;
        debug!(slot = %self.inner.config.card_slot, "Card input mounted");
        Ok(())
    }

    /// Live validation listener for the card input
    pub fn on_card_change(&self, change: CardChange) {
        self.update(|s| s.view.card_error = change.error);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Select a preset amount; clears the custom field
    pub fn select_amount(&self, value: Decimal) {
        if value <= Decimal::ZERO {
            warn!(%value, "Ignoring non-positive preset amount");
            return;
        }
        self.edit(|s| {
            s.view.amount = AmountChoice::Preset(value);
            s.view.custom_input.clear();
        });
    }

    /// Track the custom amount field. A strictly positive value becomes the
    /// active selection; anything else leaves the selection unchanged.
    pub fn select_custom_amount(&self, raw: &str) {
        let parsed = parse_custom_amount(raw);
        self.edit(|s| {
            s.view.custom_input = raw.to_string();
            if let Some(value) = parsed {
                s.view.amount = AmountChoice::Custom(value);
            }
        });
    }

    pub fn set_frequency(&self, frequency: Frequency) {
        self.edit(|s| s.view.frequency = frequency);
    }

    pub fn set_field(&self, field: DonorField, value: &str) {
        self.edit(|s| s.view.form.set(field, value));
    }

    /// Apply a form edit unless a submission is in flight
    fn edit(&self, f: impl FnOnce(&mut State)) {
        let status = self.status();
        if status.is_in_flight() {
            debug!(?status, "Ignoring edit during submission");
            return;
        }
        self.update(f);
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Validate, create the payment intent, and confirm it with the provider.
    ///
    /// Re-entrant calls while a submission is in flight are ignored.
    pub async fn submit(&self) -> SubmitOutcome {
        let prepared = match self.update(|s| self.prepare(s)) {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };
        let Prepared {
            provider,
            request,
            key,
            details,
            epoch,
        } = prepared;

        info!(
            idempotency_key = %key,
            fund = %request.fund,
            frequency = %request.frequency,
            amount = %request.amount,
            currency = %request.currency,
            "Submitting donation"
        );

        let secret = match self.create_intent(&request, &key).await {
            Ok(secret) => secret,
            Err(err) => return self.settle_failure(epoch, err),
        };

        if self.is_stale(epoch) {
            info!(idempotency_key = %key, "Modal closed before confirmation, dropping client secret");
            return SubmitOutcome::Abandoned;
        }
        self.update(|s| s.view.status = SessionStatus::AwaitingConfirmation);

        let confirmed = provider.confirm_payment(&secret, &details).await;

        match confirmed {
            Ok(result) if self.is_stale(epoch) => {
                info!(
                    idempotency_key = %key,
                    status = result.status.as_str(),
                    "Confirmation finished after the modal was closed"
                );
                SubmitOutcome::Abandoned
            }
            Ok(result) if result.status.is_terminal_success() => self.settle_success(epoch, result),
            Ok(result) => self.settle_failure(
                epoch,
                DonateError::PaymentIncomplete(result.status.as_str().to_string()),
            ),
            Err(err) => self.settle_failure(epoch, err),
        }
    }

    /// Guard, validate and build the request inside one borrow
    fn prepare(&self, s: &mut State) -> std::result::Result<Prepared, SubmitOutcome> {
        let status = s.view.status;
        if status.is_in_flight() {
            debug!(?status, "Submit ignored, submission in flight");
            return Err(SubmitOutcome::Ignored(IgnoreReason::InFlight));
        }
        if !status.is_resubmittable() {
            debug!(?status, "Submit ignored, modal not open");
            return Err(SubmitOutcome::Ignored(IgnoreReason::NotOpen));
        }
        let (Some(provider), Some(card), true) =
            (s.provider.clone(), s.card.clone(), s.view.submit_enabled && s.card_mounted)
        else {
            debug!("Submit ignored, payment provider unavailable");
            return Err(SubmitOutcome::Ignored(IgnoreReason::SubmitDisabled));
        };

        // Submitting from Failed dismisses the previous message
        s.view.failure = None;
        s.view.status = SessionStatus::Validating;

        let report = validate_donor(&s.view.form);
        s.view.field_errors = report;
        if !report.is_valid() {
            s.view.status = SessionStatus::Open;
            debug!(%report, "Donor form invalid");
            return Err(SubmitOutcome::Invalid(report));
        }

        let config = &self.inner.config;
        let amount = s.view.amount.amount();
        let request = if amount > Decimal::ZERO {
            DonationRequest::new(
                &s.view.form,
                s.view.frequency,
                amount,
                &config.currency,
                config.amount_units,
            )
        } else {
            Err(DonateError::Config(format!("amount must be positive, got {amount}")))
        };
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                error!(error = %err, "Could not build donation request");
                apply_failure(s, &err);
                return Err(SubmitOutcome::Failed(err));
            }
        };

        s.view.status = SessionStatus::Submitting;
        s.view.submit_enabled = false;
        s.view.loading = true;

        Ok(Prepared {
            provider,
            details: ConfirmDetails {
                card,
                billing_name: s.view.form.billing_name(),
                billing_email: s.view.form.email.trim().to_string(),
            },
            request,
            key: IdempotencyKey::generate(),
            epoch: s.epoch,
        })
    }

    /// Backend call raced against the request timeout
    async fn create_intent(
        &self,
        request: &DonationRequest,
        key: &IdempotencyKey,
    ) -> Result<ClientSecret> {
        let timeout = self.inner.config.request_timeout;
        let call = self.inner.backend.create_intent(request, key);
        let deadline = self.inner.clock.sleep(timeout);

        let secret = match future::select(call, deadline).await {
            Either::Left((result, _)) => result?,
            Either::Right(((), _)) => return Err(DonateError::Timeout(timeout)),
        };
        if secret.expose().trim().is_empty() {
            return Err(DonateError::MalformedResponse("empty client secret".into()));
        }
        Ok(secret)
    }

    fn settle_success(&self, epoch: u64, result: PaymentResult) -> SubmitOutcome {
        self.update(|s| {
            s.view.status = SessionStatus::Succeeded;
            s.view.loading = false;
            s.view.success_visible = true;
        });
        info!(payment_id = ?result.payment_id, "Donation succeeded");

        let delay = self.inner.config.auto_close_delay;
        let weak = Rc::downgrade(&self.inner);
        self.inner.clock.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Self { inner }.auto_close(epoch);
                }
            }),
        );
        SubmitOutcome::Succeeded(result)
    }

    fn settle_failure(&self, epoch: u64, err: DonateError) -> SubmitOutcome {
        if self.is_stale(epoch) {
            info!(error = %err, "Submission failed after the modal was closed");
            return SubmitOutcome::Abandoned;
        }
        error!(error = %err, retryable = err.is_retryable(), "Donation failed");
        self.update(|s| apply_failure(s, &err));
        SubmitOutcome::Failed(err)
    }

    /// Acknowledge the failure message; the form stays filled in
    pub fn dismiss_failure(&self) {
        self.update(|s| {
            if s.view.status == SessionStatus::Failed {
                s.view.status = SessionStatus::Open;
                s.view.failure = None;
            }
        });
    }

    /// Scheduled close after a success. Only closes the session it was
    /// scheduled for.
    fn auto_close(&self, epoch: u64) {
        let current = {
            let state = self.inner.state.borrow();
            (state.epoch, state.view.status)
        };
        if current == (epoch, SessionStatus::Succeeded) {
            debug!("Auto-closing after success");
            self.close();
        } else {
            debug!("Stale auto close skipped");
        }
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn is_stale(&self, epoch: u64) -> bool {
        self.inner.state.borrow().epoch != epoch
    }

    /// Mutate state, then notify the observer outside the borrow
    fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.inner.state.borrow_mut();
            let result = f(&mut state);
            (result, state.view.clone())
        };
        let observer = self.inner.observer.borrow().clone();
        if let Some(observer) = observer {
            observer(&snapshot);
        }
        result
    }
}

fn apply_failure(s: &mut State, err: &DonateError) {
    s.view.status = SessionStatus::Failed;
    s.view.failure = Some(err.user_message());
    s.view.loading = false;
    s.view.submit_enabled = true;
}

/// Owner of the page's one donation session, created on first use.
///
/// Held by the top-level UI component and handed down by reference. A failed
/// factory call leaves the slot empty so the next call retries.
pub struct SessionSlot {
    cell: OnceCell<DonationSession>,
    factory: Box<dyn Fn() -> Result<DonationSession>>,
}

impl SessionSlot {
    pub fn new(factory: impl Fn() -> Result<DonationSession> + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// The session, if it has been created
    pub fn get(&self) -> Option<DonationSession> {
        self.cell.get().cloned()
    }

    pub fn get_or_create(&self) -> Result<DonationSession> {
        if let Some(session) = self.cell.get() {
            return Ok(session.clone());
        }
        let session = (self.factory)()?;
        Ok(self.cell.get_or_init(|| session).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use crate::mock::{
        BackendBehavior, ConfirmBehavior, ManualClock, MockDonationBackend, MockPaymentProvider,
        MockProviderLoader,
    };
    use crate::model::AmountUnits;
    use crate::provider::PaymentStatus;

    struct Harness {
        session: DonationSession,
        provider: Rc<MockPaymentProvider>,
        loader: Rc<MockProviderLoader>,
        backend: Rc<MockDonationBackend>,
        clock: Rc<ManualClock>,
    }

    fn harness_with(loader: MockProviderLoader, clock: ManualClock) -> Harness {
        harness_with_config(DonateConfig::default(), loader, clock)
    }

    fn harness_with_config(
        config: DonateConfig,
        loader: MockProviderLoader,
        clock: ManualClock,
    ) -> Harness {
        let provider = loader.provider();
        let loader = Rc::new(loader);
        let backend = Rc::new(MockDonationBackend::new("cs_test_1"));
        let clock = Rc::new(clock);
        let session =
            DonationSession::new(config, loader.clone(), backend.clone(), clock.clone()).unwrap();
        Harness {
            session,
            provider,
            loader,
            backend,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(MockProviderLoader::new(MockPaymentProvider::new()), ManualClock::new())
    }

    fn fill(session: &DonationSession, first: &str, last: &str, email: &str) {
        session.set_field(DonorField::FirstName, first);
        session.set_field(DonorField::LastName, last);
        session.set_field(DonorField::Email, email);
    }

    #[tokio::test]
    async fn test_open_mounts_card_once() {
        let h = harness();
        h.session.open().await;

        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Open);
        assert!(view.visible && view.scroll_locked && view.submit_enabled);
        assert_eq!(h.provider.cards_created(), 1);
        assert_eq!(h.provider.mounted_slots(), vec!["#mbx-card-element".to_string()]);

        h.session.close();
        h.session.open().await;
        assert_eq!(h.provider.cards_created(), 1);
        assert_eq!(h.provider.mounted_slots().len(), 1);
        assert_eq!(h.loader.loads(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_opens_with_submit_disabled() {
        let h = harness_with(
            MockProviderLoader::failing(MockPaymentProvider::new(), 1),
            ManualClock::new(),
        );
        h.session.open().await;

        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Open);
        assert!(view.visible);
        assert!(!view.submit_enabled);
        assert!(view.warning.is_some());

        fill(&h.session, "Jane", "Doe", "jane@x.com");
        assert!(matches!(
            h.session.submit().await,
            SubmitOutcome::Ignored(IgnoreReason::SubmitDisabled)
        ));
        assert_eq!(h.backend.request_count(), 0);

        // Next open retries the load
        h.session.close();
        h.session.open().await;
        assert!(h.session.view().submit_enabled);
        assert_eq!(h.loader.loads(), 2);
    }

    #[tokio::test]
    async fn test_successful_donation_scenario() {
        let h = harness();
        h.session.open().await;
        h.session.select_amount(dec!(100));
        h.session.set_frequency(Frequency::Monthly);
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let outcome = h.session.submit().await;
        assert!(outcome.is_success());

        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Succeeded);
        assert!(view.success_visible);
        assert!(!view.loading);

        let (request, key) = h.backend.last_request().unwrap();
        assert_eq!(request.amount, serde_json::Number::from(100));
        assert_eq!(request.frequency, Frequency::Monthly);
        assert_eq!(request.fund, "general");
        assert_eq!(request.metadata.email, "jane@x.com");
        assert!(key.as_str().starts_with("don_"));

        let confirms = h.provider.confirmations();
        assert_eq!(confirms.len(), 1);
        assert_eq!(confirms[0].0, "cs_test_1");
        assert_eq!(confirms[0].1.billing_name, "Jane Doe");

        // Exactly one auto close, after three seconds
        assert_eq!(h.clock.pending(), 1);
        h.clock.advance(Duration::from_millis(2999));
        assert_eq!(h.session.status(), SessionStatus::Succeeded);
        h.clock.advance(Duration::from_millis(1));
        assert_eq!(h.session.status(), SessionStatus::Idle);
        assert_eq!(h.clock.pending(), 0);
        assert_eq!(h.session.amount(), dec!(250));
        assert!(!h.session.view().success_visible);
    }

    #[tokio::test]
    async fn test_empty_first_name_never_reaches_network() {
        let h = harness();
        h.session.open().await;
        fill(&h.session, "", "Doe", "jane@x.com");

        let outcome = h.session.submit().await;
        let SubmitOutcome::Invalid(report) = outcome else {
            panic!("expected validation failure");
        };
        assert!(report.first_name);
        assert!(!report.last_name && !report.email);

        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Open);
        assert!(view.field_errors.first_name);
        assert_eq!(h.backend.request_count(), 0);
        assert!(h.provider.confirmations().is_empty());
    }

    #[tokio::test]
    async fn test_all_empty_fields_flag_everything() {
        let h = harness();
        h.session.open().await;

        let outcome = h.session.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(r) if r.first_name && r.last_name && r.email));
        assert_eq!(h.backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_email_never_reaches_network() {
        let h = harness();
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "foo");

        assert!(matches!(h.session.submit().await, SubmitOutcome::Invalid(r) if r.email));
        assert_eq!(h.backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_is_resubmittable_without_confirmation() {
        let h = harness();
        h.backend.set_behavior(BackendBehavior::Status(502));
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let outcome = h.session.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(DonateError::Backend { status: 502 })));
        assert!(h.provider.confirmations().is_empty());

        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Failed);
        assert!(view.status.is_resubmittable());
        assert!(view.submit_enabled);
        assert!(!view.loading);
        assert!(view.failure.as_deref().unwrap().contains("502"));

        h.session.dismiss_failure();
        assert_eq!(h.session.status(), SessionStatus::Open);
        assert!(h.session.view().failure.is_none());

        // Retry goes through with a fresh key
        h.backend.set_behavior(BackendBehavior::Secret("cs_test_2".into()));
        assert!(h.session.submit().await.is_success());
        let keys = h.backend.keys();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
    }

    #[tokio::test]
    async fn test_declined_card_surfaces_provider_message() {
        let h = harness();
        h.provider.set_confirm(ConfirmBehavior::Decline("Your card was declined.".into()));
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let outcome = h.session.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(DonateError::Provider(_))));
        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Failed);
        assert_eq!(view.failure.as_deref(), Some("Payment failed: Your card was declined."));
        assert_eq!(h.clock.pending(), 0);
    }

    #[tokio::test]
    async fn test_non_terminal_status_is_a_failure() {
        let h = harness();
        h.provider.set_confirm(ConfirmBehavior::Status(PaymentStatus::RequiresAction));
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let outcome = h.session.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(DonateError::PaymentIncomplete(_))));
        assert_eq!(h.session.status(), SessionStatus::Failed);
    }

    #[tokio::test]
    async fn test_rapid_double_submit_sends_one_pair() {
        let h = harness();
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let release = h.backend.hold();
        let second_outcome = Cell::new(None);
        let (first, ()) = futures::join!(h.session.submit(), async {
            let outcome = h.session.submit().await;
            second_outcome.set(Some(matches!(
                outcome,
                SubmitOutcome::Ignored(IgnoreReason::InFlight)
            )));
            let _ = release.send(());
        });

        assert!(first.is_success());
        assert_eq!(second_outcome.get(), Some(true));
        assert_eq!(h.backend.request_count(), 1);
        assert_eq!(h.provider.confirmations().len(), 1);
    }

    #[tokio::test]
    async fn test_close_during_submission_skips_confirmation() {
        let h = harness();
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let release = h.backend.hold();
        let (outcome, ()) = futures::join!(h.session.submit(), async {
            h.session.close();
            let _ = release.send(());
        });

        assert!(matches!(outcome, SubmitOutcome::Abandoned));
        assert!(h.provider.confirmations().is_empty());
        assert_eq!(h.session.status(), SessionStatus::Idle);
        assert!(h.session.view().failure.is_none());
    }

    #[tokio::test]
    async fn test_close_during_provider_load_keeps_provider() {
        let h = harness();
        let release = h.loader.hold();
        let ((), ()) = futures::join!(h.session.open(), async {
            h.session.close();
            let _ = release.send(());
        });

        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Idle);
        assert!(!view.visible && !view.scroll_locked);
        assert_eq!(h.provider.cards_created(), 0);
        assert!(h.provider.mounted_slots().is_empty());

        // The loaded provider is reused
        h.session.open().await;
        assert_eq!(h.session.status(), SessionStatus::Open);
        assert_eq!(h.loader.loads(), 1);
        assert_eq!(h.provider.cards_created(), 1);
    }

    #[tokio::test]
    async fn test_oversized_custom_amount_fails_without_request() {
        let config = DonateConfig {
            amount_units: AmountUnits::Minor,
            ..DonateConfig::default()
        };
        let h = harness_with_config(
            config,
            MockProviderLoader::new(MockPaymentProvider::new()),
            ManualClock::new(),
        );
        h.session.open().await;
        h.session.select_custom_amount("79228162514264337593543950335");
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        assert!(matches!(h.session.submit().await, SubmitOutcome::Failed(_)));
        assert_eq!(h.backend.request_count(), 0);
        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Failed);
        assert!(view.failure.is_some());
    }

    #[tokio::test]
    async fn test_backend_timeout_fails_submission() {
        let h = harness_with(
            MockProviderLoader::new(MockPaymentProvider::new()),
            ManualClock::expiring(),
        );
        h.backend.set_behavior(BackendBehavior::Pending);
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let outcome = h.session.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(DonateError::Timeout(_))));
        assert!(h.provider.confirmations().is_empty());
        assert_eq!(h.session.status(), SessionStatus::Failed);
    }

    #[tokio::test]
    async fn test_empty_secret_is_malformed() {
        let h = harness();
        h.backend.set_behavior(BackendBehavior::Secret(String::new()));
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");

        let outcome = h.session.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(DonateError::MalformedResponse(_))));
        assert!(h.provider.confirmations().is_empty());
    }

    #[tokio::test]
    async fn test_close_resets_everything() {
        let h = harness();
        h.session.open().await;
        h.session.select_custom_amount("75");
        h.session.set_frequency(Frequency::Monthly);
        fill(&h.session, "", "Doe", "bad");
        h.session.set_field(DonorField::Designation, "scholarships");
        let _ = h.session.submit().await;
        h.provider.emit_card_change(CardChange {
            error: Some("Your card number is incomplete.".into()),
            complete: false,
        });
        assert!(h.session.view().card_error.is_some());

        h.session.close();

        let view = h.session.view();
        assert_eq!(view.status, SessionStatus::Idle);
        assert_eq!(view.amount, AmountChoice::Preset(dec!(250)));
        assert_eq!(view.frequency, Frequency::OneTime);
        assert!(view.custom_input.is_empty());
        assert_eq!(view.form, crate::model::DonorForm::default());
        assert!(view.field_errors.is_valid());
        assert!(view.card_error.is_none());
        assert!(!view.visible && !view.scroll_locked);
        assert_eq!(h.provider.clears(), 1);
    }

    #[tokio::test]
    async fn test_stale_auto_close_does_not_close_new_session() {
        let h = harness();
        h.session.open().await;
        fill(&h.session, "Jane", "Doe", "jane@x.com");
        assert!(h.session.submit().await.is_success());

        // Donor closes by hand and opens again before the timer fires
        h.session.close();
        h.session.open().await;
        h.clock.advance(Duration::from_secs(3));

        assert_eq!(h.session.status(), SessionStatus::Open);
        assert!(h.session.view().visible);
    }

    #[tokio::test]
    async fn test_card_change_listener_updates_error_region() {
        let h = harness();
        h.session.open().await;

        h.provider.emit_card_change(CardChange {
            error: Some("Your card number is invalid.".into()),
            complete: false,
        });
        assert_eq!(
            h.session.view().card_error.as_deref(),
            Some("Your card number is invalid.")
        );

        h.provider.emit_card_change(CardChange {
            error: None,
            complete: true,
        });
        assert!(h.session.view().card_error.is_none());
    }

    #[tokio::test]
    async fn test_observer_sees_every_change() {
        let h = harness();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        h.session.set_observer(move |view| sink.borrow_mut().push(view.status));

        h.session.open().await;
        h.session.close();

        let seen = seen.borrow();
        assert_eq!(seen.first(), Some(&SessionStatus::Idle));
        assert!(seen.contains(&SessionStatus::Initializing));
        assert!(seen.contains(&SessionStatus::Open));
        assert_eq!(seen.last(), Some(&SessionStatus::Idle));
    }

    #[tokio::test]
    async fn test_open_twice_is_noop() {
        let h = harness();
        h.session.open().await;
        h.session.select_amount(dec!(500));
        h.session.open().await;
        assert_eq!(h.session.amount(), dec!(500));
        assert_eq!(h.loader.loads(), 1);
    }

    #[test]
    fn test_session_slot_creates_once() {
        let created = Rc::new(Cell::new(0));
        let counter = created.clone();
        let slot = SessionSlot::new(move || {
            counter.set(counter.get() + 1);
            let loader = MockProviderLoader::new(MockPaymentProvider::new());
            DonationSession::new(
                DonateConfig::default(),
                Rc::new(loader),
                Rc::new(MockDonationBackend::new("cs_test_1")),
                Rc::new(ManualClock::new()),
            )
        });

        assert!(slot.get().is_none());
        let a = slot.get_or_create().unwrap();
        let b = slot.get_or_create().unwrap();
        a.select_amount(dec!(50));
        assert_eq!(b.amount(), dec!(50));
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn test_session_slot_retries_failed_factory() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        let slot = SessionSlot::new(move || {
            counter.set(counter.get() + 1);
            let config = DonateConfig {
                backend_url: if counter.get() == 1 {
                    String::new()
                } else {
                    DonateConfig::default().backend_url
                },
                ..DonateConfig::default()
            };
            DonationSession::new(
                config,
                Rc::new(MockProviderLoader::new(MockPaymentProvider::new())),
                Rc::new(MockDonationBackend::new("cs_test_1")),
                Rc::new(ManualClock::new()),
            )
        });

        assert!(slot.get_or_create().is_err());
        assert!(slot.get().is_none());
        assert!(slot.get_or_create().is_ok());
        assert_eq!(attempts.get(), 2);
    }
}
