//! Mock Collaborators
//!
//! In-memory provider, backend and clock for tests and demos. They record
//! every call so tests can assert on what reached the "network".

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::backend::DonationBackend;
use crate::clock::{Clock, Task};
use crate::error::{DonateError, Result};
use crate::provider::{
    CardChange, CardChangeListener, CardInputHandle, ConfirmDetails, PaymentProvider,
    PaymentResult, PaymentStatus, ProviderLoader,
};
use crate::wire::{ClientSecret, DonationRequest, IdempotencyKey};

// ============================================================================
// Provider
// ============================================================================

/// How the mock provider answers `confirm_payment`
#[derive(Clone, Debug)]
pub enum ConfirmBehavior {
    Succeed,
    Decline(String),
    Status(PaymentStatus),
}

/// Payment provider that never touches card data
pub struct MockPaymentProvider {
    next_card: Cell<u64>,
    mounted: RefCell<Vec<String>>,
    listener: RefCell<Option<CardChangeListener>>,
    clears: Cell<usize>,
    confirm: RefCell<ConfirmBehavior>,
    confirmations: RefCell<Vec<(String, ConfirmDetails)>>,
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            next_card: Cell::new(0),
            mounted: RefCell::new(Vec::new()),
            listener: RefCell::new(None),
            clears: Cell::new(0),
            confirm: RefCell::new(ConfirmBehavior::Succeed),
            confirmations: RefCell::new(Vec::new()),
        }
    }

    pub fn set_confirm(&self, behavior: ConfirmBehavior) {
        *self.confirm.borrow_mut() = behavior;
    }

    /// Fire the registered card change listener, as the widget would
    pub fn emit_card_change(&self, change: CardChange) {
        if let Some(listener) = self.listener.borrow().as_ref() {
            listener(change);
        }
    }

    pub fn cards_created(&self) -> u64 {
        self.next_card.get()
    }

    pub fn mounted_slots(&self) -> Vec<String> {
        self.mounted.borrow().clone()
    }

    pub fn clears(&self) -> usize {
        self.clears.get()
    }

    /// `(client secret, details)` for every confirmation attempt
    pub fn confirmations(&self) -> Vec<(String, ConfirmDetails)> {
        self.confirmations.borrow().clone()
    }
}

#[async_trait(?Send)]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &str {
        "MockProvider"
    }

    fn create_card_input(&self) -> Result<CardInputHandle> {
        let id = self.next_card.get() + 1;
        self.next_card.set(id);
        Ok(CardInputHandle::new(id))
    }

    fn mount_card_input(
        &self,
        _card: &CardInputHandle,
        slot: &str,
        listener: CardChangeListener,
    ) -> Result<()> {
        self.mounted.borrow_mut().push(slot.to_string());
        *self.listener.borrow_mut() = Some(listener);
        Ok(())
    }

    fn clear_card_input(&self, _card: &CardInputHandle) {
        self.clears.set(self.clears.get() + 1);
    }

    async fn confirm_payment(
        &self,
        secret: &ClientSecret,
        details: &ConfirmDetails,
    ) -> Result<PaymentResult> {
        self.confirmations
            .borrow_mut()
            .push((secret.expose().to_string(), details.clone()));

        let behavior = self.confirm.borrow().clone();
        match behavior {
            ConfirmBehavior::Succeed => Ok(PaymentResult {
                status: PaymentStatus::Succeeded,
                payment_id: Some(format!("pi_mock_{}", self.confirmations.borrow().len())),
            }),
            ConfirmBehavior::Decline(message) => Err(DonateError::Provider(message)),
            ConfirmBehavior::Status(status) => Ok(PaymentResult {
                status,
                payment_id: None,
            }),
        }
    }
}

/// Loader handing out a shared [`MockPaymentProvider`], optionally failing
/// the first few attempts
pub struct MockProviderLoader {
    provider: Rc<MockPaymentProvider>,
    failures_left: Cell<u32>,
    loads: Cell<u32>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl MockProviderLoader {
    pub fn new(provider: MockPaymentProvider) -> Self {
        Self::failing(provider, 0)
    }

    /// Fail the first `failures` loads, then succeed
    pub fn failing(provider: MockPaymentProvider, failures: u32) -> Self {
        Self {
            provider: Rc::new(provider),
            failures_left: Cell::new(failures),
            loads: Cell::new(0),
            gate: RefCell::new(None),
        }
    }

    /// Hold the next load until the returned sender fires (or is dropped)
    pub fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx);
        tx
    }

    pub fn provider(&self) -> Rc<MockPaymentProvider> {
        self.provider.clone()
    }

    /// Load attempts so far
    pub fn loads(&self) -> u32 {
        self.loads.get()
    }
}

#[async_trait(?Send)]
impl ProviderLoader for MockProviderLoader {
    async fn load(&self) -> Result<Rc<dyn PaymentProvider>> {
        self.loads.set(self.loads.get() + 1);

        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return Err(DonateError::ProviderUnavailable("script failed to load".into()));
        }
        let provider: Rc<dyn PaymentProvider> = self.provider.clone();
        Ok(provider)
    }
}

// ============================================================================
// Backend
// ============================================================================

/// How the mock backend answers
#[derive(Clone, Debug)]
pub enum BackendBehavior {
    Secret(String),
    Status(u16),
    Network(String),
    Malformed,

    /// Never answers
    Pending,
}

/// Donation backend recording every request
pub struct MockDonationBackend {
    behavior: RefCell<BackendBehavior>,
    requests: RefCell<Vec<(DonationRequest, IdempotencyKey)>>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl MockDonationBackend {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            behavior: RefCell::new(BackendBehavior::Secret(secret.into())),
            requests: RefCell::new(Vec::new()),
            gate: RefCell::new(None),
        }
    }

    pub fn set_behavior(&self, behavior: BackendBehavior) {
        *self.behavior.borrow_mut() = behavior;
    }

    /// Hold the next request until the returned sender fires (or is dropped)
    pub fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx);
        tx
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<(DonationRequest, IdempotencyKey)> {
        self.requests.borrow().last().cloned()
    }

    pub fn keys(&self) -> Vec<IdempotencyKey> {
        self.requests.borrow().iter().map(|(_, key)| key.clone()).collect()
    }
}

#[async_trait(?Send)]
impl DonationBackend for MockDonationBackend {
    async fn create_intent(
        &self,
        request: &DonationRequest,
        key: &IdempotencyKey,
    ) -> Result<ClientSecret> {
        self.requests.borrow_mut().push((request.clone(), key.clone()));

        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let behavior = self.behavior.borrow().clone();
        match behavior {
            BackendBehavior::Secret(secret) => Ok(ClientSecret::new(secret)),
            BackendBehavior::Status(status) => Err(DonateError::Backend { status }),
            BackendBehavior::Network(message) => Err(DonateError::Network(message)),
            BackendBehavior::Malformed => {
                Err(DonateError::MalformedResponse("missing clientSecret".into()))
            }
            BackendBehavior::Pending => futures::future::pending().await,
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to
pub struct ManualClock {
    now: Cell<Duration>,
    tasks: RefCell<Vec<(Duration, Task)>>,
    sleeps_expire: bool,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Sleeps never finish
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            tasks: RefCell::new(Vec::new()),
            sleeps_expire: false,
        }
    }

    /// Sleeps finish immediately, so every timeout fires
    pub fn expiring() -> Self {
        Self {
            sleeps_expire: true,
            ..Self::new()
        }
    }

    /// Scheduled tasks not yet run
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Move time forward and run every task that came due
    pub fn advance(&self, by: Duration) {
        let now = self.now.get() + by;
        self.now.set(now);

        let due: Vec<Task> = {
            let mut tasks = self.tasks.borrow_mut();
            let (due, waiting): (Vec<_>, Vec<_>) =
                tasks.drain(..).partition(|(at, _)| *at <= now);
            *tasks = waiting;
            due.into_iter().map(|(_, task)| task).collect()
        };
        for task in due {
            task();
        }
    }
}

#[async_trait(?Send)]
impl Clock for ManualClock {
    async fn sleep(&self, _duration: Duration) {
        if !self.sleeps_expire {
            futures::future::pending::<()>().await;
        }
    }

    fn schedule(&self, delay: Duration, task: Task) {
        let at = self.now.get() + delay;
        self.tasks.borrow_mut().push((at, task));
    }
}
