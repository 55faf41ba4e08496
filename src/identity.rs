use crate::{
    error::ConnectionError,
    types::Address,
};
use std::sync::{
    Arc,
    Mutex,
};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityEvent {
    AccountChanged(Option<Address>),
    NetworkChanged(u64),
}

/// Surface of the wallet/identity provider this client consumes.
pub trait IdentityProvider {
    fn account(&self) -> Option<Address>;

    /// Chain id of the connected network.
    fn network(&self) -> u64;

    /// Ask the provider to expose an account, returning the active one.
    fn request_access(&self) -> impl Future<Output = Result<Address, ConnectionError>>;

    fn changes(&self) -> broadcast::Receiver<IdentityEvent>;
}

/// Identity provider over a fixed set of unlocked local accounts.
///
/// Stands in for a browser wallet: the active account can be switched at
/// runtime and observers learn about it through the change channel.
#[derive(Clone)]
pub struct LocalIdentity {
    accounts: Vec<(String, Address)>,
    active: Arc<Mutex<Option<usize>>>,
    chain_id: Arc<Mutex<u64>>,
    changes: broadcast::Sender<IdentityEvent>,
}

impl LocalIdentity {
    pub fn new(chain_id: u64, accounts: Vec<(String, Address)>) -> Self {
        let active = if accounts.is_empty() { None } else { Some(0) };
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        LocalIdentity {
            accounts,
            active: Arc::new(Mutex::new(active)),
            chain_id: Arc::new(Mutex::new(chain_id)),
            changes,
        }
    }

    pub fn accounts(&self) -> &[(String, Address)] {
        &self.accounts
    }

    pub fn active_label(&self) -> Option<String> {
        let active = self.active.lock().unwrap();
        active.map(|index| self.accounts[index].0.clone())
    }

    pub fn switch_to(&self, index: usize) {
        if index >= self.accounts.len() {
            return;
        }
        {
            let mut active = self.active.lock().unwrap();
            if *active == Some(index) {
                return;
            }
            *active = Some(index);
        }
        let _ = self
            .changes
            .send(IdentityEvent::AccountChanged(Some(self.accounts[index].1)));
    }

    pub fn switch_network(&self, chain_id: u64) {
        {
            let mut current = self.chain_id.lock().unwrap();
            if *current == chain_id {
                return;
            }
            *current = chain_id;
        }
        let _ = self.changes.send(IdentityEvent::NetworkChanged(chain_id));
    }
}

impl IdentityProvider for LocalIdentity {
    fn account(&self) -> Option<Address> {
        let active = self.active.lock().unwrap();
        active.map(|index| self.accounts[index].1)
    }

    fn network(&self) -> u64 {
        *self.chain_id.lock().unwrap()
    }

    async fn request_access(&self) -> Result<Address, ConnectionError> {
        self.account().ok_or(ConnectionError::NoAccount)
    }

    fn changes(&self) -> broadcast::Receiver<IdentityEvent> {
        self.changes.subscribe()
    }
}
