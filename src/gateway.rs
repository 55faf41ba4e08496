use crate::{
    error::GatewayError,
    types::{
        Address,
        LedgerEvent,
        Wei,
    },
};
use tokio::sync::broadcast;

/// Surface of the remote lottery ledger this client consumes.
///
/// Read methods are free queries against current contract state. Mutating
/// methods are signed calls carrying an explicit sequence number; the ledger
/// rejects a number it has already seen. Push events arrive on the broadcast
/// channel returned by [`subscribe`](LedgerGateway::subscribe); delivery order
/// is only guaranteed within a single category.
pub trait LedgerGateway {
    fn is_open(&self) -> impl Future<Output = Result<bool, GatewayError>>;
    fn entry_fee(&self) -> impl Future<Output = Result<Wei, GatewayError>>;
    fn players(&self) -> impl Future<Output = Result<Vec<Address>, GatewayError>>;
    fn prize_pool(&self) -> impl Future<Output = Result<Wei, GatewayError>>;
    fn manager(&self) -> impl Future<Output = Result<Address, GatewayError>>;
    fn last_winner(&self)
    -> impl Future<Output = Result<Option<Address>, GatewayError>>;
    fn last_prize(&self) -> impl Future<Output = Result<Wei, GatewayError>>;
    fn threshold(&self) -> impl Future<Output = Result<Wei, GatewayError>>;

    /// Seconds until the scheduled draw, or zero when no draw is scheduled.
    fn time_until_draw(&self) -> impl Future<Output = Result<u64, GatewayError>>;

    /// Next sequence number the ledger expects from `account`.
    fn next_sequence(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<u64, GatewayError>>;

    fn start_round(
        &self,
        from: Address,
        sequence: u64,
    ) -> impl Future<Output = Result<(), GatewayError>>;

    fn resolve_draw(
        &self,
        from: Address,
        sequence: u64,
    ) -> impl Future<Output = Result<(), GatewayError>>;

    fn enter(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> impl Future<Output = Result<(), GatewayError>>;

    fn fund(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> impl Future<Output = Result<(), GatewayError>>;

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent>;
}
