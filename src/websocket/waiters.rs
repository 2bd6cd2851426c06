//! Helpers that scan an [`EnvelopeStream`] for one specific event.
//!
//! Envelopes that do not match are consumed and discarded, so when several
//! waiters need the same traffic give each its own lane from
//! [`EnvelopeStream::fan_out`].
//!
//! Every helper takes an optional deadline. `None` waits until the event
//! shows up or the stream ends.

use rust_decimal::Decimal;
use std::time::Duration;

use super::client::EnvelopeStream;
use super::envelope::{BalancesUpdate, Envelope, MyOrdersUpdate, MyTradesUpdate, Publication};
use crate::error::{Error, Result};
use crate::types::{
    AckAction, BalanceType, ClientOrderId, Order, OrderId, OrderStatus, SettlementStatus, Symbol,
    Topic, Trade, UpdatedBalance,
};

/// Wait for the first envelope `matcher` maps to a value
pub async fn wait_for<T, F>(
    stream: &mut EnvelopeStream,
    deadline: Option<Duration>,
    mut matcher: F,
) -> Result<T>
where
    F: FnMut(&Envelope) -> Option<T>,
{
    scan(stream, deadline, |envelope| matcher(envelope).map(Ok)).await
}

async fn scan<T, F>(stream: &mut EnvelopeStream, deadline: Option<Duration>, mut matcher: F) -> Result<T>
where
    F: FnMut(&Envelope) -> Option<Result<T>>,
{
    let search = async {
        while let Some(envelope) = stream.next_envelope().await {
            if let Some(outcome) = matcher(&envelope) {
                return outcome;
            }
        }
        Err(Error::StreamEnded)
    };

    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, search)
            .await
            .map_err(|_| Error::Timeout)?,
        None => search.await,
    }
}

/// Wait until the server confirms `topic`
///
/// A successful acknowledgment or the first publication on the topic both
/// count; a rejected acknowledgment fails with [`Error::SubscriptionRejected`].
pub async fn wait_for_subscription(
    stream: &mut EnvelopeStream,
    topic: &Topic,
    deadline: Option<Duration>,
) -> Result<()> {
    scan(stream, deadline, |envelope| match envelope {
        Envelope::Ack {
            topic: acked,
            action: AckAction::Subscribe,
            success,
            reason,
        } if acked == topic => Some(if *success {
            Ok(())
        } else {
            Err(Error::rejected(topic.clone(), AckAction::Subscribe, reason.clone()))
        }),
        Envelope::Publish { topic: published, .. } if published == topic => Some(Ok(())),
        _ => None,
    })
    .await
}

/// Wait for the order with `client_order_id` to be reported as created
pub async fn wait_for_order_created(
    stream: &mut EnvelopeStream,
    client_order_id: &ClientOrderId,
    deadline: Option<Duration>,
) -> Result<Order> {
    wait_for(stream, deadline, |envelope| match envelope.payload()? {
        Publication::MyOrders(MyOrdersUpdate::Created(orders)) => orders
            .iter()
            .find(|order| &order.client_order_id == client_order_id)
            .cloned(),
        _ => None,
    })
    .await
}

/// Wait for the order with `client_order_id` to reach `status`
///
/// Snapshots are checked too, so an order that already had the status when
/// the subscription was (re)established is found.
pub async fn wait_for_order_status(
    stream: &mut EnvelopeStream,
    client_order_id: &ClientOrderId,
    status: OrderStatus,
    deadline: Option<Duration>,
) -> Result<Order> {
    wait_for(stream, deadline, |envelope| {
        let orders = match envelope.payload()? {
            Publication::MyOrders(
                MyOrdersUpdate::Snapshot(orders)
                | MyOrdersUpdate::Created(orders)
                | MyOrdersUpdate::Updated(orders),
            ) => orders,
            _ => return None,
        };
        orders
            .iter()
            .find(|order| &order.client_order_id == client_order_id && order.status == status)
            .cloned()
    })
    .await
}

/// Wait for the available balance of `symbol` to rise above `initial`
pub async fn wait_for_balance_above(
    stream: &mut EnvelopeStream,
    symbol: &Symbol,
    initial: Decimal,
    deadline: Option<Duration>,
) -> Result<UpdatedBalance> {
    wait_for(stream, deadline, |envelope| match envelope.payload()? {
        Publication::Balances(BalancesUpdate::Updated(balances)) => balances
            .iter()
            .find(|balance| {
                &balance.symbol == symbol
                    && balance.balance_type == BalanceType::Available
                    && balance.value > initial
            })
            .cloned(),
        _ => None,
    })
    .await
}

/// Wait for a trade of `order_id` to finish settling
pub async fn wait_for_trade_settled(
    stream: &mut EnvelopeStream,
    order_id: &OrderId,
    deadline: Option<Duration>,
) -> Result<Trade> {
    wait_for(stream, deadline, |envelope| match envelope.payload()? {
        Publication::MyTrades(MyTradesUpdate::Updated(trades)) => trades
            .iter()
            .find(|trade| {
                &trade.order_id == order_id
                    && trade.settlement_status == SettlementStatus::Completed
            })
            .cloned(),
        _ => None,
    })
    .await
}
