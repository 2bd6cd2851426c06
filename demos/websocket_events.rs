use std::time::Duration;

use futures_util::StreamExt;
use funkybit_rs::websocket::{
    wait_for_subscription, BalancesUpdate, MyOrdersUpdate, OrderBookUpdate, Publication,
};
use funkybit_rs::{
    BackoffPolicy, ClientConfig, ConnectionState, Envelope, MarketId, OhlcDuration,
    ReconnectingClient, Topic,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let token = std::env::var("FUNKYBIT_AUTH_TOKEN").expect("FUNKYBIT_AUTH_TOKEN not set");
    let api_url =
        std::env::var("FUNKYBIT_API_URL").unwrap_or_else(|_| funkybit_rs::config::DEFAULT_API_URL.to_string());
    let market = MarketId::from("BTC/USDC");

    // Configure automatic reconnection
    let config = ClientConfig::new(api_url)
        .with_auth_token(token)
        .with_backoff(BackoffPolicy::Exponential {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        });

    let (client, mut envelopes) = ReconnectingClient::connect(config)?;

    client.subscribe_to_balances()?;
    client.subscribe_to_my_orders()?;
    client.subscribe_to_incremental_order_book(market.clone())?;
    client.subscribe_to_prices(market.clone(), OhlcDuration::P1M)?;

    wait_for_subscription(&mut envelopes, &Topic::Balances, Some(Duration::from_secs(10))).await?;
    println!("Subscribed! Waiting for events...\n");

    // Cancel-on-disconnect only covers the session it was set on, so re-arm
    // it every time a new session comes up.
    let mut states = client.state_changes();
    let rearm = client.clone();
    let rearm_market = market.clone();
    tokio::spawn(async move {
        loop {
            let state = *states.borrow_and_update();
            if let ConnectionState::Connected(generation) = state {
                match rearm
                    .set_cancel_on_disconnect(vec![rearm_market.clone()])
                    .await
                {
                    Ok(_) => println!("Cancel-on-disconnect armed for session {}", generation),
                    Err(e) => eprintln!("Could not arm cancel-on-disconnect: {}", e),
                }
            }
            if state == ConnectionState::Closed || states.changed().await.is_err() {
                break;
            }
        }
    });

    let mut event_count = 0;
    while let Some(envelope) = envelopes.next().await {
        event_count += 1;
        match envelope {
            Envelope::Heartbeat => {}
            Envelope::Ack {
                topic,
                action,
                success,
                reason,
            } => {
                println!("[Ack #{}] {} {} success={}", event_count, action, topic, success);
                if let Some(reason) = reason {
                    println!("  Reason: {}", reason);
                }
            }
            Envelope::Publish { topic, payload } => match payload {
                Publication::Balances(BalancesUpdate::Snapshot(balances)) => {
                    for balance in balances {
                        println!(
                            "[Balance] {} total={} available={}",
                            balance.symbol, balance.total, balance.available
                        );
                    }
                }
                Publication::Balances(BalancesUpdate::Updated(balances)) => {
                    for balance in balances {
                        println!(
                            "[Balance update] {} {:?}={}",
                            balance.symbol, balance.balance_type, balance.value
                        );
                    }
                }
                Publication::MyOrders(MyOrdersUpdate::Created(orders) | MyOrdersUpdate::Updated(orders)) => {
                    for order in orders {
                        println!(
                            "[Order] {} ({}) {:?} {:?} amount={}",
                            order.id, order.client_order_id, order.side, order.status, order.amount
                        );
                    }
                }
                Publication::IncrementalOrderBook(OrderBookUpdate::Diff(diff)) => {
                    println!(
                        "[Book diff] {} seq={} buys={} sells={}",
                        topic,
                        diff.sequence_number,
                        diff.buy.len(),
                        diff.sell.len()
                    );
                }
                other => {
                    println!(
                        "[{} #{}] snapshot={}",
                        topic,
                        event_count,
                        other.is_snapshot()
                    );
                }
            },
        }

        if event_count >= 500 {
            break;
        }
    }

    client.close(1000, "demo finished").await;
    println!("WebSocket stream ended.");
    Ok(())
}
