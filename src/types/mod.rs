mod balance;
mod enums;
mod market;
mod order;
mod primitives;
mod trade;
mod websocket;

// Re-export all types
pub use balance::*;
pub use enums::*;
pub use market::*;
pub use order::*;
pub use primitives::*;
pub use trade::*;
pub use websocket::*;
