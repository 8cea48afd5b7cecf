//! TradeSpot market generator: a synthetic OHLCV candle feed.
//!
//! The generator maintains a continuous, gap-free series of candles at a
//! fixed interval. A mean-reverting trend regime biases the random walk,
//! missed intervals are repaired on the next creation tick, and history is
//! trimmed to a bounded retention window. Everything is driven by three
//! periodic tasks (creation, intra-candle update, regime checkpoint) over
//! a narrow persistence port.

pub mod candle;
pub mod engine;
pub mod noise;
pub mod regime;
pub mod scheduler;
pub mod store;
pub mod synth;
