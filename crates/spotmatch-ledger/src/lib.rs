//! # spotmatch-ledger
//!
//! **Wallets, persistence and settlement.**
//!
//! Every match produced by the matcher is written through a [`Settler`] as
//! one [`MatchCommit`]:
//! 1. Idempotency check (a trade settles once)
//! 2. Wallet movements: locked funds out, counter-currency in, fees to the
//!    fee account
//! 3. Both order rows and the trade row
//!
//! Steps 2 and 3 are atomic in the [`LedgerStore`]. Transient store errors
//! are retried a bounded number of times.

pub mod idempotency;
pub mod memory;
pub mod settler;
pub mod store;
pub mod supply_conservation;

pub use idempotency::SettledTrades;
pub use memory::MemoryLedger;
pub use settler::Settler;
pub use store::{BalanceDelta, LedgerStore, MatchCommit};
pub use supply_conservation::SupplyConservation;
